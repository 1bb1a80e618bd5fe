/// Tests for the shadow pass math: the light orbit, the light's square
/// frustum, and the clip-to-texture bias matrix used when sampling the map.

use glam::{Vec3, Vec4};
use vulkan_samples::shadow::{
    animated_light_position, bias_matrix, depth_mvp, light_projection, light_view, quad_projection,
    LightSettings, OffscreenUbo, QuadUbo, SceneUbo,
};

#[test]
fn test_light_orbit_range() {
    // Sample one full cycle and check the orbit stays inside its envelope
    for step in 0..100 {
        let t = step as f32 / 100.0;
        let pos = animated_light_position(t);

        assert!(pos.x.abs() <= 40.0 + 1e-4);
        assert!((-70.0..=-30.0).contains(&pos.y), "y out of range: {}", pos.y);
        assert!((20.0..=30.0).contains(&pos.z), "z out of range: {}", pos.z);
    }
}

#[test]
fn test_light_orbit_periodic() {
    let start = animated_light_position(0.0);
    let end = animated_light_position(1.0);

    println!("Orbit start {:?}, end {:?}", start, end);
    assert!((start - end).length() < 1e-3);
}

#[test]
fn test_light_view_looks_at_origin() {
    let light_pos = animated_light_position(0.3);
    let view = light_view(light_pos);

    // The origin must land on the view-space -Z axis, at the light distance
    let origin_vs = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(origin_vs.x.abs() < 1e-4);
    assert!(origin_vs.y.abs() < 1e-4);
    assert!((origin_vs.z + light_pos.length()).abs() < 1e-3);
}

#[test]
fn test_light_projection_is_square() {
    let settings = LightSettings::default();
    let proj = light_projection(&settings);

    // Square aspect: x and y scales match (no Vulkan flip on this matrix)
    assert!((proj.x_axis.x - proj.y_axis.y).abs() < 1e-6);
    assert!(proj.y_axis.y > 0.0);
}

#[test]
fn test_bias_matrix_maps_clip_to_texture() {
    let bias = bias_matrix();

    let corners = [
        (Vec4::new(-1.0, -1.0, 0.0, 1.0), (0.0, 0.0)),
        (Vec4::new(1.0, 1.0, 0.0, 1.0), (1.0, 1.0)),
        (Vec4::new(0.0, 0.0, 0.5, 1.0), (0.5, 0.5)),
    ];

    for (clip, (expected_x, expected_y)) in corners {
        let tex = bias * clip;
        println!("{:?} -> ({}, {})", clip, tex.x, tex.y);
        assert!((tex.x - expected_x).abs() < 1e-6);
        assert!((tex.y - expected_y).abs() < 1e-6);
        // Depth passes through untouched
        assert!((tex.z - clip.z).abs() < 1e-6);
    }
}

#[test]
fn test_scene_points_project_into_shadow_map() {
    // Points near the origin, seen from any light position on the orbit,
    // must land inside the shadow map after the bias transform.
    let settings = LightSettings::default();

    for step in 0..8 {
        let t = step as f32 / 8.0;
        let light_pos = animated_light_position(t);
        let mvp = bias_matrix() * depth_mvp(light_pos, &settings);

        for point in [Vec3::ZERO, Vec3::new(4.0, 1.0, -3.0), Vec3::new(-4.0, 0.0, 2.0)] {
            let projected = mvp * Vec4::new(point.x, point.y, point.z, 1.0);
            let uv = (projected.x / projected.w, projected.y / projected.w);

            assert!(
                (0.0..=1.0).contains(&uv.0) && (0.0..=1.0).contains(&uv.1),
                "point {:?} outside shadow map at t={}: uv {:?}",
                point,
                t,
                uv
            );
        }
    }
}

#[test]
fn test_shadow_ubo_layouts() {
    // Sizes must match the std140 blocks in the shadow shaders
    assert_eq!(std::mem::size_of::<OffscreenUbo>(), 64);
    assert_eq!(std::mem::size_of::<SceneUbo>(), 4 * 64 + 16);
    assert_eq!(std::mem::size_of::<QuadUbo>(), 128);
}

#[test]
fn test_quad_projection_aspect() {
    // The debug quad is 1x1 in model space; the ortho projection keeps it
    // square on screen for any window aspect.
    for (width, height) in [(1280.0_f32, 720.0_f32), (800.0, 800.0), (720.0, 1280.0)] {
        let proj = quad_projection(width, height);

        let corner = proj * Vec4::new(1.0, 1.0, 0.0, 1.0);
        let ndc_w = corner.x + 1.0; // quad width in NDC units from the left edge
        let ndc_h = corner.y + 1.0;

        let pixels_w = ndc_w * 0.5 * width;
        let pixels_h = ndc_h * 0.5 * height;
        println!("{}x{}: quad {}x{} px", width, height, pixels_w, pixels_h);
        assert!((pixels_w - pixels_h).abs() < 0.5);
    }
}
