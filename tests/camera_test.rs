/// Tests for the orbit camera: view composition order and the Vulkan
/// clip-space Y flip in the projection.

use glam::{Vec3, Vec4};
use vulkan_samples::core::OrbitCamera;

#[test]
fn test_zoom_translates_along_z() {
    let camera = OrbitCamera::new(-10.0, Vec3::ZERO, 45.0, 0.1, 256.0);
    let view = camera.view_matrix();

    // With no rotation, a point at the origin ends up 10 units in front
    let origin = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert_eq!(origin, Vec4::new(0.0, 0.0, -10.0, 1.0));
}

#[test]
fn test_rotation_applied_after_zoom() {
    // 180 degrees around Y shows the scene from behind, but the zoom
    // distance is unchanged.
    let camera = OrbitCamera::new(-10.0, Vec3::new(0.0, 180.0, 0.0), 45.0, 0.1, 256.0);
    let view = camera.view_matrix();

    let point = view * Vec4::new(0.0, 0.0, 3.0, 1.0);
    println!("Rotated point: {:?}", point);
    assert!((point.z - (-13.0)).abs() < 1e-4);
    assert!(point.x.abs() < 1e-4);
}

#[test]
fn test_projection_flips_y() {
    let camera = OrbitCamera::default();
    let proj = camera.projection_matrix(16.0 / 9.0);

    // A point above the camera axis has negative clip-space y in Vulkan
    let up = proj * Vec4::new(0.0, 1.0, -5.0, 1.0);
    assert!(up.y < 0.0, "expected Vulkan Y flip, got {:?}", up);

    // And the flip only touches the y axis
    assert!(proj.x_axis.x > 0.0);
    assert!(proj.y_axis.y < 0.0);
}

#[test]
fn test_rotate_and_zoom_accumulate() {
    let mut camera = OrbitCamera::default();
    camera.rotate(Vec3::new(5.0, 10.0, 0.0));
    camera.rotate(Vec3::new(5.0, 10.0, 0.0));
    camera.zoom_by(2.0);

    assert_eq!(camera.rotation, Vec3::new(10.0, 20.0, 0.0));
    assert_eq!(camera.zoom, -8.0);
}
