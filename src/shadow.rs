//! Host-side math for the shadow mapping sample: the animated light, the
//! light's view/projection, and the uniform blocks both passes consume.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Constant depth bias applied while rendering the shadow map.
pub const DEPTH_BIAS_CONSTANT: f32 = 1.25;
/// Slope-scaled depth bias factor.
pub const DEPTH_BIAS_SLOPE: f32 = 1.75;

/// Light frustum parameters. The depth range is kept as tight as the scene
/// allows for better shadow map precision.
#[derive(Debug, Clone, Copy)]
pub struct LightSettings {
    /// Field of view of the spot light frustum in degrees.
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            fov_y: 45.0,
            z_near: 1.0,
            z_far: 96.0,
        }
    }
}

/// Light orbit over one animation cycle, `t` in [0, 1).
pub fn animated_light_position(t: f32) -> Vec3 {
    let angle = (t * 360.0).to_radians();
    Vec3::new(
        angle.cos() * 40.0,
        -50.0 + angle.sin() * 20.0,
        25.0 + angle.sin() * 5.0,
    )
}

/// The light looks at the scene origin.
pub fn light_view(light_pos: Vec3) -> Mat4 {
    Mat4::look_at_rh(light_pos, Vec3::ZERO, Vec3::Y)
}

/// Square projection for the square shadow map. No Vulkan Y flip here: the
/// same matrix is used to write the map and to compute shadow coordinates
/// when sampling it, so the orientation cancels.
pub fn light_projection(settings: &LightSettings) -> Mat4 {
    Mat4::perspective_rh(
        settings.fov_y.to_radians(),
        1.0,
        settings.z_near,
        settings.z_far,
    )
}

/// Model-view-projection used by the depth-only pass (model is identity;
/// the demo scene lives in world space).
pub fn depth_mvp(light_pos: Vec3, settings: &LightSettings) -> Mat4 {
    light_projection(settings) * light_view(light_pos)
}

/// Maps clip-space x/y from [-1, 1] to the [0, 1] range used to address the
/// shadow map.
pub fn bias_matrix() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.5, 0.5, 0.0, 1.0),
    )
}

/// Uniform block of the depth-only offscreen pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct OffscreenUbo {
    pub depth_mvp: Mat4,
}

/// Uniform block of the lit scene pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneUbo {
    pub projection: Mat4,
    pub view: Mat4,
    pub model: Mat4,
    /// Clip-to-texture bias times the light's depth MVP.
    pub depth_bias_mvp: Mat4,
    pub light_pos: Vec4,
}

/// Uniform block of the shadow map debug quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct QuadUbo {
    pub projection: Mat4,
    pub model: Mat4,
}

/// Orthographic projection for the debug quad overlay, sized so the quad
/// occupies the top-left corner regardless of aspect ratio.
pub fn quad_projection(width: f32, height: f32) -> Mat4 {
    let aspect = height / width;
    Mat4::orthographic_rh(0.0, 2.5 / aspect, 0.0, 2.5, -1.0, 1.0)
}
