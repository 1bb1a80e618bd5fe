use glam::{Mat4, Vec3};

/// Orbit-style sample camera: a zoom translation along -Z followed by
/// per-axis rotations, driven by mouse drag. This mirrors how the demo
/// scenes frame their content rather than a free-flying camera.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    /// Distance translation applied along -Z (negative values back away).
    pub zoom: f32,
    /// Rotation around x/y/z in degrees.
    pub rotation: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl OrbitCamera {
    pub fn new(zoom: f32, rotation: Vec3, fov_y: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            zoom,
            rotation,
            fov_y,
            z_near,
            z_far,
        }
    }

    /// View matrix: translate by zoom, then rotate scene around x, y, z.
    pub fn view_matrix(&self) -> Mat4 {
        let translation = Mat4::from_translation(Vec3::new(0.0, 0.0, self.zoom));
        let rot_x = Mat4::from_rotation_x(self.rotation.x.to_radians());
        let rot_y = Mat4::from_rotation_y(self.rotation.y.to_radians());
        let rot_z = Mat4::from_rotation_z(self.rotation.z.to_radians());
        translation * rot_x * rot_y * rot_z
    }

    /// Perspective projection with the Y axis flipped for Vulkan clip space.
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        let mut proj = Mat4::perspective_rh(
            self.fov_y.to_radians(),
            aspect_ratio,
            self.z_near,
            self.z_far,
        );
        proj.y_axis.y *= -1.0;
        proj
    }

    pub fn rotate(&mut self, delta_degrees: Vec3) {
        self.rotation += delta_degrees;
    }

    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom += delta;
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(-10.0, Vec3::ZERO, 45.0, 0.1, 256.0)
    }
}
