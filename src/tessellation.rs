//! Host-side state for the displacement mapping sample.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

pub const MIN_TESS_LEVEL: f32 = 1.0;
pub const MAX_TESS_LEVEL: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationParams {
    /// Inner and outer tessellation level fed to the control shader.
    pub level: f32,
    /// Displacement strength along the normal; 0 disables displacement.
    pub strength: f32,
    /// Blend factor between flat and tessellated normals.
    pub alpha: f32,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            level: 8.0,
            strength: 1.0,
            alpha: 1.0,
        }
    }
}

impl TessellationParams {
    /// Adjust the tessellation level, clamped to the hardware-friendly
    /// [1, 32] range the sample exposes.
    pub fn adjust_level(&mut self, delta: f32) {
        self.level = (self.level + delta).clamp(MIN_TESS_LEVEL, MAX_TESS_LEVEL);
    }

    pub fn toggle_displacement(&mut self) {
        self.strength = if self.strength > 0.0 { 0.0 } else { 1.0 };
    }
}

/// Uniform block of the tessellation control shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TessControlUbo {
    pub tess_level: f32,
    pub _pad: [f32; 3],
}

impl TessControlUbo {
    pub fn new(level: f32) -> Self {
        Self {
            tess_level: level,
            _pad: [0.0; 3],
        }
    }
}

/// Uniform block of the tessellation evaluation shader (also read by the
/// fragment shader for lighting).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TessEvalUbo {
    pub projection: Mat4,
    pub model: Mat4,
    pub light_pos: Vec4,
    pub tess_alpha: f32,
    pub tess_strength: f32,
    pub _pad: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_clamped() {
        let mut params = TessellationParams::default();
        params.adjust_level(100.0);
        assert_eq!(params.level, MAX_TESS_LEVEL);

        params.adjust_level(-100.0);
        assert_eq!(params.level, MIN_TESS_LEVEL);

        params.adjust_level(0.25);
        assert_eq!(params.level, 1.25);
    }

    #[test]
    fn test_toggle_displacement() {
        let mut params = TessellationParams::default();
        assert_eq!(params.strength, 1.0);

        params.toggle_displacement();
        assert_eq!(params.strength, 0.0);
        params.toggle_displacement();
        assert_eq!(params.strength, 1.0);
    }

    #[test]
    fn test_control_ubo_layout() {
        // std140: a single float block still occupies 16 bytes
        assert_eq!(std::mem::size_of::<TessControlUbo>(), 16);
        assert_eq!(std::mem::size_of::<TessEvalUbo>(), 160);
    }
}
