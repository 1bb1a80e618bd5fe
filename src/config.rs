use anyhow::Result;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Per-sample configuration, stored as JSON next to the binary. A missing
/// or unreadable file falls back to defaults and writes them out so the
/// knobs are discoverable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DemoConfig {
    pub window: WindowConfigData,
    pub camera: CameraConfigData,
    pub shadow: ShadowConfigData,
    pub tessellation: TessellationConfigData,
}

impl DemoConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DemoConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load the file at `path`, or fall back to `default` (and try to
    /// persist it).
    pub fn load_or(path: &str, default: Self) -> Self {
        Self::load(path).unwrap_or_else(|_| {
            let _ = default.save(path);
            default
        })
    }

    pub fn load_or_default(path: &str) -> Self {
        Self::load_or(path, Self::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfigData {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfigData {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfigData {
    pub zoom: f32,

    #[serde(with = "vec3_serde")]
    pub rotation: Vec3,

    pub fov: f32,
}

impl Default for CameraConfigData {
    fn default() -> Self {
        Self {
            zoom: -20.0,
            rotation: Vec3::new(-15.0, -30.0, 0.0),
            fov: 45.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowConfigData {
    pub map_size: u32,
    pub depth_bias_constant: f32,
    pub depth_bias_slope: f32,
    pub light_fov: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub animate_light: bool,
    /// Optional OBJ to render instead of the generated scene.
    pub model_path: Option<String>,
}

impl Default for ShadowConfigData {
    fn default() -> Self {
        Self {
            map_size: crate::core::offscreen::DEFAULT_SHADOW_MAP_DIM,
            depth_bias_constant: crate::shadow::DEPTH_BIAS_CONSTANT,
            depth_bias_slope: crate::shadow::DEPTH_BIAS_SLOPE,
            light_fov: 45.0,
            z_near: 1.0,
            z_far: 96.0,
            animate_light: true,
            model_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TessellationConfigData {
    pub level: f32,
    pub strength: f32,
    pub alpha: f32,
    /// Optional heightmap image; a procedural one is generated otherwise.
    pub heightmap_path: Option<String>,
}

impl Default for TessellationConfigData {
    fn default() -> Self {
        Self {
            level: 8.0,
            strength: 1.0,
            alpha: 1.0,
            heightmap_path: None,
        }
    }
}

/// Serialize Vec3 as named fields instead of a bare array.
mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Vec3Data {
        x: f32,
        y: f32,
        z: f32,
    }

    pub fn serialize<S>(vec: &Vec3, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Vec3Data {
            x: vec.x,
            y: vec.y,
            z: vec.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = Vec3Data::deserialize(deserializer)?;
        Ok(Vec3::new(data.x, data.y, data.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DemoConfig::default();
        assert_eq!(config.shadow.map_size, 2048);
        assert_eq!(config.tessellation.level, 8.0);
        assert!(config.shadow.animate_light);
    }

    #[test]
    fn test_save_load() {
        let config = DemoConfig::default();
        let path = "test_demo_config.json";

        config.save(path).unwrap();
        let loaded = DemoConfig::load(path).unwrap();

        assert_eq!(loaded.camera.zoom, config.camera.zoom);
        assert_eq!(loaded.camera.rotation, config.camera.rotation);
        assert_eq!(loaded.shadow.depth_bias_constant, config.shadow.depth_bias_constant);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_load_or_falls_back() {
        let path = "does_not_exist/nested/config.json";
        let config = DemoConfig::load_or_default(path);
        assert_eq!(config.window.width, 1280);

        let _ = fs::remove_dir_all("does_not_exist");
    }
}
