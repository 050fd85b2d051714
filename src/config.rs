//! Engine configuration
//!
//! Uses RON (Rusty Object Notation) for human-readable config files.
//! Every field has a default, so partial files are fine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rasterizer::{Color, Vec3, HEIGHT, WIDTH};

/// Error type for config loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub render: RenderConfig,
    pub camera: CameraConfig,
    pub demo: DemoConfig,
    /// `env_logger` filter, `None` defers to `RUST_LOG`
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Window size as a multiple of the render resolution
    pub scale: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "retro-engine".to_string(), scale: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// RGB, 0.0-1.0
    pub clear_color: Vec3,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            clear_color: Vec3::new(0.1, 0.1, 0.1),
        }
    }
}

impl RenderConfig {
    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn clear_color(&self) -> Color {
        Color::from_f32(self.clear_color, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Degrees
    pub fov: f32,
    pub move_speed: f32,
    pub look_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { fov: 60.0, move_speed: 4.0, look_sensitivity: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub sphere_resolution: u32,
    /// Optional image for the demo meshes; a checkerboard is used otherwise
    pub texture_path: Option<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { sphere_resolution: 8, texture_path: None }
    }
}

/// Load a config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load a config from a RON string
pub fn load_config_from_str(s: &str) -> Result<EngineConfig, ConfigError> {
    Ok(ron::from_str(s)?)
}

/// Save a config to a RON file
pub fn save_config<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Load `path`, falling back to defaults when it is missing or invalid
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> EngineConfig {
    let path = path.as_ref();
    match load_config(path) {
        Ok(config) => config,
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("{} not found, using default config", path.display());
            EngineConfig::default()
        }
        Err(e) => {
            log::error!("failed to load {}: {}, using default config", path.display(), e);
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_str("()").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.render.resolution(), (320, 180));
        assert_eq!(config.camera.fov, 60.0);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config = load_config_from_str("(render: (width: 640), camera: (fov: 75.0))").unwrap();
        assert_eq!(config.render.width, 640);
        assert_eq!(config.render.height, 180);
        assert_eq!(config.camera.fov, 75.0);
        assert_eq!(config.camera.move_speed, 4.0);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("retro-engine-config-{}.ron", std::process::id()));
        let mut config = EngineConfig::default();
        config.window.title = "test".to_string();
        config.demo.sphere_resolution = 3;
        config.log_filter = Some("debug".to_string());

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = load_config_or_default("/definitely/not/here.ron");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_bad_syntax_is_parse_error() {
        assert!(matches!(load_config_from_str("(render: ("), Err(ConfigError::Parse(_))));
    }
}
