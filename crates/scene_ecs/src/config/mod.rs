//! Configuration system
//!
//! Settings load from and save to `.toml` or `.ron` files; the extension
//! picks the format.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str_with_format(&contents, path)
    }

    /// Parse configuration text in the format implied by `path`
    fn from_str_with_format(contents: &str, path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Viewport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Background color as `0xRRGGBB`
    pub clear_color: u32,
    /// Enable shadow rendering
    pub use_shadow: bool,
    /// Highlight the hovered entity
    pub use_helper: bool,
    /// Select entities on click
    pub use_transform_controls: bool,
    /// Grid size in world units
    pub size: u32,
    /// Render only after something requested a frame
    pub use_render_on_demand: bool,
    /// Minimum interval between processed pointer moves
    pub pointer_throttle_ms: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            clear_color: 0x00d1_d3d0,
            use_shadow: true,
            use_helper: true,
            use_transform_controls: true,
            size: 150,
            use_render_on_demand: false,
            pointer_throttle_ms: 150.0,
        }
    }
}

impl Config for ViewportSettings {}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame rate the run loop paces to; 0 runs unpaced
    pub target_fps: u32,
    /// `env_logger` filter applied by [`crate::foundation::logging::init_with_filter`]
    pub log_filter: String,
    /// Viewport settings
    pub viewport: ViewportSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            log_filter: "info".to_string(),
            viewport: ViewportSettings::default(),
        }
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_defaults() {
        let settings = ViewportSettings::default();
        assert_eq!(settings.clear_color, 0xd1d3d0);
        assert!(settings.use_shadow);
        assert!(!settings.use_render_on_demand);
        assert_eq!(settings.size, 150);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = "target_fps = 30\n[viewport]\nuse_render_on_demand = true\n";
        let config = EngineConfig::from_str_with_format(text, "engine.toml").unwrap();

        assert_eq!(config.target_fps, 30);
        assert_eq!(config.log_filter, "info");
        assert!(config.viewport.use_render_on_demand);
        assert!(config.viewport.use_helper);
    }

    #[test]
    fn test_ron_config() {
        let text = "(target_fps: 10, viewport: (clear_color: 0))";
        let config = EngineConfig::from_str_with_format(text, "engine.ron").unwrap();
        assert_eq!(config.target_fps, 10);
        assert_eq!(config.viewport.clear_color, 0);
    }

    #[test]
    fn test_unknown_extension() {
        let result = EngineConfig::from_str_with_format("", "engine.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let path = std::env::temp_dir().join(format!("scene_ecs_config_{}.toml", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let config = EngineConfig {
            target_fps: 24,
            ..EngineConfig::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = EngineConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
