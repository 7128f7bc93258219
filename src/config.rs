//! Configuration file support for RVAT.
//!
//! Engine settings are stored as versioned JSON. Native builds read and
//! write a file under the user's config directory.

use serde::{Deserialize, Serialize};

use crate::detection::DetectionConfig;
use crate::editor::EditingConfig;
use crate::geometry::Size;
use crate::model::{DEFAULT_CATEGORY, default_categories};
use crate::store::HistoryConfig;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file version.
pub const CONFIG_VERSION: u32 = 1;

/// Everything needed to build an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version: u32,
    pub log_level: LogLevel,
    /// Drawing surface dimensions in pixels
    pub surface: Size,
    /// Playback rate used to derive frame numbers from time
    pub fps: f64,
    pub categories: Vec<String>,
    /// Category of new annotations until another one is picked
    pub default_category: String,
    pub editing: EditingConfig,
    pub history: HistoryConfig,
    pub detection: DetectionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            surface: Size::new(640.0, 500.0),
            fps: 30.0,
            categories: default_categories(),
            default_category: DEFAULT_CATEGORY.to_string(),
            editing: EditingConfig::default(),
            history: HistoryConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::InvalidValue {
                field,
                reason: reason.into(),
            }
        }

        if !(self.surface.width > 0.0 && self.surface.height > 0.0) {
            return Err(invalid("surface", "dimensions must be positive"));
        }
        if !(self.fps > 0.0 && self.fps.is_finite()) {
            return Err(invalid("fps", "must be a positive number"));
        }
        if self.default_category.trim().is_empty() {
            return Err(invalid("default_category", "must not be empty"));
        }
        if self.editing.vertex_hover_radius < 0.0 {
            return Err(invalid("editing.vertex_hover_radius", "must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.editing.accept_confidence) {
            return Err(invalid("editing.accept_confidence", "must be within [0, 1]"));
        }
        if self.history.max_depth == Some(0) {
            return Err(invalid("history.max_depth", "must be at least 1"));
        }

        let detection = &self.detection;
        for (field, value) in [
            ("detection.score_threshold", detection.score_threshold),
            ("detection.iou_threshold", detection.iou_threshold),
            ("detection.fallback_confidence", detection.fallback_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, "must be within [0, 1]"));
            }
        }
        if detection.fallback_half_size <= 0.0 {
            return Err(invalid("detection.fallback_half_size", "must be positive"));
        }

        Ok(())
    }

    /// Frame shown at `seconds` of playback.
    pub fn frame_for_time(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.fps).floor() as u64
    }

    pub fn default_filename() -> &'static str {
        "rvat-config.json"
    }

    /// Get the default config file path.
    /// Returns None on WASM (no filesystem access).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("rvat").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("rvat")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write configuration to a file, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load configuration from `path` if the file exists.
    /// A missing file is `Ok(None)`; a file that can't be read or parsed is an error.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_if_exists(path: &std::path::Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Ok(None);
        }
        Self::load_from(path).map(Some)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        match Self::load_if_exists(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to(&path)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.surface, Size::new(640.0, 500.0));
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.default_category, "Road Asset");
        assert_eq!(config.editing.accept_confidence, 0.85);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = EngineConfig::default();
        config.log_level = LogLevel::Debug;
        config.default_category = "Pothole".to_string();
        config.detection.road_classes = vec!["car".to_string()];

        let json = config.to_json().unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed = EngineConfig::from_json(r#"{"version": 1, "fps": 25.0}"#).unwrap();
        assert_eq!(parsed.fps, 25.0);
        assert_eq!(parsed.surface, Size::new(640.0, 500.0));
        assert_eq!(parsed.detection, DetectionConfig::default());
    }

    #[test]
    fn test_version_check() {
        let json = r#"{"version": 999}"#;
        let result = EngineConfig::from_json(json);
        assert!(matches!(
            result,
            Err(ConfigError::VersionTooNew {
                file_version: 999,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = EngineConfig::from_json(r#"{"fps": 0.0}"#);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "fps", .. })
        ));

        let mut config = EngineConfig::default();
        config.editing.accept_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_for_time() {
        let config = EngineConfig::default();
        assert_eq!(config.frame_for_time(0.0), 0);
        assert_eq!(config.frame_for_time(1.0), 30);
        assert_eq!(config.frame_for_time(0.5), 15);
        assert_eq!(config.frame_for_time(-2.0), 0);
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
        assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("rvat-config-test-{}", std::process::id()))
            .join(EngineConfig::default_filename());

        let mut config = EngineConfig::default();
        config.fps = 24.0;
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.fps, 24.0);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_load_if_exists_reports_malformed_file() {
        let dir = std::env::temp_dir().join(format!("rvat-config-malformed-{}", std::process::id()));
        let path = dir.join(EngineConfig::default_filename());

        assert!(matches!(EngineConfig::load_if_exists(&path), Ok(None)));

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "{ this is not json").unwrap();
        assert!(matches!(
            EngineConfig::load_if_exists(&path),
            Err(ConfigError::ParseError(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
