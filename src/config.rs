//! Configuration file support.
//!
//! Settings are stored as versioned JSON. Every field has a default, so older
//! or partial files still load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use imlabel_raster::{ContourAlgorithm, ContourOptions};
use serde::{Deserialize, Serialize};

use crate::model::LabelContext;
use crate::render::RenderOptions;

/// Log level setting.
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

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Lock lifetime used when none is configured.
pub const DEFAULT_LOCK_EXPIRY_SECS: u64 = 600;

/// Tool-wide settings for rendering, contour extraction and locking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Version of the configuration file format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Radius of point labels when rendering and measuring
    #[serde(default)]
    pub point_radius: f64,

    /// Seconds an edit lock stays valid without being refreshed
    #[serde(default = "default_lock_expiry_secs")]
    pub lock_expiry_secs: u64,

    /// Mask to polygon algorithm
    #[serde(default)]
    pub contour_algorithm: ContourAlgorithm,

    /// Order extracted contours by descending area
    #[serde(default)]
    pub sort_contours_by_area: bool,

    /// Render filled shapes rather than outlines
    #[serde(default = "default_fill")]
    pub fill: bool,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_lock_expiry_secs() -> u64 {
    DEFAULT_LOCK_EXPIRY_SECS
}

fn default_fill() -> bool {
    true
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            point_radius: 0.0,
            lock_expiry_secs: default_lock_expiry_secs(),
            contour_algorithm: ContourAlgorithm::default(),
            sort_contours_by_area: false,
            fill: default_fill(),
            log_level: LogLevel::default(),
        }
    }
}

impl ToolConfig {
    pub fn label_context(&self) -> LabelContext {
        LabelContext::new(self.point_radius)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_expiry_secs)
    }

    pub fn contour_options(&self) -> ContourOptions {
        ContourOptions::new(self.contour_algorithm).with_sort_by_area(self.sort_contours_by_area)
    }

    /// Render options of the given size using the configured fill and context.
    pub fn render_options(&self, width: usize, height: usize) -> RenderOptions {
        RenderOptions::new(width, height)
            .with_fill(self.fill)
            .with_context(self.label_context())
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "config.json"
    }

    /// Get the default config file path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("imlabel").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("imlabel")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load from the default path, falling back to defaults when the file is
    /// missing or unreadable.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        Self::load_or_default_from(&path)
    }

    /// Load from `path`, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load_or_default_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Install the `env_logger` backend at the configured level.
    ///
    /// Does nothing if a logger is already installed.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn init_logging(&self) {
        let _ = env_logger::Builder::new()
            .filter_level(self.log_level.to_level_filter())
            .parse_default_env()
            .try_init();
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
