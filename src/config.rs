//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::request::PaginationParameters;

/// Page number used when paging falls back to the process default
pub const DEFAULT_PAGE: u64 = 1;

/// Request compilation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    /// Page size when a caller wants paging but the client specified none
    #[serde(default = "default_per_page")]
    pub default_per_page: u64,

    /// Async-after policy applied when the client omits `asyncAfter`
    #[serde(default = "default_async_after")]
    pub default_async_after: String,

    /// Whether `startswith`/`contains` filter operations are allowed
    #[serde(default)]
    pub filter_substring_operations: bool,

    /// Time zone applied when the client omits `timeZone`
    #[serde(default = "default_time_zone")]
    pub default_time_zone: Tz,
}

fn default_per_page() -> u64 {
    10000
}

fn default_async_after() -> String {
    "never".to_string()
}

fn default_time_zone() -> Tz {
    Tz::UTC
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            default_async_after: default_async_after(),
            filter_substring_operations: false,
            default_time_zone: default_time_zone(),
        }
    }
}

impl RequestConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: RequestConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = RequestConfig::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// The process-default page coordinates: configured page size, page 1
    pub fn default_pagination(&self) -> PaginationParameters {
        PaginationParameters::clamped(self.default_per_page, DEFAULT_PAGE)
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(per_page) = std::env::var("PORTCULLIS_DEFAULT_PER_PAGE") {
            if let Ok(parsed) = per_page.parse() {
                self.default_per_page = parsed;
            }
        }
        if let Ok(async_after) = std::env::var("PORTCULLIS_DEFAULT_ASYNC_AFTER") {
            self.default_async_after = async_after;
        }
        if let Ok(enabled) = std::env::var("PORTCULLIS_FILTER_SUBSTRING_OPERATIONS") {
            if let Ok(parsed) = enabled.parse() {
                self.filter_substring_operations = parsed;
            }
        }
        if let Ok(time_zone) = std::env::var("PORTCULLIS_DEFAULT_TIME_ZONE") {
            if let Ok(parsed) = time_zone.parse() {
                self.default_time_zone = parsed;
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Portcullis Configuration
#
# Environment variables override these settings:
# - PORTCULLIS_DEFAULT_PER_PAGE
# - PORTCULLIS_DEFAULT_ASYNC_AFTER
# - PORTCULLIS_FILTER_SUBSTRING_OPERATIONS
# - PORTCULLIS_DEFAULT_TIME_ZONE

# Page size for callers that want paging when the client specified none
default_per_page = 10000

# Async-after policy when the client omits asyncAfter: "never", "always",
# or a number of milliseconds
default_async_after = "never"

# Allow startswith/contains filter operations
filter_substring_operations = false

# Time zone when the client omits timeZone (IANA name)
default_time_zone = "UTC"
"#
    .to_string()
}
