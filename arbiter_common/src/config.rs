//! Configuration loading traits and types.
//!
//! Every arbiter binary reads its settings from a TOML file through
//! [`ConfigLoader`] and embeds a [`SharedConfig`] table.
//!
//! # Usage
//!
//! ```rust,no_run
//! use arbiter_common::config::{ConfigLoader, SharedConfig, ConfigError};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct MyAppConfig {
//!     shared: SharedConfig,
//!     cycle_time_ms: u64,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MyAppConfig::load(Path::new("config.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every registry query.
    Trace,
    /// Acquire/release transitions.
    Debug,
    /// Lifecycle messages.
    #[default]
    Info,
    /// Rejected acquire/release attempts by named owners.
    Warn,
    /// Ownership violations.
    Error,
}

impl LogLevel {
    /// Lowercase name as written in TOML.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Common configuration fields shared across all arbiter applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "arbiter-sim-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid or the
///   document does not match the target type
///
/// Semantic validation is left to the caller.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from an in-memory TOML document.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation: any serde-deserializable struct can be loaded.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        level: LogLevel,
    }

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_toml_names() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            let text = toml::to_string(&Wrapper { level }).unwrap();
            assert!(text.contains(level.as_str()), "{text}");
            assert_eq!(toml::from_str::<Wrapper>(&text).unwrap().level, level);
        }
    }

    #[test]
    fn test_log_level_rejects_unknown() {
        assert!(toml::from_str::<Wrapper>("level = \"loud\"").is_err());
    }

    #[test]
    fn test_log_level_to_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(LevelFilter::from(LogLevel::Error), LevelFilter::ERROR);
    }

    #[test]
    fn test_shared_config_validation() {
        let mut config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "arbiter".to_string(),
        };
        assert!(config.validate().is_ok());

        config.service_name = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_from_toml_parse_error() {
        let result = SharedConfig::from_toml("service_name = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
