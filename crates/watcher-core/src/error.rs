//! Core error types for the Watcher engine.
//!
//! Subsystem crates define their own error enums; this module holds the
//! errors shared by everything that loads configuration or validates input.

use thiserror::Error;

/// Central error type for shared Watcher operations.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `WatcherError`.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatcherError::Validation("empty postal code".to_string());
        assert_eq!(err.to_string(), "validation error: empty postal code");

        let err = ConfigError::InvalidValue {
            field: "admission.max_sessions".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for admission.max_sessions: must be at least 1"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let watcher_err: WatcherError = config_err.into();
        assert!(matches!(watcher_err, WatcherError::Config(_)));
    }
}
