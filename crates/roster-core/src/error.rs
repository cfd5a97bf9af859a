//! Core error types for the roster crawler.
//!
//! This module defines the error type shared by the domain model and the
//! configuration layer. Crawl-time failures live in `roster-crawler`.

use thiserror::Error;

/// Central error type for core operations.
#[derive(Error, Debug)]
pub enum RosterError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid prefix, alphabet, range)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
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

/// Result type alias using `RosterError`.
pub type Result<T> = std::result::Result<T, RosterError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RosterError::Validation("prefix contains '9'".to_string());
        assert_eq!(err.to_string(), "validation error: prefix contains '9'");

        let err = ConfigError::InvalidValue {
            field: "crawl.alphabet".to_string(),
            reason: "must not be empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for crawl.alphabet: must not be empty"
        );
    }

    #[test]
    fn test_error_from_config() {
        let roster_err: RosterError = ConfigError::NoConfigDir.into();
        assert!(matches!(roster_err, RosterError::Config(_)));
    }
}
