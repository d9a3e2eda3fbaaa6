//! Core error types for adrank.
//!
//! This module defines the central error type shared by the workspace crates
//! and the configuration-specific error returned by [`crate::config`].

use thiserror::Error;

/// Central error type for adrank operations.
#[derive(Error, Debug)]
pub enum AdrankError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request document could not be decoded
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

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

    /// Config file not found
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Failed to parse JSON
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading config
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

/// Result type alias using `AdrankError`.
pub type Result<T> = std::result::Result<T, AdrankError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
