#![forbid(unsafe_code)]

//! Common error type for Surge crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurgeError {
    /// I/O related failures.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration parsing failures.
    #[error("Config parse error: {0}")]
    ConfigParse(toml::de::Error),

    /// JSON configuration parsing failures.
    #[error("Config JSON error: {0}")]
    ConfigJson(#[from] serde_json::Error),

    /// Configuration parsed but is not usable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenient alias for results throughout Surge crates.
pub type SurgeResult<T> = Result<T, SurgeError>;
