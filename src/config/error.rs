//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Realtime endpoint must be a ws:// or wss:// URL")]
    InvalidEndpointUrl,

    #[error("API base URL must be an http:// or https:// URL")]
    InvalidApiUrl,

    #[error("Reconnect base delay must be greater than zero")]
    InvalidReconnectDelay,

    #[error("Heart-beat interval out of range")]
    InvalidHeartbeat,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Destination prefix must start with '/': {0}")]
    InvalidDestinationPrefix(String),

    #[error("Invalid log filter: {0}")]
    InvalidLogLevel(String),
}
