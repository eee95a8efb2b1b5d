//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHAT_REALTIME` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use chat_realtime::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Realtime endpoint: {}", config.realtime.endpoint_url);
//! ```

mod api;
mod error;
mod realtime;

pub use api::ApiConfig;
pub use error::{ConfigError, ValidationError};
pub use realtime::RealtimeConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a usable
/// local-development configuration (apart from the login token).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Realtime transport configuration
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// REST API configuration (send fallback)
    #[serde(default)]
    pub api: ApiConfig,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHAT_REALTIME` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHAT_REALTIME__REALTIME__ENDPOINT_URL=wss://...` -> `realtime.endpoint_url`
    /// - `CHAT_REALTIME__API__AUTH_TOKEN=...` -> `api.auth_token`
    /// - `CHAT_REALTIME__LOG_LEVEL=debug` -> `log_level`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_REALTIME")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.realtime.validate()?;
        self.api.validate()?;
        tracing_subscriber::EnvFilter::try_new(&self.log_level)
            .map_err(|e| ValidationError::InvalidLogLevel(e.to_string()))?;
        Ok(())
    }

    /// Login token, required to open the realtime connection
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingRequired` when no token is configured.
    pub fn require_token(&self) -> Result<&str, ValidationError> {
        self.api
            .token()
            .ok_or(ValidationError::MissingRequired("api.auth_token"))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            realtime: RealtimeConfig::default(),
            api: ApiConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info,chat_realtime=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("CHAT_REALTIME__REALTIME__ENDPOINT_URL");
        env::remove_var("CHAT_REALTIME__REALTIME__RECONNECT_BASE_DELAY_MS");
        env::remove_var("CHAT_REALTIME__REALTIME__MAX_RECONNECT_ATTEMPTS");
        env::remove_var("CHAT_REALTIME__API__BASE_URL");
        env::remove_var("CHAT_REALTIME__API__AUTH_TOKEN");
        env::remove_var("CHAT_REALTIME__LOG_LEVEL");
    }

    #[test]
    fn test_load_defaults_from_empty_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.realtime, RealtimeConfig::default());
        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert_eq!(config.log_level, "info,chat_realtime=debug");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("CHAT_REALTIME__REALTIME__ENDPOINT_URL", "wss://chat.example.com/ws");
        env::set_var("CHAT_REALTIME__REALTIME__RECONNECT_BASE_DELAY_MS", "500");
        env::set_var("CHAT_REALTIME__REALTIME__MAX_RECONNECT_ATTEMPTS", "5");
        env::set_var("CHAT_REALTIME__API__AUTH_TOKEN", "jwt-token");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.realtime.endpoint_url, "wss://chat.example.com/ws");
        assert_eq!(config.realtime.reconnect_base_delay_ms, 500);
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.require_token().unwrap(), "jwt-token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("CHAT_REALTIME__REALTIME__ENDPOINT_URL", "localhost:8080");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidEndpointUrl)
        ));
    }

    #[test]
    fn test_missing_token_is_reported() {
        let config = AppConfig::default();
        assert!(matches!(
            config.require_token(),
            Err(ValidationError::MissingRequired("api.auth_token"))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_log_filter() {
        let config = AppConfig {
            log_level: "chat_realtime=loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidLogLevel(_))
        ));
    }
}
