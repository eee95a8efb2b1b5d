//! Chat REST API configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// REST API configuration (used for the send fallback)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bearer token obtained at login
    pub auth_token: Option<SecretString>,
}

impl ApiConfig {
    /// Token, if configured and non-blank
    pub fn token(&self) -> Option<&str> {
        self.auth_token
            .as_ref()
            .map(|token| token.expose_secret().as_str())
            .filter(|token| !token.trim().is_empty())
    }

    /// Validate API configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidApiUrl);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            auth_token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
