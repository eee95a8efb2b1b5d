//! Realtime transport configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Realtime connection configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// STOMP-over-WebSocket endpoint (`ws://` or `wss://`)
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Backoff unit; retry `n` waits `n * base`
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Automatic retries before waiting for an explicit connect
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Client heart-beat offer, milliseconds (0 disables)
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_outgoing_ms: u64,

    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_incoming_ms: u64,

    /// WebSocket and STOMP handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Prefix of inbound subscription destinations
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    /// Prefix of outbound send destinations
    #[serde(default = "default_app_prefix")]
    pub app_prefix: String,
}

impl RealtimeConfig {
    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.endpoint_url.starts_with("ws://") && !self.endpoint_url.starts_with("wss://") {
            return Err(ValidationError::InvalidEndpointUrl);
        }
        if self.reconnect_base_delay_ms == 0 {
            return Err(ValidationError::InvalidReconnectDelay);
        }
        if self.heartbeat_outgoing_ms > 600_000 || self.heartbeat_incoming_ms > 600_000 {
            return Err(ValidationError::InvalidHeartbeat);
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        for prefix in [&self.topic_prefix, &self.app_prefix] {
            if !prefix.starts_with('/') || prefix.len() < 2 {
                return Err(ValidationError::InvalidDestinationPrefix(prefix.clone()));
            }
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_outgoing_ms: default_heartbeat_ms(),
            heartbeat_incoming_ms: default_heartbeat_ms(),
            connect_timeout_secs: default_connect_timeout(),
            topic_prefix: default_topic_prefix(),
            app_prefix: default_app_prefix(),
        }
    }
}

fn default_endpoint_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    3000
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

fn default_heartbeat_ms() -> u64 {
    20_000
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_topic_prefix() -> String {
    "/topic".to_string()
}

fn default_app_prefix() -> String {
    "/app".to_string()
}
