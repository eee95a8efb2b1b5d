//! REST implementation of the `MessageFallback` port.
//!
//! Posts the outbound payload to the chat API when the realtime transport
//! cannot take it:
//!
//! - `POST {base}/rooms/{roomId}/messages`
//! - `POST {base}/private-chats/{chatId}/messages`
//!
//! The server answers with the stored message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::ExposeSecret;

use crate::domain::foundation::RealtimeError;
use crate::domain::messaging::{ChatMessage, OutboundMessage};
use crate::domain::realtime::ChannelTarget;
use crate::ports::{CredentialProvider, MessageFallback};

/// Configuration for the REST fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestFallbackConfig {
    /// API base URL (default: http://localhost:8080/api).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for RestFallbackConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RestFallbackConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Sends messages through the chat REST API.
pub struct RestMessageFallback {
    config: RestFallbackConfig,
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl RestMessageFallback {
    /// # Errors
    ///
    /// [`RealtimeError::Fallback`] if the HTTP client cannot be built.
    pub fn new(
        config: RestFallbackConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, RealtimeError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RealtimeError::Fallback(format!("HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            credentials,
        })
    }

    /// Endpoint that stores messages for `target`.
    pub fn messages_url(&self, target: &ChannelTarget) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match target {
            ChannelTarget::Room(id) => format!("{}/rooms/{}/messages", base, id),
            ChannelTarget::Private(id) => format!("{}/private-chats/{}/messages", base, id),
        }
    }

    async fn check_status(response: Response) -> Result<Response, RealtimeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let reason = if body.trim().is_empty() {
            "Request failed".to_string()
        } else {
            body
        };
        Err(RealtimeError::Fallback(format!("{}: {}", status, reason)))
    }
}

#[async_trait]
impl MessageFallback for RestMessageFallback {
    async fn send(
        &self,
        target: &ChannelTarget,
        message: &OutboundMessage,
    ) -> Result<ChatMessage, RealtimeError> {
        let url = self.messages_url(target);
        let mut request = self.client.post(&url).json(message);
        if let Some(token) = self.credentials.credential() {
            request = request.bearer_auth(token.expose_secret());
        }

        tracing::debug!(channel = %target, url = %url, "Posting message through REST fallback");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RealtimeError::Fallback(format!(
                    "Request timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            } else if e.is_connect() {
                RealtimeError::Fallback(format!("Connection failed: {}", e))
            } else {
                RealtimeError::Fallback(e.to_string())
            }
        })?;

        let response = Self::check_status(response).await?;
        response
            .json::<ChatMessage>()
            .await
            .map_err(|e| RealtimeError::Fallback(format!("Failed to parse response: {}", e)))
    }
}
