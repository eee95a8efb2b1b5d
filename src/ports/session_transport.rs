//! SessionTransport port - Interface for the underlying realtime session.
//!
//! The connection manager never touches sockets directly. It asks a
//! [`SessionTransport`] to open a session and receives lifecycle outcomes
//! through a [`SessionListener`]. Topic routing lives below this seam: a
//! session subscribes a destination together with the callback that must
//! receive its frames.
//!
//! ## Lifecycle
//!
//! ```text
//! open() ──> listener.on_connected()      handshake accepted
//!        └─> listener.on_error(err)       handshake or protocol failure
//!            listener.on_closed()         peer/server closed the session
//! ```
//!
//! A session closed through [`TransportSession::disconnect`] does not
//! report `on_closed`; the caller initiated it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::domain::foundation::RealtimeError;

/// Callback receiving the raw body of each frame on one subscription.
pub type FrameCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Heart-beat intervals requested during the handshake (zero disables).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub outgoing: Duration,
    pub incoming: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            outgoing: Duration::from_secs(20),
            incoming: Duration::from_secs(20),
        }
    }
}

/// Everything a transport needs to open one session.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Endpoint URL (e.g. `ws://localhost:8080/ws`).
    pub url: String,
    /// Bearer credential sent as the `Authorization` connect header.
    pub credential: SecretString,
    pub heartbeat: Heartbeat,
}

/// Transport-assigned id of one destination subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportSubscriptionId(String);

impl TransportSubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransportSubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives session lifecycle outcomes.
///
/// Implementations must be cheap and must not block; they are invoked from
/// the transport's I/O task.
pub trait SessionListener: Send + Sync {
    /// Handshake accepted; the session can subscribe and send.
    fn on_connected(&self);

    /// Handshake rejected or protocol-level failure.
    fn on_error(&self, error: RealtimeError);

    /// Session closed without the client asking for it.
    fn on_closed(&self);
}

/// Port for opening realtime sessions.
///
/// # Contract
///
/// `open` must return without invoking the listener; outcomes are reported
/// later, from the transport's own task or from test code. The returned
/// session is owned exclusively by the connection manager.
pub trait SessionTransport: Send + Sync {
    /// Starts opening a session. Errors here mean no attempt was made.
    fn open(
        &self,
        request: ConnectRequest,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Arc<dyn TransportSession>, RealtimeError>;
}

/// One open (or opening) realtime session.
pub trait TransportSession: Send + Sync {
    /// Subscribes `destination`; every frame body is passed to `on_frame`.
    fn subscribe(
        &self,
        destination: &str,
        on_frame: FrameCallback,
    ) -> Result<TransportSubscriptionId, RealtimeError>;

    /// Removes a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: &TransportSubscriptionId) -> Result<(), RealtimeError>;

    /// Fire-and-forget send of a serialized body.
    fn send(&self, destination: &str, body: &str) -> Result<(), RealtimeError>;

    /// Graceful close; best effort.
    fn disconnect(&self) -> Result<(), RealtimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_transport_object_safe(_: &dyn SessionTransport) {}

    #[allow(dead_code)]
    fn assert_session_object_safe(_: &dyn TransportSession) {}

    #[allow(dead_code)]
    fn assert_listener_object_safe(_: &dyn SessionListener) {}

    #[test]
    fn default_heartbeat_is_twenty_seconds_each_way() {
        let heartbeat = Heartbeat::default();
        assert_eq!(heartbeat.outgoing, Duration::from_secs(20));
        assert_eq!(heartbeat.incoming, Duration::from_secs(20));
    }

    #[test]
    fn connect_request_debug_redacts_credential() {
        let request = ConnectRequest {
            url: "ws://localhost:8080/ws".to_string(),
            credential: SecretString::new("super-secret".to_string()),
            heartbeat: Heartbeat::default(),
        };
        assert!(!format!("{:?}", request).contains("super-secret"));
    }

    #[test]
    fn transport_subscription_id_displays_raw() {
        assert_eq!(format!("{}", TransportSubscriptionId::new("sub-3")), "sub-3");
    }
}
