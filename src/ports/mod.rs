//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the realtime core and the outside world. Adapters implement these ports.
//!
//! ## Transport Ports
//!
//! - `SessionTransport` - Opens realtime sessions
//! - `TransportSession` - Subscribe/unsubscribe/send on one open session
//! - `SessionListener` - Session lifecycle outcomes
//!
//! ## Collaborator Ports
//!
//! - `CredentialProvider` - Bearer credential obtained at login
//! - `EndpointResolver` - Realtime endpoint URL
//! - `MessageFallback` - Non-realtime (REST) send path

mod credential_provider;
mod message_fallback;
mod session_transport;

pub use credential_provider::{CredentialProvider, EndpointResolver};
pub use message_fallback::MessageFallback;
pub use session_transport::{
    ConnectRequest, FrameCallback, Heartbeat, SessionListener, SessionTransport,
    TransportSession, TransportSubscriptionId,
};
