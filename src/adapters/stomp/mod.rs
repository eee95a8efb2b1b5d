//! STOMP-over-WebSocket adapter.
//!
//! - `frame` - STOMP 1.2 frame codec
//! - `transport` - `SessionTransport` over `tokio-tungstenite`

mod frame;
mod transport;

pub use frame::{is_heartbeat, Command, StompFrame};
pub use transport::{StompSession, StompWebSocketTransport};
