//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the realtime core to external systems:
//! - `stomp` - STOMP-over-WebSocket session transport
//! - `rest` - REST fallback for sends while the transport is down
//! - `auth` - Token store and endpoint resolver
//! - `memory` - In-memory transport for tests

pub mod auth;
pub mod memory;
pub mod rest;
pub mod stomp;

pub use auth::{StaticEndpoint, TokenStore};
pub use memory::{InMemorySession, InMemoryTransport, TransportCall};
pub use rest::{RestFallbackConfig, RestMessageFallback};
pub use stomp::{StompWebSocketTransport, StompFrame};
