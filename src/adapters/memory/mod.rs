//! In-memory adapters for testing.

mod transport;

pub use transport::{InMemorySession, InMemoryTransport, TransportCall};
