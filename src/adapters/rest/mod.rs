//! REST adapters - non-realtime paths to the chat API.

mod message_fallback;

pub use message_fallback::{RestFallbackConfig, RestMessageFallback};
