//! MessageFallback port - Non-realtime send path.
//!
//! When a channel adapter rejects a send because the transport is down,
//! the caller delivers the message through this port instead (typically a
//! REST endpoint). The server answers with the created message so the UI
//! can show it without waiting for a broadcast.
//!
//! # Example
//!
//! ```ignore
//! match channel.send(&room_id, &message) {
//!     Ok(()) => {}
//!     Err(e) if e.should_fall_back() => {
//!         let created = fallback.send(&Room::target(&room_id), &message).await?;
//!         on_message(created);
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::RealtimeError;
use crate::domain::messaging::{ChatMessage, OutboundMessage};
use crate::domain::realtime::ChannelTarget;

#[async_trait]
pub trait MessageFallback: Send + Sync {
    /// Delivers `message` to `target` and returns the stored message.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Fallback`] when the request fails or the
    /// response cannot be decoded.
    async fn send(
        &self,
        target: &ChannelTarget,
        message: &OutboundMessage,
    ) -> Result<ChatMessage, RealtimeError>;
}
