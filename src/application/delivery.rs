//! Realtime-first message delivery with a non-realtime fallback.

use crate::domain::foundation::RealtimeError;
use crate::domain::messaging::{ChatMessage, OutboundMessage};
use crate::domain::realtime::ChannelKind;
use crate::ports::MessageFallback;

use super::channel::ChannelAdapter;

/// Which path accepted a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Accepted by the connected transport; the echo arrives as a frame.
    Realtime,
    /// Stored through the fallback; carries the server-created message.
    Fallback(ChatMessage),
}

impl Delivery {
    pub fn is_realtime(&self) -> bool {
        matches!(self, Delivery::Realtime)
    }
}

/// Sends through `channel`, falling back when the transport rejects it.
///
/// # Errors
///
/// - Errors from the channel that do not warrant a fallback (encode
///   failures, torn-down adapter, transport write errors).
/// - [`RealtimeError::Fallback`] when the fallback path fails too.
pub async fn deliver<K: ChannelKind>(
    channel: &ChannelAdapter<K>,
    fallback: &dyn MessageFallback,
    entity: &K::Id,
    message: &OutboundMessage,
) -> Result<Delivery, RealtimeError> {
    match channel.send(entity, message) {
        Ok(()) => Ok(Delivery::Realtime),
        Err(e) if e.should_fall_back() => {
            tracing::info!(
                channel = K::LABEL,
                entity = %entity,
                "Realtime send unavailable, using fallback"
            );
            let created = fallback.send(&K::target(entity), message).await?;
            Ok(Delivery::Fallback(created))
        }
        Err(e) => Err(e),
    }
}
