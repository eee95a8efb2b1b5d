//! Messaging module - chat message values exchanged over the realtime core.

mod message;

pub use message::{ChatMessage, MediaAttachment, MediaKind, MessageType, OutboundMessage};
