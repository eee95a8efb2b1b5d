//! Chat message model and its JSON wire shape.
//!
//! Inbound frames carry a loosely-typed JSON record whose optional fields
//! depend on `messageType`. The domain models it as a tagged variant so
//! a media message always has a media URL and a text message never has one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{RealtimeError, Timestamp};

/// Kind discriminator carried in `messageType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Audio,
    Document,
}

impl MessageType {
    /// Media kind for this message type, `None` for plain text.
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            MessageType::Text => None,
            MessageType::Image => Some(MediaKind::Image),
            MessageType::Video => Some(MediaKind::Video),
            MessageType::Audio => Some(MediaKind::Audio),
            MessageType::Document => Some(MediaKind::Document),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "TEXT",
            MessageType::Image => "IMAGE",
            MessageType::Video => "VIDEO",
            MessageType::Audio => "AUDIO",
            MessageType::Document => "DOCUMENT",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of media attachment a message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl From<MediaKind> for MessageType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MessageType::Image,
            MediaKind::Video => MessageType::Video,
            MediaKind::Audio => MessageType::Audio,
            MediaKind::Document => MessageType::Document,
        }
    }
}

/// Media payload of a non-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    pub url: String,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

/// A chat message received from a room or private chat topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub enum ChatMessage {
    Text {
        sender: String,
        content: String,
        timestamp: Timestamp,
    },
    Media {
        sender: String,
        content: String,
        timestamp: Timestamp,
        media: MediaAttachment,
    },
}

impl ChatMessage {
    /// Parses a frame body.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Parse`] when the body is not JSON, lacks a
    /// required field, or declares a media type without a media URL.
    pub fn from_frame(body: &str) -> Result<Self, RealtimeError> {
        serde_json::from_str(body).map_err(RealtimeError::parse)
    }

    pub fn sender(&self) -> &str {
        match self {
            ChatMessage::Text { sender, .. } | ChatMessage::Media { sender, .. } => sender,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChatMessage::Text { content, .. } | ChatMessage::Media { content, .. } => content,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            ChatMessage::Text { timestamp, .. } | ChatMessage::Media { timestamp, .. } => {
                *timestamp
            }
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            ChatMessage::Text { .. } => MessageType::Text,
            ChatMessage::Media { media, .. } => media.kind.into(),
        }
    }

    pub fn media(&self) -> Option<&MediaAttachment> {
        match self {
            ChatMessage::Text { .. } => None,
            ChatMessage::Media { media, .. } => Some(media),
        }
    }
}

/// Outbound payload for a realtime send or the REST fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_file_size: Option<u64>,
}

impl OutboundMessage {
    /// Plain text message; only `content` goes on the wire.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            message_type: None,
            media_url: None,
            media_file_name: None,
            media_file_size: None,
        }
    }

    /// Message referencing an already uploaded media file.
    pub fn media(caption: impl Into<String>, media: MediaAttachment) -> Self {
        Self {
            content: caption.into(),
            message_type: Some(media.kind.into()),
            media_url: Some(media.url),
            media_file_name: media.file_name,
            media_file_size: media.file_size,
        }
    }

    /// Serializes the payload for a transport frame body.
    pub fn to_body(&self) -> Result<String, RealtimeError> {
        serde_json::to_string(self).map_err(|e| RealtimeError::Encode(e.to_string()))
    }
}

/// Loose JSON record exchanged with the chat server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(alias = "senderUsername", alias = "author")]
    sender: String,
    #[serde(default)]
    content: Option<String>,
    timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_type: Option<MessageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_file_size: Option<u64>,
}

impl TryFrom<WireMessage> for ChatMessage {
    type Error = String;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let content = wire.content.unwrap_or_default();
        let kind = wire.message_type.and_then(|t| t.media_kind());

        match kind {
            None => Ok(ChatMessage::Text {
                sender: wire.sender,
                content,
                timestamp: wire.timestamp,
            }),
            Some(kind) => {
                let url = wire
                    .media_url
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| format!("{:?} message without mediaUrl", kind))?;
                Ok(ChatMessage::Media {
                    sender: wire.sender,
                    content,
                    timestamp: wire.timestamp,
                    media: MediaAttachment {
                        kind,
                        url,
                        file_name: wire.media_file_name,
                        file_size: wire.media_file_size,
                    },
                })
            }
        }
    }
}

impl From<ChatMessage> for WireMessage {
    fn from(message: ChatMessage) -> Self {
        match message {
            ChatMessage::Text {
                sender,
                content,
                timestamp,
            } => WireMessage {
                sender,
                content: Some(content),
                timestamp,
                message_type: Some(MessageType::Text),
                media_url: None,
                media_file_name: None,
                media_file_size: None,
            },
            ChatMessage::Media {
                sender,
                content,
                timestamp,
                media,
            } => WireMessage {
                sender,
                content: Some(content),
                timestamp,
                message_type: Some(media.kind.into()),
                media_url: Some(media.url),
                media_file_name: media.file_name,
                media_file_size: media.file_size,
            },
        }
    }
}
