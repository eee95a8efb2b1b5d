//! Topic keys, destinations and the two channel namespaces.
//!
//! A topic key is the transport-independent name of a broadcast channel
//! (`rooms/<id>`, `private/<id>`). Destinations are the concrete STOMP
//! addresses built by prefixing keys with the broker's topic or
//! application prefix.

use std::fmt;
use std::hash::Hash;

use crate::domain::foundation::{ChatId, RoomId};

/// Logical name of an inbound broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicKey(String);

impl TopicKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TopicKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Broker prefixes used to turn keys into destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    /// Prefix for subscribe destinations (broker topics).
    pub topic_prefix: String,
    /// Prefix for send destinations (application handlers).
    pub app_prefix: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            topic_prefix: "/topic".to_string(),
            app_prefix: "/app".to_string(),
        }
    }
}

impl Destinations {
    pub fn new(topic_prefix: impl Into<String>, app_prefix: impl Into<String>) -> Self {
        Self {
            topic_prefix: topic_prefix.into(),
            app_prefix: app_prefix.into(),
        }
    }

    /// Subscribe destination for a topic key, e.g. `/topic/rooms/42`.
    pub fn subscribe_destination(&self, key: &TopicKey) -> String {
        join(&self.topic_prefix, key.as_str())
    }

    /// Send destination for an outbound path, e.g. `/app/chat/42`.
    pub fn send_destination(&self, path: &str) -> String {
        join(&self.app_prefix, path)
    }
}

fn join(prefix: &str, path: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Target of a non-realtime send, used by the REST fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelTarget {
    Room(RoomId),
    Private(ChatId),
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTarget::Room(id) => write!(f, "room {}", id),
            ChannelTarget::Private(id) => write!(f, "private chat {}", id),
        }
    }
}

/// Namespace of one channel family (room broadcast or private chat).
///
/// Both families share the adapter contract; only the id type and the
/// topic/send addressing differ.
pub trait ChannelKind: Send + Sync + 'static {
    /// Entity identifier selected by the UI.
    type Id: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Short label for logs.
    const LABEL: &'static str;

    /// Inbound topic key for an entity.
    fn topic_key(id: &Self::Id) -> TopicKey;

    /// Outbound path (before the application prefix) for an entity.
    fn send_path(id: &Self::Id) -> String;

    /// Fallback target for an entity.
    fn target(id: &Self::Id) -> ChannelTarget;
}

/// Room broadcast chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Room;

impl ChannelKind for Room {
    type Id = RoomId;

    const LABEL: &'static str = "room";

    fn topic_key(id: &RoomId) -> TopicKey {
        TopicKey(format!("rooms/{}", id))
    }

    fn send_path(id: &RoomId) -> String {
        format!("chat/{}", id)
    }

    fn target(id: &RoomId) -> ChannelTarget {
        ChannelTarget::Room(id.clone())
    }
}

/// Private 1:1 chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivateChat;

impl ChannelKind for PrivateChat {
    type Id = ChatId;

    const LABEL: &'static str = "private";

    fn topic_key(id: &ChatId) -> TopicKey {
        TopicKey(format!("private/{}", id))
    }

    fn send_path(id: &ChatId) -> String {
        format!("private/{}", id)
    }

    fn target(id: &ChatId) -> ChannelTarget {
        ChannelTarget::Private(id.clone())
    }
}
