//! Realtime module - transport and channel lifecycles, backoff, addressing.

mod channel_state;
mod reconnect;
mod topic;
mod transport_state;

pub use channel_state::ChannelState;
pub use reconnect::ReconnectPolicy;
pub use topic::{ChannelKind, ChannelTarget, Destinations, PrivateChat, Room, TopicKey};
pub use transport_state::TransportState;
