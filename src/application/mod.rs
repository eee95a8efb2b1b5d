//! Application layer - Connection lifecycle, subscriptions and channels.
//!
//! Orchestrates the domain types over the ports:
//!
//! - `RealtimeConnection` - the single shared session and its reconnect policy
//! - `SubscriptionRegistry` - at most one live subscription per topic key
//! - `ChannelAdapter` - room / private chat binding to the registry
//! - `deliver` - realtime send with a non-realtime fallback
//! - `ChatClient` - wiring of the above

mod channel;
mod client;
mod connection;
mod delivery;
mod registry;

pub use channel::{ChannelAdapter, PrivateChannel, RoomChannel};
pub use client::ChatClient;
pub use connection::{
    ConnectCallback, ConnectOutcome, ConnectionObserver, ErrorCallback, ObserverId,
    RealtimeConnection,
};
pub use delivery::{deliver, Delivery};
pub use registry::{MessageHandler, Subscription, SubscriptionRegistry};
