//! ChatClient - wires the shared connection, registry and adapters.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RealtimeConfig;
use crate::domain::foundation::RealtimeError;
use crate::domain::realtime::{Destinations, ReconnectPolicy};
use crate::ports::{CredentialProvider, EndpointResolver, Heartbeat, SessionTransport};

use super::channel::{PrivateChannel, RoomChannel};
use super::connection::{ConnectCallback, ConnectOutcome, ErrorCallback, RealtimeConnection};
use super::registry::SubscriptionRegistry;

/// One realtime connection and its registry, shared by every adapter.
///
/// Cloning is cheap; clones share the same connection.
#[derive(Clone)]
pub struct ChatClient {
    connection: Arc<RealtimeConnection>,
    registry: Arc<SubscriptionRegistry>,
}

impl ChatClient {
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        credentials: Arc<dyn CredentialProvider>,
        endpoint: Arc<dyn EndpointResolver>,
        policy: ReconnectPolicy,
        heartbeat: Heartbeat,
        destinations: Destinations,
    ) -> Self {
        let connection = RealtimeConnection::new(transport, credentials, endpoint, policy, heartbeat);
        let registry = Arc::new(SubscriptionRegistry::new(connection.clone(), destinations));
        Self {
            connection,
            registry,
        }
    }

    /// Builds a client from the `realtime` configuration section.
    pub fn from_config(
        config: &RealtimeConfig,
        transport: Arc<dyn SessionTransport>,
        credentials: Arc<dyn CredentialProvider>,
        endpoint: Arc<dyn EndpointResolver>,
    ) -> Self {
        Self::new(
            transport,
            credentials,
            endpoint,
            ReconnectPolicy::new(
                Duration::from_millis(config.reconnect_base_delay_ms),
                config.max_reconnect_attempts,
            ),
            Heartbeat {
                outgoing: Duration::from_millis(config.heartbeat_outgoing_ms),
                incoming: Duration::from_millis(config.heartbeat_incoming_ms),
            },
            Destinations::new(&config.topic_prefix, &config.app_prefix),
        )
    }

    /// See [`RealtimeConnection::connect`].
    pub fn connect(
        &self,
        on_connect: Option<ConnectCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Result<ConnectOutcome, RealtimeError> {
        self.connection.connect(on_connect, on_error)
    }

    /// Drops every subscription and closes the connection.
    pub fn disconnect(&self) {
        self.registry.clear();
        self.connection.disconnect();
    }

    pub fn room_channel(&self) -> Arc<RoomChannel> {
        RoomChannel::new(self.registry.clone())
    }

    pub fn private_channel(&self) -> Arc<PrivateChannel> {
        PrivateChannel::new(self.registry.clone())
    }

    pub fn connection(&self) -> &Arc<RealtimeConnection> {
        &self.connection
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }
}
