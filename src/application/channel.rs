//! Channel adapters - bind the selected room or private chat to a topic.
//!
//! A [`ChannelAdapter`] owns one binding: the currently selected entity,
//! its live subscription, and the latest UI handler. It observes the shared
//! connection and keeps the subscription in step with the transport:
//!
//! ```text
//!            select(id), disconnected
//!   Idle ───────────────────────────────> AwaitingConnection
//!    │                                        │      ^
//!    │ select(id), connected                  │      │ transport leaves Connected
//!    │                      transport Connected│      │ (or subscribe failed,
//!    │                                        │      │  or topic taken over)
//!    v                                        v      │
//!   Subscribed <──────────────────────────────┘──────┘
//!        select(other id): cancel old, subscribe new
//!
//!   any state ── teardown / drop ──> TornDown (terminal)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

use tokio::sync::watch;

use crate::domain::foundation::{RealtimeError, StateMachine};
use crate::domain::messaging::OutboundMessage;
use crate::domain::realtime::{
    ChannelKind, ChannelState, ChannelTarget, PrivateChat, Room, TopicKey, TransportState,
};

use super::connection::{ConnectionObserver, ObserverId, RealtimeConnection};
use super::registry::{MessageHandler, Subscription, SubscriptionRegistry};

/// Adapter for room broadcast chat.
pub type RoomChannel = ChannelAdapter<Room>;

/// Adapter for private 1:1 chat.
pub type PrivateChannel = ChannelAdapter<PrivateChat>;

struct Binding<Id> {
    entity: Option<Id>,
    subscription: Option<Subscription>,
    state: ChannelState,
}

impl<Id> Binding<Id> {
    fn cancel_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Forgets a subscription the registry has cancelled or replaced, so
    /// the next select or `Connected` transition binds again.
    fn release_superseded(&mut self) {
        let superseded = self
            .subscription
            .as_ref()
            .is_some_and(|subscription| !subscription.is_active());
        if !superseded {
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            tracing::debug!(topic = %subscription.topic(), "Subscription superseded");
        }
        if self.state == ChannelState::Subscribed {
            self.move_to(ChannelState::AwaitingConnection);
        }
    }

    fn move_to(&mut self, next: ChannelState) {
        match self.state.transition_to(next) {
            Ok(state) => self.state = state,
            Err(e) => tracing::warn!("Channel binding: {}", e),
        }
    }
}

/// Binds UI entity selection to subscribe and send operations.
pub struct ChannelAdapter<K: ChannelKind> {
    registry: Arc<SubscriptionRegistry>,
    binding: Mutex<Binding<K::Id>>,
    latest_handler: Arc<RwLock<Option<MessageHandler>>>,
    connected: watch::Sender<bool>,
    observer: OnceLock<ObserverId>,
}

impl<K: ChannelKind> ChannelAdapter<K> {
    /// Creates an idle adapter observing the registry's connection.
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Arc<Self> {
        let connection = registry.connection().clone();
        let (connected, _) = watch::channel(connection.is_connected());
        let adapter = Arc::new(Self {
            registry,
            binding: Mutex::new(Binding {
                entity: None,
                subscription: None,
                state: ChannelState::Idle,
            }),
            latest_handler: Arc::new(RwLock::new(None)),
            connected,
            observer: OnceLock::new(),
        });

        let weak = Arc::downgrade(&adapter);
        let id = connection.add_observer(weak);
        let _ = adapter.observer.set(id);
        adapter.on_transport_state(connection.state());
        adapter
    }

    fn connection(&self) -> &Arc<RealtimeConnection> {
        self.registry.connection()
    }

    /// Replaces the handler that receives inbound messages.
    ///
    /// Takes effect for the next frame; the subscription is not recreated.
    pub fn set_handler(&self, handler: MessageHandler) {
        *self
            .latest_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Selects the entity to follow, or clears the selection with `None`.
    ///
    /// The previous subscription is cancelled before the new one is created.
    /// Subscribe failures are logged and leave the adapter waiting for the
    /// next `Connected` transition.
    ///
    /// # Errors
    ///
    /// [`RealtimeError::TornDown`] once the adapter has been torn down.
    pub fn select(&self, entity: Option<K::Id>) -> Result<ChannelState, RealtimeError> {
        let mut binding = self.lock();
        if binding.state == ChannelState::TornDown {
            return Err(RealtimeError::TornDown);
        }
        if binding.entity == entity && binding.state == ChannelState::Subscribed {
            return Ok(binding.state);
        }

        binding.cancel_subscription();
        binding.entity = entity;
        tracing::debug!(
            channel = K::LABEL,
            entity = ?binding.entity,
            "Entity selected"
        );

        if self.connection().is_connected() {
            self.bind(&mut binding);
        } else {
            self.park(&mut binding);
        }
        Ok(binding.state)
    }

    /// Sends `message` to `entity` over the realtime connection.
    ///
    /// Never buffers. Callers are expected to fall back to a non-realtime
    /// path when this returns [`RealtimeError::SendRejected`].
    ///
    /// # Errors
    ///
    /// - [`RealtimeError::SendRejected`] when the adapter is not connected.
    /// - [`RealtimeError::TornDown`] after teardown.
    /// - [`RealtimeError::Encode`] when the message cannot be serialized.
    pub fn send(&self, entity: &K::Id, message: &OutboundMessage) -> Result<(), RealtimeError> {
        if self.state() == ChannelState::TornDown {
            return Err(RealtimeError::TornDown);
        }
        if !self.connected() {
            tracing::debug!(channel = K::LABEL, entity = %entity, "Send rejected: not connected");
            return Err(RealtimeError::SendRejected);
        }

        let body = message.to_body()?;
        let destination = self
            .registry
            .destinations()
            .send_destination(&K::send_path(entity));
        tracing::debug!(channel = K::LABEL, destination = %destination, "Sending message");
        self.connection().send(&destination, &body)
    }

    /// Cancels the subscription and stops observing the connection.
    ///
    /// Terminal and idempotent. The shared connection stays open.
    pub fn teardown(&self) {
        {
            let mut binding = self.lock();
            if binding.state == ChannelState::TornDown {
                return;
            }
            binding.cancel_subscription();
            binding.entity = None;
            binding.move_to(ChannelState::TornDown);
        }

        self.latest_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.connected.send_replace(false);
        if let Some(id) = self.observer.get() {
            self.connection().remove_observer(*id);
        }
        tracing::debug!(channel = K::LABEL, "Channel torn down");
    }

    // === Queries ===

    /// Whether the shared transport is connected, as last observed.
    pub fn connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Observable form of [`ChannelAdapter::connected`].
    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub fn state(&self) -> ChannelState {
        self.lock().state
    }

    pub fn current_entity(&self) -> Option<K::Id> {
        self.lock().entity.clone()
    }

    /// Topic of the live subscription, if subscribed.
    pub fn active_topic(&self) -> Option<TopicKey> {
        self.lock()
            .subscription
            .as_ref()
            .map(|subscription| subscription.topic().clone())
    }

    /// Fallback target for `entity`.
    pub fn target(entity: &K::Id) -> ChannelTarget {
        K::target(entity)
    }

    // === Binding transitions (binding lock held) ===

    fn bind(&self, binding: &mut Binding<K::Id>) {
        let Some(entity) = binding.entity.clone() else {
            binding.move_to(ChannelState::Idle);
            return;
        };

        let slot = self.latest_handler.clone();
        let handler: MessageHandler = Arc::new(move |message| {
            let current = slot.read().unwrap_or_else(PoisonError::into_inner).clone();
            if let Some(current) = current {
                current(message);
            }
        });

        match self.registry.subscribe(K::topic_key(&entity), handler) {
            Ok(subscription) => {
                binding.subscription = Some(subscription);
                binding.move_to(ChannelState::Subscribed);
            }
            Err(e) => {
                tracing::warn!(
                    channel = K::LABEL,
                    entity = %entity,
                    "Subscribe failed, waiting for next connect: {}",
                    e
                );
                binding.move_to(ChannelState::AwaitingConnection);
            }
        }
    }

    fn park(&self, binding: &mut Binding<K::Id>) {
        binding.cancel_subscription();
        let next = if binding.entity.is_some() {
            ChannelState::AwaitingConnection
        } else {
            ChannelState::Idle
        };
        binding.move_to(next);
    }

    fn lock(&self) -> MutexGuard<'_, Binding<K::Id>> {
        let mut binding = self.binding.lock().unwrap_or_else(PoisonError::into_inner);
        binding.release_superseded();
        binding
    }
}

impl<K: ChannelKind> ConnectionObserver for ChannelAdapter<K> {
    fn on_transport_state(&self, _state: TransportState) {
        let mut binding = self.lock();
        if binding.state == ChannelState::TornDown {
            return;
        }
        // Read under the binding lock: the last notification to get here
        // sees the final transport state.
        let connected = self.connection().is_connected();
        self.connected.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });

        if connected {
            if binding.subscription.is_none() {
                self.bind(&mut binding);
            }
        } else if binding.subscription.is_some() || binding.state != ChannelState::Idle {
            self.park(&mut binding);
        }
    }
}

impl<K: ChannelKind> Drop for ChannelAdapter<K> {
    fn drop(&mut self) {
        self.teardown();
    }
}
