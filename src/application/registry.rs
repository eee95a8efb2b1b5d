//! Topic subscription registry.
//!
//! Multiplexes topic subscriptions over the shared [`RealtimeConnection`].
//! The registry is the only writer of the topic map and guarantees at most
//! one live subscription per [`TopicKey`]: subscribing an already-live key
//! cancels the previous subscription before the new one is created.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use crate::domain::foundation::{RealtimeError, SubscriptionId};
use crate::domain::messaging::ChatMessage;
use crate::domain::realtime::{Destinations, TopicKey};
use crate::ports::{FrameCallback, TransportSession, TransportSubscriptionId};

use super::connection::RealtimeConnection;

/// Receives every parsed message of one subscription.
pub type MessageHandler = Arc<dyn Fn(ChatMessage) + Send + Sync>;

type TopicMap = Mutex<HashMap<TopicKey, Arc<SubscriptionEntry>>>;

/// Parses frames and forwards them while the subscription is live.
struct Dispatcher {
    topic: TopicKey,
    handler: RwLock<Option<MessageHandler>>,
    cancelled: AtomicBool,
}

impl Dispatcher {
    fn dispatch(&self, body: &str) {
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        let message = match ChatMessage::from_frame(body) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(topic = %self.topic, "Dropping malformed frame: {}", e);
                return;
            }
        };
        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(message);
        }
    }

    /// Marks the dispatcher cancelled; true only for the first call.
    fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }
}

struct SubscriptionEntry {
    id: SubscriptionId,
    destination: String,
    transport_id: TransportSubscriptionId,
    session: Arc<dyn TransportSession>,
    dispatcher: Arc<Dispatcher>,
}

impl SubscriptionEntry {
    fn release(&self) -> bool {
        if !self.dispatcher.cancel() {
            return false;
        }
        if let Err(e) = self.session.unsubscribe(&self.transport_id) {
            tracing::debug!(
                topic = %self.dispatcher.topic,
                "Unsubscribe on transport failed: {}",
                e
            );
        }
        tracing::debug!(topic = %self.dispatcher.topic, subscription = %self.id, "Subscription cancelled");
        true
    }
}

/// Live binding of a topic key to a handler.
///
/// Cancelled explicitly with [`Subscription::cancel`], or superseded by a
/// newer subscription on the same key. Dropping the handle does not cancel.
pub struct Subscription {
    entry: Arc<SubscriptionEntry>,
    topics: Weak<TopicMap>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.entry.id
    }

    pub fn topic(&self) -> &TopicKey {
        &self.entry.dispatcher.topic
    }

    /// Transport destination the subscription listens on.
    pub fn destination(&self) -> &str {
        &self.entry.destination
    }

    pub fn is_active(&self) -> bool {
        !self.entry.dispatcher.cancelled.load(Ordering::Acquire)
    }

    /// Unsubscribes at the transport exactly once; later calls are no-ops.
    ///
    /// After return no further frame reaches the handler and the handler
    /// reference is released.
    pub fn cancel(&self) {
        if !self.entry.release() {
            return;
        }
        if let Some(topics) = self.topics.upgrade() {
            let mut topics = topics.lock().unwrap_or_else(PoisonError::into_inner);
            let current = topics
                .get(self.topic())
                .is_some_and(|entry| Arc::ptr_eq(entry, &self.entry));
            if current {
                topics.remove(self.topic());
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id)
            .field("topic", self.topic())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Creates and destroys topic subscriptions on the active connection.
pub struct SubscriptionRegistry {
    connection: Arc<RealtimeConnection>,
    destinations: Destinations,
    topics: Arc<TopicMap>,
}

impl SubscriptionRegistry {
    pub fn new(connection: Arc<RealtimeConnection>, destinations: Destinations) -> Self {
        Self {
            connection,
            destinations,
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn connection(&self) -> &Arc<RealtimeConnection> {
        &self.connection
    }

    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    /// Subscribes `topic` and routes its parsed messages to `handler`.
    ///
    /// A live subscription on the same key is cancelled first. Malformed
    /// frames are logged and dropped; they never reach the handler.
    ///
    /// # Errors
    ///
    /// - [`RealtimeError::NotConnected`] unless the connection is `Connected`.
    ///   Nothing is queued.
    /// - Transport errors from the session's subscribe call.
    pub fn subscribe(
        &self,
        topic: TopicKey,
        handler: MessageHandler,
    ) -> Result<Subscription, RealtimeError> {
        let mut topics = self.lock();

        let session = self
            .connection
            .active_session()
            .ok_or(RealtimeError::NotConnected)?;

        if let Some(previous) = topics.remove(&topic) {
            tracing::debug!(topic = %topic, "Replacing live subscription");
            previous.release();
        }

        let destination = self.destinations.subscribe_destination(&topic);
        let dispatcher = Arc::new(Dispatcher {
            topic: topic.clone(),
            handler: RwLock::new(Some(handler)),
            cancelled: AtomicBool::new(false),
        });
        let on_frame: FrameCallback = {
            let dispatcher = dispatcher.clone();
            Arc::new(move |body: &str| dispatcher.dispatch(body))
        };

        let transport_id = session.subscribe(&destination, on_frame)?;
        let entry = Arc::new(SubscriptionEntry {
            id: SubscriptionId::new(),
            destination,
            transport_id,
            session,
            dispatcher,
        });
        topics.insert(topic.clone(), entry.clone());

        tracing::info!(
            topic = %topic,
            destination = %entry.destination,
            subscription = %entry.id,
            "Subscribed"
        );
        Ok(Subscription {
            entry,
            topics: Arc::downgrade(&self.topics),
        })
    }

    /// Cancels the live subscription on `topic`, if any.
    pub fn unsubscribe(&self, topic: &TopicKey) -> bool {
        let entry = self.lock().remove(topic);
        entry.is_some_and(|entry| entry.release())
    }

    /// Cancels every live subscription.
    pub fn clear(&self) {
        let entries: Vec<_> = self.lock().drain().map(|(_, entry)| entry).collect();
        for entry in entries {
            entry.release();
        }
    }

    pub fn is_subscribed(&self, topic: &TopicKey) -> bool {
        self.lock().contains_key(topic)
    }

    pub fn active_topics(&self) -> Vec<TopicKey> {
        let mut topics: Vec<_> = self.lock().keys().cloned().collect();
        topics.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        topics
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TopicKey, Arc<SubscriptionEntry>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
