//! In-memory session transport for testing.
//!
//! Provides synchronous, deterministic session behavior for unit and
//! integration tests. Nothing happens on its own: tests drive each session
//! outcome (`accept`, `fail`, `drop_connection`) and inbound frames
//! (`deliver`) explicitly, and assert against the recorded call log.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use secrecy::ExposeSecret;

use crate::domain::foundation::RealtimeError;
use crate::ports::{
    ConnectRequest, FrameCallback, SessionListener, SessionTransport, TransportSession,
    TransportSubscriptionId,
};

/// One recorded interaction with the transport, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Open {
        url: String,
        credential: String,
    },
    Subscribe {
        id: TransportSubscriptionId,
        destination: String,
    },
    Unsubscribe {
        id: TransportSubscriptionId,
        destination: String,
    },
    Send {
        destination: String,
        body: String,
    },
    Disconnect,
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<TransportCall>>,
    sessions: Mutex<Vec<Arc<InMemorySession>>>,
    fail_next_open: Mutex<Option<RealtimeError>>,
    next_subscription: AtomicU64,
}

impl Shared {
    fn record(&self, call: TransportCall) {
        self.calls
            .lock()
            .expect("InMemoryTransport: calls lock poisoned")
            .push(call);
    }
}

/// In-memory transport for testing.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
///
/// # Example
///
/// ```ignore
/// let transport = Arc::new(InMemoryTransport::new());
/// connection.connect(None, None)?;
///
/// transport.latest_session().unwrap().accept();
/// transport.deliver("/topic/rooms/42", r#"{"sender":"a","content":"hi","timestamp":0}"#);
///
/// assert_eq!(transport.open_count(), 1);
/// ```
#[derive(Default)]
pub struct InMemoryTransport {
    shared: Arc<Shared>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes the next `open` fail synchronously with `error`.
    pub fn fail_next_open(&self, error: RealtimeError) {
        *self
            .shared
            .fail_next_open
            .lock()
            .expect("InMemoryTransport: fail lock poisoned") = Some(error);
    }

    /// Number of sessions opened so far.
    pub fn open_count(&self) -> usize {
        self.sessions().len()
    }

    /// The most recently opened session.
    pub fn latest_session(&self) -> Option<Arc<InMemorySession>> {
        self.sessions().last().cloned()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.shared
            .calls
            .lock()
            .expect("InMemoryTransport: calls lock poisoned")
            .clone()
    }

    /// Destinations currently subscribed on open sessions, in subscribe order.
    pub fn active_subscriptions(&self) -> Vec<String> {
        self.sessions()
            .iter()
            .filter(|session| !session.is_closed())
            .flat_map(|session| session.destinations())
            .collect()
    }

    /// Delivers a frame to every subscriber of `destination` on open sessions.
    ///
    /// Returns the number of callbacks invoked.
    pub fn deliver(&self, destination: &str, body: &str) -> usize {
        self.sessions()
            .iter()
            .filter(|session| !session.is_closed())
            .map(|session| session.deliver(destination, body))
            .sum()
    }

    fn sessions(&self) -> Vec<Arc<InMemorySession>> {
        self.shared
            .sessions
            .lock()
            .expect("InMemoryTransport: sessions lock poisoned")
            .clone()
    }
}

impl SessionTransport for InMemoryTransport {
    fn open(
        &self,
        request: ConnectRequest,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Arc<dyn TransportSession>, RealtimeError> {
        let forced = self
            .shared
            .fail_next_open
            .lock()
            .expect("InMemoryTransport: fail lock poisoned")
            .take();
        if let Some(error) = forced {
            return Err(error);
        }

        self.shared.record(TransportCall::Open {
            url: request.url,
            credential: request.credential.expose_secret().clone(),
        });
        let session = Arc::new(InMemorySession {
            shared: self.shared.clone(),
            listener,
            subscriptions: Mutex::new(Vec::new()),
            fail_next_subscribe: Mutex::new(None),
            closed: AtomicBool::new(false),
        });
        self.shared
            .sessions
            .lock()
            .expect("InMemoryTransport: sessions lock poisoned")
            .push(session.clone());
        Ok(session)
    }
}

/// Session handle of [`InMemoryTransport`].
pub struct InMemorySession {
    shared: Arc<Shared>,
    listener: Arc<dyn SessionListener>,
    subscriptions: Mutex<Vec<(TransportSubscriptionId, String, FrameCallback)>>,
    fail_next_subscribe: Mutex<Option<RealtimeError>>,
    closed: AtomicBool,
}

impl InMemorySession {
    /// Reports a successful handshake to the listener.
    pub fn accept(&self) {
        self.listener.on_connected();
    }

    /// Reports a handshake or protocol failure to the listener.
    pub fn fail(&self, reason: &str) {
        self.closed.store(true, Ordering::SeqCst);
        self.listener.on_error(RealtimeError::transport(reason));
    }

    /// Simulates the server closing the session.
    pub fn drop_connection(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.lock_subscriptions().clear();
        self.listener.on_closed();
    }

    /// Makes the next `subscribe` on this session fail with `error`.
    pub fn fail_next_subscribe(&self, error: RealtimeError) {
        *self
            .fail_next_subscribe
            .lock()
            .expect("InMemorySession: fail lock poisoned") = Some(error);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Delivers a frame to the subscribers of `destination` on this session.
    pub fn deliver(&self, destination: &str, body: &str) -> usize {
        let callbacks: Vec<FrameCallback> = self
            .lock_subscriptions()
            .iter()
            .filter(|(_, subscribed, _)| subscribed == destination)
            .map(|(_, _, callback)| callback.clone())
            .collect();
        for callback in &callbacks {
            callback(body);
        }
        callbacks.len()
    }

    fn destinations(&self) -> Vec<String> {
        self.lock_subscriptions()
            .iter()
            .map(|(_, destination, _)| destination.clone())
            .collect()
    }

    fn lock_subscriptions(
        &self,
    ) -> std::sync::MutexGuard<'_, Vec<(TransportSubscriptionId, String, FrameCallback)>> {
        self.subscriptions
            .lock()
            .expect("InMemorySession: subscriptions lock poisoned")
    }
}

impl TransportSession for InMemorySession {
    fn subscribe(
        &self,
        destination: &str,
        on_frame: FrameCallback,
    ) -> Result<TransportSubscriptionId, RealtimeError> {
        if self.is_closed() {
            return Err(RealtimeError::transport("session closed"));
        }
        let forced = self
            .fail_next_subscribe
            .lock()
            .expect("InMemorySession: fail lock poisoned")
            .take();
        if let Some(error) = forced {
            return Err(error);
        }
        let n = self.shared.next_subscription.fetch_add(1, Ordering::SeqCst);
        let id = TransportSubscriptionId::new(format!("sub-{}", n));
        self.lock_subscriptions()
            .push((id.clone(), destination.to_string(), on_frame));
        self.shared.record(TransportCall::Subscribe {
            id: id.clone(),
            destination: destination.to_string(),
        });
        Ok(id)
    }

    fn unsubscribe(&self, id: &TransportSubscriptionId) -> Result<(), RealtimeError> {
        let removed = {
            let mut subscriptions = self.lock_subscriptions();
            subscriptions
                .iter()
                .position(|(existing, _, _)| existing == id)
                .map(|index| subscriptions.remove(index))
        };
        if let Some((id, destination, _)) = removed {
            self.shared
                .record(TransportCall::Unsubscribe { id, destination });
        }
        Ok(())
    }

    fn send(&self, destination: &str, body: &str) -> Result<(), RealtimeError> {
        if self.is_closed() {
            return Err(RealtimeError::transport("session closed"));
        }
        self.shared.record(TransportCall::Send {
            destination: destination.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn disconnect(&self) -> Result<(), RealtimeError> {
        self.closed.store(true, Ordering::SeqCst);
        self.lock_subscriptions().clear();
        self.shared.record(TransportCall::Disconnect);
        Ok(())
    }
}
