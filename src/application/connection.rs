//! Shared realtime connection with reconnect policy.
//!
//! One [`RealtimeConnection`] owns the single transport session of the
//! client process. Registries and channel adapters hold it by `Arc` and
//! observe its state; only the connection mutates its own state.
//!
//! Handles:
//!
//! - Idempotent `connect` (already connected / already connecting)
//! - Linear reconnect backoff with an attempt cap
//! - Stale-session suppression: every open bumps a generation counter and
//!   outcomes from older sessions are ignored
//! - State-change fan-out to registered observers and a `watch` channel
//!
//! No observer or user callback runs while the internal lock is held.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::foundation::{RealtimeError, StateMachine};
use crate::domain::realtime::{ReconnectPolicy, TransportState};
use crate::ports::{
    ConnectRequest, CredentialProvider, EndpointResolver, Heartbeat, SessionListener,
    SessionTransport, TransportSession,
};

/// Invoked once the transport reports a successful handshake.
pub type ConnectCallback = Arc<dyn Fn() + Send + Sync>;

/// Invoked with every connection failure.
pub type ErrorCallback = Arc<dyn Fn(&RealtimeError) + Send + Sync>;

/// Result of a `connect` call that did not fail synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Already connected; `on_connect` was invoked immediately.
    AlreadyConnected,
    /// A handshake is in flight; no second attempt was started.
    InProgress,
    /// A new session is being opened.
    Started,
}

/// Receives transport state changes.
///
/// Called synchronously after each transition, outside the connection lock,
/// so observers may call back into the connection.
pub trait ConnectionObserver: Send + Sync {
    fn on_transport_state(&self, state: TransportState);
}

/// Handle returned by [`RealtimeConnection::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default, Clone)]
struct StoredCallbacks {
    on_connect: Option<ConnectCallback>,
    on_error: Option<ErrorCallback>,
}

struct ConnectionInner {
    state: TransportState,
    session: Option<Arc<dyn TransportSession>>,
    generation: u64,
    reconnect_attempts: u32,
    pending_reconnect: Option<JoinHandle<()>>,
    callbacks: StoredCallbacks,
}

/// The single shared realtime session and its reconnect state machine.
pub struct RealtimeConnection {
    transport: Arc<dyn SessionTransport>,
    credentials: Arc<dyn CredentialProvider>,
    endpoint: Arc<dyn EndpointResolver>,
    policy: ReconnectPolicy,
    heartbeat: Heartbeat,
    inner: Mutex<ConnectionInner>,
    observers: RwLock<Vec<(ObserverId, Weak<dyn ConnectionObserver>)>>,
    next_observer: Mutex<u64>,
    state_tx: watch::Sender<TransportState>,
    self_ref: Weak<RealtimeConnection>,
}

impl RealtimeConnection {
    /// Creates a disconnected connection manager.
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        credentials: Arc<dyn CredentialProvider>,
        endpoint: Arc<dyn EndpointResolver>,
        policy: ReconnectPolicy,
        heartbeat: Heartbeat,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(TransportState::Disconnected);
        Arc::new_cyclic(|self_ref| Self {
            transport,
            credentials,
            endpoint,
            policy,
            heartbeat,
            inner: Mutex::new(ConnectionInner {
                state: TransportState::Disconnected,
                session: None,
                generation: 0,
                reconnect_attempts: 0,
                pending_reconnect: None,
                callbacks: StoredCallbacks::default(),
            }),
            observers: RwLock::new(Vec::new()),
            next_observer: Mutex::new(0),
            state_tx,
            self_ref: self_ref.clone(),
        })
    }

    // === Queries ===

    pub fn state(&self) -> TransportState {
        self.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn is_connecting(&self) -> bool {
        self.state().is_connecting()
    }

    /// Automatic retries scheduled since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.lock().reconnect_attempts
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.lock().pending_reconnect.is_some()
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Receiver that always holds the latest transport state.
    pub fn state_changes(&self) -> watch::Receiver<TransportState> {
        self.state_tx.subscribe()
    }

    /// The open session, only while `Connected`.
    pub(crate) fn active_session(&self) -> Option<Arc<dyn TransportSession>> {
        let inner = self.lock();
        match inner.state {
            TransportState::Connected => inner.session.clone(),
            _ => None,
        }
    }

    // === Observers ===

    /// Registers an observer; it is held weakly and pruned once dropped.
    pub fn add_observer(&self, observer: Weak<dyn ConnectionObserver>) -> ObserverId {
        let id = {
            let mut next = self
                .next_observer
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            ObserverId(*next)
        };
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    pub fn remove_observer(&self, id: ObserverId) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    // === Lifecycle ===

    /// Opens the shared session unless one is already open or opening.
    ///
    /// The callbacks are stored and reused by automatic reconnects. An
    /// explicit call also restores the full reconnect budget.
    ///
    /// # Errors
    ///
    /// - [`RealtimeError::MissingCredential`] when no credential is available;
    ///   `on_error` is invoked as well and no network attempt is made.
    /// - Any error returned synchronously by the transport; the failure is
    ///   handled like an asynchronous one (reported, reconnect scheduled).
    pub fn connect(
        &self,
        on_connect: Option<ConnectCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Result<ConnectOutcome, RealtimeError> {
        self.start(
            StoredCallbacks {
                on_connect,
                on_error,
            },
            true,
        )
    }

    /// Closes the session and stops reconnecting.
    ///
    /// Always ends `Disconnected` with stored callbacks cleared, whether or
    /// not the graceful close succeeds.
    pub fn disconnect(&self) {
        let (previous, session) = {
            let mut inner = self.lock();
            if let Some(timer) = inner.pending_reconnect.take() {
                timer.abort();
            }
            let previous = inner.state;
            inner.generation += 1;
            inner.state = TransportState::Disconnected;
            inner.callbacks = StoredCallbacks::default();
            (previous, inner.session.take())
        };

        if let Some(session) = session {
            if previous.is_connected() {
                if let Err(e) = session.disconnect() {
                    tracing::debug!("Graceful disconnect failed: {}", e);
                }
            }
        }

        if previous != TransportState::Disconnected {
            tracing::info!("Realtime connection closed by client");
            self.publish();
        }
    }

    /// Fire-and-forget send on the open session.
    ///
    /// # Errors
    ///
    /// [`RealtimeError::SendRejected`] when not connected; transport errors
    /// from the session otherwise.
    pub fn send(&self, destination: &str, body: &str) -> Result<(), RealtimeError> {
        let session = self.active_session().ok_or(RealtimeError::SendRejected)?;
        session.send(destination, body)
    }

    fn start(&self, callbacks: StoredCallbacks, explicit: bool) -> Result<ConnectOutcome, RealtimeError> {
        let Some(credential) = self.credentials.credential() else {
            tracing::warn!("Realtime connect skipped: no authentication credential");
            let error = RealtimeError::MissingCredential;
            if let Some(on_error) = &callbacks.on_error {
                on_error(&error);
            }
            return Err(error);
        };

        let mut inner = self.lock();
        if explicit {
            inner.callbacks = callbacks.clone();
        }

        match inner.state {
            TransportState::Connected => {
                drop(inner);
                tracing::debug!("Realtime connection already established");
                if let Some(on_connect) = &callbacks.on_connect {
                    on_connect();
                }
                return Ok(ConnectOutcome::AlreadyConnected);
            }
            TransportState::Connecting => {
                tracing::debug!("Realtime connection already in progress");
                return Ok(ConnectOutcome::InProgress);
            }
            TransportState::Disconnected => {}
        }

        if explicit {
            inner.reconnect_attempts = 0;
        }
        if let Some(timer) = inner.pending_reconnect.take() {
            timer.abort();
        }

        inner.generation += 1;
        let generation = inner.generation;
        inner.state = TransportState::Connecting;

        let url = self.endpoint.endpoint_url();
        tracing::info!(url = %url, "Connecting realtime transport");
        let request = ConnectRequest {
            url,
            credential,
            heartbeat: self.heartbeat,
        };
        let listener: Arc<dyn SessionListener> = Arc::new(SessionEvents {
            connection: self.self_ref.clone(),
            generation,
        });

        // The lock is held across `open` so outcomes reported from another
        // thread cannot observe the session slot before it is filled.
        match self.transport.open(request, listener) {
            Ok(session) => {
                inner.session = Some(session);
                drop(inner);
                self.publish();
                Ok(ConnectOutcome::Started)
            }
            Err(error) => {
                drop(inner);
                self.publish();
                self.handle_failure(generation, error.clone());
                Err(error)
            }
        }
    }

    fn handle_connected(&self, generation: u64) {
        let on_connect = {
            let mut inner = self.lock();
            if inner.generation != generation {
                tracing::debug!("Ignoring connect from a superseded session");
                return;
            }
            if let Err(e) = inner.state.transition_to(TransportState::Connected) {
                tracing::warn!("Unexpected connect outcome: {}", e);
                return;
            }
            inner.state = TransportState::Connected;
            inner.reconnect_attempts = 0;
            inner.callbacks.on_connect.clone()
        };

        tracing::info!("Realtime transport connected");
        self.publish();
        if let Some(on_connect) = on_connect {
            on_connect();
        }
    }

    fn handle_failure(&self, generation: u64, error: RealtimeError) {
        let (changed, on_error) = {
            let mut inner = self.lock();
            if inner.generation != generation {
                tracing::debug!("Ignoring failure from a superseded session: {}", error);
                return;
            }
            let changed = inner.state != TransportState::Disconnected;
            inner.state = TransportState::Disconnected;
            inner.session = None;
            (changed, inner.callbacks.on_error.clone())
        };

        tracing::warn!("Realtime transport error: {}", error);
        if changed {
            self.publish();
        }
        if let Some(on_error) = on_error {
            on_error(&error);
        }
        self.schedule_reconnect();
    }

    fn handle_closed(&self, generation: u64) {
        let changed = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            let changed = inner.state != TransportState::Disconnected;
            inner.state = TransportState::Disconnected;
            inner.session = None;
            changed
        };

        if changed {
            tracing::info!("Realtime transport closed by peer");
            self.publish();
        }
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&self) {
        let mut inner = self.lock();
        if inner.pending_reconnect.is_some() || inner.state != TransportState::Disconnected {
            return;
        }
        if !self.policy.allows_attempt(inner.reconnect_attempts) {
            tracing::warn!(
                attempts = inner.reconnect_attempts,
                "Reconnect attempts exhausted; waiting for an explicit connect"
            );
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("No async runtime available; reconnect not scheduled");
            return;
        };

        inner.reconnect_attempts += 1;
        let attempt = inner.reconnect_attempts;
        let delay = self.policy.delay_for(attempt);
        tracing::debug!(attempt, ?delay, "Scheduling reconnect");

        let connection = self.self_ref.clone();
        inner.pending_reconnect = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(connection) = connection.upgrade() {
                connection.fire_reconnect(attempt);
            }
        }));
    }

    fn fire_reconnect(&self, attempt: u32) {
        let callbacks = {
            let mut inner = self.lock();
            inner.pending_reconnect = None;
            if inner.state != TransportState::Disconnected {
                return;
            }
            inner.callbacks.clone()
        };

        tracing::info!(
            attempt,
            max = self.policy.max_attempts,
            "Reconnect attempt"
        );
        if let Err(e) = self.start(callbacks, false) {
            tracing::debug!("Reconnect attempt {} failed to start: {}", attempt, e);
        }
    }

    /// Broadcasts the current state.
    ///
    /// The state is read and sent under the lock, so when transitions race
    /// the last broadcast always carries the final state.
    fn publish(&self) {
        let state = {
            let inner = self.lock();
            self.state_tx.send_replace(inner.state);
            inner.state
        };

        let observers: Vec<Arc<dyn ConnectionObserver>> = {
            let mut observers = self
                .observers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };
        for observer in observers {
            observer.on_transport_state(state);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = inner.pending_reconnect.take() {
            timer.abort();
        }
    }
}

/// Listener bound to one session generation.
struct SessionEvents {
    connection: Weak<RealtimeConnection>,
    generation: u64,
}

impl SessionListener for SessionEvents {
    fn on_connected(&self) {
        if let Some(connection) = self.connection.upgrade() {
            connection.handle_connected(self.generation);
        }
    }

    fn on_error(&self, error: RealtimeError) {
        if let Some(connection) = self.connection.upgrade() {
            connection.handle_failure(self.generation, error);
        }
    }

    fn on_closed(&self) {
        if let Some(connection) = self.connection.upgrade() {
            connection.handle_closed(self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::{StaticEndpoint, TokenStore};
    use crate::adapters::memory::{InMemoryTransport, TransportCall};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const BASE: Duration = Duration::from_millis(100);

    fn fixture(max_attempts: u32) -> (Arc<InMemoryTransport>, Arc<TokenStore>, Arc<RealtimeConnection>) {
        let transport = Arc::new(InMemoryTransport::new());
        let tokens = Arc::new(TokenStore::with_token("test-token"));
        let connection = RealtimeConnection::new(
            transport.clone(),
            tokens.clone(),
            Arc::new(StaticEndpoint::new("ws://localhost:8080/ws")),
            ReconnectPolicy::new(BASE, max_attempts),
            Heartbeat::default(),
        );
        (transport, tokens, connection)
    }

    fn counter() -> (Arc<AtomicUsize>, ConnectCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, Arc::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[tokio::test]
    async fn connect_without_credential_fails_without_network_attempt() {
        let (transport, tokens, connection) = fixture(3);
        tokens.clear();
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = errors.clone();

        let result = connection.connect(
            None,
            Some(Arc::new(move |e: &RealtimeError| {
                assert_eq!(e, &RealtimeError::MissingCredential);
                seen.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert_eq!(result, Err(RealtimeError::MissingCredential));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(transport.open_count(), 0);
        assert_eq!(connection.state(), TransportState::Disconnected);
    }

    #[tokio::test]
    async fn connect_passes_bearer_credential_and_endpoint() {
        let (transport, _tokens, connection) = fixture(3);

        connection.connect(None, None).unwrap();

        assert_eq!(
            transport.calls()[0],
            TransportCall::Open {
                url: "ws://localhost:8080/ws".to_string(),
                credential: "test-token".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn success_transitions_to_connected_and_invokes_callback() {
        let (transport, _tokens, connection) = fixture(3);
        let (connects, on_connect) = counter();

        assert_eq!(connection.connect(Some(on_connect), None), Ok(ConnectOutcome::Started));
        assert!(connection.is_connecting());

        transport.latest_session().unwrap().accept();

        assert!(connection.is_connected());
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_while_connected_invokes_callback_without_second_session() {
        let (transport, _tokens, connection) = fixture(3);
        connection.connect(None, None).unwrap();
        transport.latest_session().unwrap().accept();
        let (connects, on_connect) = counter();

        let outcome = connection.connect(Some(on_connect), None);

        assert_eq!(outcome, Ok(ConnectOutcome::AlreadyConnected));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn connect_while_connecting_returns_in_flight_attempt() {
        let (transport, _tokens, connection) = fixture(3);
        connection.connect(None, None).unwrap();

        assert_eq!(connection.connect(None, None), Ok(ConnectOutcome::InProgress));
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn synchronous_open_failure_is_reported_and_retried() {
        let (transport, _tokens, connection) = fixture(3);
        transport.fail_next_open(RealtimeError::transport("bad url"));
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = errors.clone();

        let result = connection.connect(
            None,
            Some(Arc::new(move |_: &RealtimeError| {
                seen.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert!(matches!(result, Err(RealtimeError::Transport(_))));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(connection.state(), TransportState::Disconnected);
        assert!(connection.has_pending_reconnect());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_schedules_linear_backoff() {
        let (transport, _tokens, connection) = fixture(5);
        connection.connect(None, None).unwrap();

        transport.latest_session().unwrap().fail("refused");
        assert_eq!(connection.reconnect_attempts(), 1);

        tokio::time::sleep(BASE - Duration::from_millis(1)).await;
        assert_eq!(transport.open_count(), 1);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(transport.open_count(), 2);

        transport.latest_session().unwrap().fail("refused");
        assert_eq!(connection.reconnect_attempts(), 2);

        tokio::time::sleep(BASE * 2 - Duration::from_millis(1)).await;
        assert_eq!(transport.open_count(), 2);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(transport.open_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn error_then_close_schedules_a_single_timer() {
        let (transport, _tokens, connection) = fixture(3);
        connection.connect(None, None).unwrap();
        let session = transport.latest_session().unwrap();

        session.fail("protocol error");
        session.drop_connection();

        assert_eq!(connection.reconnect_attempts(), 1);
        tokio::time::sleep(BASE * 10).await;
        assert_eq!(transport.open_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unsolicited_close_reconnects_and_success_resets_attempts() {
        let (transport, _tokens, connection) = fixture(3);
        connection.connect(None, None).unwrap();
        transport.latest_session().unwrap().accept();

        transport.latest_session().unwrap().drop_connection();
        assert_eq!(connection.state(), TransportState::Disconnected);
        assert_eq!(connection.reconnect_attempts(), 1);

        tokio::time::sleep(BASE + Duration::from_millis(1)).await;
        assert!(connection.is_connecting());
        transport.latest_session().unwrap().accept();

        assert!(connection.is_connected());
        assert_eq!(connection.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_reuses_stored_callbacks() {
        let (transport, _tokens, connection) = fixture(3);
        let (connects, on_connect) = counter();
        connection.connect(Some(on_connect), None).unwrap();
        transport.latest_session().unwrap().fail("refused");

        tokio::time::sleep(BASE + Duration::from_millis(1)).await;
        transport.latest_session().unwrap().accept();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let (transport, _tokens, connection) = fixture(3);
        connection.connect(None, None).unwrap();
        transport.latest_session().unwrap().fail("refused");
        assert!(connection.has_pending_reconnect());

        connection.disconnect();
        tokio::time::sleep(BASE * 10).await;

        assert!(!connection.has_pending_reconnect());
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_closes_gracefully_and_ignores_late_events() {
        let (transport, _tokens, connection) = fixture(3);
        connection.connect(None, None).unwrap();
        let session = transport.latest_session().unwrap();
        session.accept();

        connection.disconnect();
        session.drop_connection();

        assert_eq!(connection.state(), TransportState::Disconnected);
        assert!(transport.calls().contains(&TransportCall::Disconnect));
        assert!(!connection.has_pending_reconnect());
    }

    #[tokio::test]
    async fn disconnect_while_connecting_skips_graceful_close() {
        let (transport, _tokens, connection) = fixture(3);
        connection.connect(None, None).unwrap();

        connection.disconnect();
        transport.latest_session().unwrap().accept();

        assert_eq!(connection.state(), TransportState::Disconnected);
        assert!(!transport.calls().contains(&TransportCall::Disconnect));
    }

    #[tokio::test]
    async fn disconnect_clears_stored_callbacks() {
        let (transport, _tokens, connection) = fixture(3);
        let (connects, on_connect) = counter();
        connection.connect(Some(on_connect), None).unwrap();
        connection.disconnect();

        connection.connect(None, None).unwrap();
        transport.latest_session().unwrap().accept();

        assert_eq!(connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_requires_connected_session() {
        let (transport, _tokens, connection) = fixture(3);
        assert_eq!(
            connection.send("/app/chat/1", "{}"),
            Err(RealtimeError::SendRejected)
        );

        connection.connect(None, None).unwrap();
        transport.latest_session().unwrap().accept();
        connection.send("/app/chat/1", "{}").unwrap();

        assert!(transport.calls().contains(&TransportCall::Send {
            destination: "/app/chat/1".to_string(),
            body: "{}".to_string(),
        }));
    }

    #[tokio::test]
    async fn state_changes_are_broadcast() {
        let (transport, _tokens, connection) = fixture(3);
        let mut states = connection.state_changes();

        connection.connect(None, None).unwrap();
        assert_eq!(*states.borrow_and_update(), TransportState::Connecting);

        transport.latest_session().unwrap().accept();
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), TransportState::Connected);
    }

    struct Recorder(Mutex<Vec<TransportState>>);

    impl ConnectionObserver for Recorder {
        fn on_transport_state(&self, state: TransportState) {
            self.0.lock().unwrap().push(state);
        }
    }

    #[tokio::test]
    async fn observers_see_every_transition_until_removed() {
        let (transport, _tokens, connection) = fixture(3);
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let weak: Weak<Recorder> = Arc::downgrade(&recorder);
        let id = connection.add_observer(weak);

        connection.connect(None, None).unwrap();
        transport.latest_session().unwrap().accept();
        connection.remove_observer(id);
        connection.disconnect();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![TransportState::Connecting, TransportState::Connected]
        );
    }
}
