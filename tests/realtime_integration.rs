//! Integration tests for the realtime connection core.
//!
//! These tests drive the full stack (client facade, shared connection,
//! registry, channel adapters) over the in-memory transport:
//! 1. Connection lifecycle and reconnect backoff
//! 2. Subscription uniqueness and cancellation
//! 3. Channel adapter binding, switching and teardown
//! 4. Send with REST fallback

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_realtime::adapters::{InMemoryTransport, StaticEndpoint, TokenStore, TransportCall};
use chat_realtime::application::{
    deliver, ChatClient, ConnectOutcome, Delivery, MessageHandler, RoomChannel,
};
use chat_realtime::domain::foundation::{ChatId, RealtimeError, RoomId, Timestamp};
use chat_realtime::domain::messaging::{ChatMessage, OutboundMessage};
use chat_realtime::domain::realtime::{
    ChannelState, ChannelTarget, Destinations, ReconnectPolicy, TopicKey, TransportState,
};
use chat_realtime::ports::{Heartbeat, MessageFallback};

// =============================================================================
// Test Infrastructure
// =============================================================================

const BASE_DELAY: Duration = Duration::from_millis(3000);

struct Harness {
    transport: Arc<InMemoryTransport>,
    tokens: Arc<TokenStore>,
    client: ChatClient,
}

impl Harness {
    fn new(max_attempts: u32) -> Self {
        let transport = Arc::new(InMemoryTransport::new());
        let tokens = Arc::new(TokenStore::with_token("jwt"));
        let client = ChatClient::new(
            transport.clone(),
            tokens.clone(),
            Arc::new(StaticEndpoint::new("ws://localhost:8080/ws")),
            ReconnectPolicy::new(BASE_DELAY, max_attempts),
            Heartbeat::default(),
            Destinations::default(),
        );
        Self {
            transport,
            tokens,
            client,
        }
    }

    fn connected(max_attempts: u32) -> Self {
        let harness = Self::new(max_attempts);
        harness.client.connect(None, None).unwrap();
        harness.accept();
        harness
    }

    fn accept(&self) {
        self.transport.latest_session().unwrap().accept();
    }

    fn fail(&self) {
        self.transport.latest_session().unwrap().fail("connection refused");
    }

    fn subscribe_calls(&self) -> usize {
        self.transport
            .calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Subscribe { .. }))
            .count()
    }

    fn unsubscribe_calls(&self) -> usize {
        self.transport
            .calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Unsubscribe { .. }))
            .count()
    }
}

fn collector() -> (Arc<Mutex<Vec<ChatMessage>>>, MessageHandler) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    (received, Arc::new(move |m| sink.lock().unwrap().push(m)))
}

fn frame(sender: &str, content: &str) -> String {
    format!(
        r#"{{"sender":"{}","content":"{}","timestamp":"2024-05-01T10:00:00"}}"#,
        sender, content
    )
}

/// Fallback that records targets and echoes the content back.
#[derive(Default)]
struct EchoFallback {
    targets: Mutex<Vec<ChannelTarget>>,
}

#[async_trait]
impl MessageFallback for EchoFallback {
    async fn send(
        &self,
        target: &ChannelTarget,
        message: &OutboundMessage,
    ) -> Result<ChatMessage, RealtimeError> {
        self.targets.lock().unwrap().push(target.clone());
        Ok(ChatMessage::Text {
            sender: "me".to_string(),
            content: message.content.clone(),
            timestamp: Timestamp::now(),
        })
    }
}

// =============================================================================
// Connection Lifecycle
// =============================================================================

#[tokio::test]
async fn connect_without_credential_never_opens_a_session() {
    let harness = Harness::new(3);
    harness.tokens.clear();

    let result = harness.client.connect(None, None);

    assert_eq!(result, Err(RealtimeError::MissingCredential));
    assert_eq!(harness.transport.open_count(), 0);
}

#[tokio::test]
async fn connect_while_connected_reuses_session() {
    let harness = Harness::connected(3);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let outcome = harness.client.connect(
        Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    );

    assert_eq!(outcome, Ok(ConnectOutcome::AlreadyConnected));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn nth_retry_waits_n_base_delays() {
    let harness = Harness::new(3);
    harness.client.connect(None, None).unwrap();

    for attempt in 1..=3u32 {
        harness.fail();
        let expected = BASE_DELAY * attempt;

        tokio::time::sleep(expected - Duration::from_millis(1)).await;
        assert_eq!(
            harness.transport.open_count(),
            attempt as usize,
            "retry {} fired early",
            attempt
        );

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(harness.transport.open_count(), attempt as usize + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn disconnect_storm_stops_at_attempt_cap() {
    let harness = Harness::new(3);
    harness.client.connect(None, None).unwrap();

    // Initial attempt plus three retries, all failing.
    for _ in 0..4 {
        harness.fail();
        tokio::time::sleep(BASE_DELAY * 4).await;
    }

    assert_eq!(harness.transport.open_count(), 4);
    assert!(!harness.client.connection().has_pending_reconnect());
    assert_eq!(harness.client.connection().state(), TransportState::Disconnected);

    tokio::time::sleep(BASE_DELAY * 100).await;
    assert_eq!(harness.transport.open_count(), 4);

    assert_eq!(harness.client.connect(None, None), Ok(ConnectOutcome::Started));
    assert_eq!(harness.transport.open_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn explicit_connect_restores_retry_budget() {
    let harness = Harness::new(1);
    harness.client.connect(None, None).unwrap();
    harness.fail();
    tokio::time::sleep(BASE_DELAY * 2).await;
    harness.fail();
    assert!(!harness.client.connection().has_pending_reconnect());

    harness.client.connect(None, None).unwrap();
    harness.fail();

    assert!(harness.client.connection().has_pending_reconnect());
}

// =============================================================================
// Subscription Registry
// =============================================================================

#[tokio::test]
async fn resubscribing_a_key_leaves_one_live_subscription() {
    let harness = Harness::connected(3);
    let registry = harness.client.registry();
    let (first, h1) = collector();
    let (second, h2) = collector();

    let _s1 = registry.subscribe(TopicKey::new("rooms/5"), h1).unwrap();
    let _s2 = registry.subscribe(TopicKey::new("rooms/5"), h2).unwrap();
    harness.transport.deliver("/topic/rooms/5", &frame("a", "hello"));

    assert_eq!(registry.live_count(), 1);
    assert_eq!(harness.transport.active_subscriptions().len(), 1);
    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancelling_twice_unsubscribes_once() {
    let harness = Harness::connected(3);
    let (_, handler) = collector();
    let subscription = harness
        .client
        .registry()
        .subscribe(TopicKey::new("rooms/5"), handler)
        .unwrap();

    subscription.cancel();
    subscription.cancel();

    assert_eq!(harness.unsubscribe_calls(), 1);
    assert!(!subscription.is_active());
}

#[tokio::test]
async fn subscribe_while_disconnected_is_a_precondition_failure() {
    let harness = Harness::new(3);
    let (_, handler) = collector();

    let result = harness
        .client
        .registry()
        .subscribe(TopicKey::new("rooms/5"), handler);

    assert_eq!(result.unwrap_err(), RealtimeError::NotConnected);
}

// =============================================================================
// Channel Adapters
// =============================================================================

#[tokio::test]
async fn happy_path_delivers_frame_once_to_current_handler() {
    let harness = Harness::new(3);
    harness.client.connect(None, None).unwrap();
    harness.accept();

    let room = harness.client.room_channel();
    let (received, handler) = collector();
    room.set_handler(handler);
    room.select(Some(RoomId::new("room-42"))).unwrap();

    assert!(harness.client.registry().is_subscribed(&TopicKey::new("rooms/room-42")));
    harness
        .transport
        .deliver("/topic/rooms/room-42", &frame("a", "hi"));

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].sender(), "a");
    assert_eq!(received[0].content(), "hi");
}

#[tokio::test]
async fn entity_switch_cancels_old_before_subscribing_new() {
    let harness = Harness::connected(3);
    let room = harness.client.room_channel();
    room.select(Some(RoomId::new("1"))).unwrap();

    room.select(Some(RoomId::new("2"))).unwrap();

    let calls = harness.transport.calls();
    let unsubscribe_old = calls
        .iter()
        .position(|c| matches!(c, TransportCall::Unsubscribe { destination, .. } if destination == "/topic/rooms/1"))
        .unwrap();
    let subscribe_new = calls
        .iter()
        .position(|c| matches!(c, TransportCall::Subscribe { destination, .. } if destination == "/topic/rooms/2"))
        .unwrap();
    assert!(unsubscribe_old < subscribe_new);
    assert_eq!(room.state(), ChannelState::Subscribed);
}

#[tokio::test]
async fn private_chat_switch_mid_session() {
    let harness = Harness::connected(3);
    let chat = harness.client.private_channel();
    chat.select(Some(ChatId::new("7"))).unwrap();

    chat.select(Some(ChatId::new("9"))).unwrap();

    assert_eq!(
        harness.client.registry().active_topics(),
        vec![TopicKey::new("private/9")]
    );
    assert!(!harness.client.registry().is_subscribed(&TopicKey::new("private/7")));
    assert_eq!(
        harness.transport.active_subscriptions(),
        vec!["/topic/private/9".to_string()]
    );
}

#[tokio::test]
async fn teardown_leaves_no_subscription_referencing_handler() {
    let harness = Harness::connected(3);
    let (received, handler) = collector();
    let room = harness.client.room_channel();
    room.set_handler(handler);
    room.select(Some(RoomId::new("1"))).unwrap();

    drop(room);
    harness.transport.deliver("/topic/rooms/1", &frame("a", "late"));

    assert_eq!(harness.client.registry().live_count(), 0);
    assert!(harness.transport.active_subscriptions().is_empty());
    assert!(received.lock().unwrap().is_empty());
    assert_eq!(Arc::strong_count(&received), 1);
}

#[tokio::test(start_paused = true)]
async fn adapter_resubscribes_after_automatic_reconnect() {
    let harness = Harness::connected(3);
    let room = harness.client.room_channel();
    room.select(Some(RoomId::new("1"))).unwrap();

    harness.transport.latest_session().unwrap().drop_connection();
    assert_eq!(room.state(), ChannelState::AwaitingConnection);
    assert!(!room.connected());

    tokio::time::sleep(BASE_DELAY + Duration::from_millis(1)).await;
    harness.accept();

    assert_eq!(room.state(), ChannelState::Subscribed);
    assert!(room.connected());
    assert_eq!(harness.subscribe_calls(), 2);
    assert_eq!(
        harness.transport.active_subscriptions(),
        vec!["/topic/rooms/1".to_string()]
    );
}

#[tokio::test]
async fn topic_follows_the_adapter_that_selected_it_last() {
    let harness = Harness::connected(3);
    let first = harness.client.room_channel();
    let second = harness.client.room_channel();
    let (first_received, h1) = collector();
    let (second_received, h2) = collector();
    first.set_handler(h1);
    second.set_handler(h2);
    first.select(Some(RoomId::new("1"))).unwrap();
    second.select(Some(RoomId::new("1"))).unwrap();

    harness.transport.deliver("/topic/rooms/1", &frame("a", "one"));

    assert!(first_received.lock().unwrap().is_empty());
    assert_eq!(second_received.lock().unwrap().len(), 1);
    assert_eq!(first.state(), ChannelState::AwaitingConnection);
    assert_eq!(first.active_topic(), None);

    first.select(Some(RoomId::new("1"))).unwrap();
    harness.transport.deliver("/topic/rooms/1", &frame("a", "two"));

    assert_eq!(first.state(), ChannelState::Subscribed);
    let first_received = first_received.lock().unwrap();
    assert_eq!(first_received.len(), 1);
    assert_eq!(first_received[0].content(), "two");
    assert_eq!(second_received.lock().unwrap().len(), 1);
    assert_eq!(harness.client.registry().live_count(), 1);
    assert_eq!(harness.transport.active_subscriptions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn refused_subscribe_is_retried_after_reconnect() {
    let harness = Harness::connected(3);
    let room = harness.client.room_channel();
    let (received, handler) = collector();
    room.set_handler(handler);
    harness
        .transport
        .latest_session()
        .unwrap()
        .fail_next_subscribe(RealtimeError::transport("broker refused"));

    let state = room.select(Some(RoomId::new("1"))).unwrap();

    assert_eq!(state, ChannelState::AwaitingConnection);
    assert!(room.connected());
    assert!(harness.transport.active_subscriptions().is_empty());

    harness.transport.latest_session().unwrap().drop_connection();
    tokio::time::sleep(BASE_DELAY + Duration::from_millis(1)).await;
    harness.accept();
    harness.transport.deliver("/topic/rooms/1", &frame("a", "back"));

    assert_eq!(room.state(), ChannelState::Subscribed);
    assert_eq!(received.lock().unwrap().len(), 1);
}

// =============================================================================
// Send and Fallback
// =============================================================================

#[tokio::test]
async fn send_while_disconnected_is_not_accepted() {
    let harness = Harness::new(3);
    let room: Arc<RoomChannel> = harness.client.room_channel();

    let result = room.send(&RoomId::new("room-42"), &OutboundMessage::text("hi"));

    assert_eq!(result, Err(RealtimeError::SendRejected));
    assert!(result.unwrap_err().should_fall_back());
}

#[tokio::test]
async fn delivery_falls_back_to_rest_then_returns_to_realtime() {
    let harness = Harness::new(3);
    let room = harness.client.room_channel();
    let fallback = EchoFallback::default();
    let id = RoomId::new("room-42");

    let first = deliver(&room, &fallback, &id, &OutboundMessage::text("hi"))
        .await
        .unwrap();
    assert!(matches!(first, Delivery::Fallback(ref m) if m.content() == "hi"));
    assert_eq!(
        fallback.targets.lock().unwrap().as_slice(),
        &[ChannelTarget::Room(id.clone())]
    );

    harness.client.connect(None, None).unwrap();
    harness.accept();
    let second = deliver(&room, &fallback, &id, &OutboundMessage::text("again"))
        .await
        .unwrap();

    assert_eq!(second, Delivery::Realtime);
    assert_eq!(fallback.targets.lock().unwrap().len(), 1);
    assert!(harness.transport.calls().iter().any(|c| matches!(
        c,
        TransportCall::Send { destination, .. } if destination == "/app/chat/room-42"
    )));
}
