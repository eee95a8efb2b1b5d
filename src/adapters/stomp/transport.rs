//! STOMP-over-WebSocket implementation of the `SessionTransport` port.
//!
//! Each opened session runs one background task that owns the socket:
//!
//! 1. WebSocket handshake (bounded by the connect timeout)
//! 2. `CONNECT` with bearer credential and heart-beat offer, wait for
//!    `CONNECTED`
//! 3. Select loop over outbound commands, inbound frames, heart-beat ticks
//!
//! `MESSAGE` frames are routed to the callback registered for their
//! `subscription` header. The session handle only enqueues commands, so
//! none of its methods block.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::domain::foundation::RealtimeError;
use crate::ports::{
    ConnectRequest, FrameCallback, Heartbeat, SessionListener, SessionTransport,
    TransportSession, TransportSubscriptionId,
};

use super::frame::{is_heartbeat, Command, StompFrame};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Routes = Arc<Mutex<HashMap<String, FrameCallback>>>;

/// Opens STOMP sessions over WebSocket.
#[derive(Debug, Clone)]
pub struct StompWebSocketTransport {
    connect_timeout: Duration,
}

impl Default for StompWebSocketTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl StompWebSocketTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl SessionTransport for StompWebSocketTransport {
    fn open(
        &self,
        request: ConnectRequest,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Arc<dyn TransportSession>, RealtimeError> {
        let runtime = Handle::try_current()
            .map_err(|_| RealtimeError::transport("no async runtime to drive the session"))?;
        let upgrade = upgrade_request(&request)?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let session = Arc::new(StompSession {
            commands: commands_tx,
            routes: routes.clone(),
            next_subscription: AtomicU64::new(0),
        });

        let driver = SessionDriver {
            connect_timeout: self.connect_timeout,
            heartbeat: request.heartbeat,
            listener,
            routes,
            commands: commands_rx,
        };
        runtime.spawn(driver.run(upgrade, request));
        Ok(session)
    }
}

/// WebSocket upgrade request carrying the bearer credential.
fn upgrade_request(request: &ConnectRequest) -> Result<Request<()>, RealtimeError> {
    let mut upgrade = request
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| RealtimeError::transport(format!("invalid endpoint URL: {}", e)))?;
    let value = HeaderValue::from_str(&format!(
        "Bearer {}",
        request.credential.expose_secret()
    ))
    .map_err(|e| RealtimeError::transport(format!("invalid credential header: {}", e)))?;
    upgrade.headers_mut().insert(AUTHORIZATION, value);
    Ok(upgrade)
}

/// `CONNECT` frame for the given request.
fn connect_frame(request: &ConnectRequest, host: &str) -> StompFrame {
    StompFrame::new(Command::Connect)
        .header("accept-version", "1.2,1.1")
        .header("host", host)
        .header(
            "heart-beat",
            format!(
                "{},{}",
                request.heartbeat.outgoing.as_millis(),
                request.heartbeat.incoming.as_millis()
            ),
        )
        .header(
            "Authorization",
            format!("Bearer {}", request.credential.expose_secret()),
        )
}

/// Applies the server's `heart-beat` header to the client offer.
///
/// Each direction is disabled when either side offers zero, otherwise the
/// larger of the two intervals applies.
pub(crate) fn negotiate_heartbeat(offer: Heartbeat, server: Option<&str>) -> Heartbeat {
    let (server_out, server_in) = server
        .and_then(|value| value.split_once(','))
        .and_then(|(sx, sy)| Some((sx.trim().parse::<u64>().ok()?, sy.trim().parse::<u64>().ok()?)))
        .unwrap_or((0, 0));

    let pick = |mine: Duration, theirs: u64| {
        if mine.is_zero() || theirs == 0 {
            Duration::ZERO
        } else {
            mine.max(Duration::from_millis(theirs))
        }
    };
    Heartbeat {
        outgoing: pick(offer.outgoing, server_in),
        incoming: pick(offer.incoming, server_out),
    }
}

enum SessionCommand {
    Frame(StompFrame),
    Close,
}

/// Handle to one STOMP session.
pub struct StompSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
    routes: Routes,
    next_subscription: AtomicU64,
}

impl StompSession {
    fn enqueue(&self, command: SessionCommand) -> Result<(), RealtimeError> {
        self.commands
            .send(command)
            .map_err(|_| RealtimeError::transport("session closed"))
    }

    fn routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, FrameCallback>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransportSession for StompSession {
    fn subscribe(
        &self,
        destination: &str,
        on_frame: FrameCallback,
    ) -> Result<TransportSubscriptionId, RealtimeError> {
        let n = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let id = format!("sub-{}", n);
        self.routes().insert(id.clone(), on_frame);

        let frame = StompFrame::new(Command::Subscribe)
            .header("id", id.as_str())
            .header("destination", destination)
            .header("ack", "auto");
        if let Err(e) = self.enqueue(SessionCommand::Frame(frame)) {
            self.routes().remove(&id);
            return Err(e);
        }
        Ok(TransportSubscriptionId::new(id))
    }

    fn unsubscribe(&self, id: &TransportSubscriptionId) -> Result<(), RealtimeError> {
        if self.routes().remove(id.as_str()).is_none() {
            return Ok(());
        }
        let frame = StompFrame::new(Command::Unsubscribe).header("id", id.as_str());
        self.enqueue(SessionCommand::Frame(frame))
    }

    fn send(&self, destination: &str, body: &str) -> Result<(), RealtimeError> {
        let frame = StompFrame::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .with_body(body);
        self.enqueue(SessionCommand::Frame(frame))
    }

    fn disconnect(&self) -> Result<(), RealtimeError> {
        self.routes().clear();
        self.enqueue(SessionCommand::Close)
    }
}

/// Background task state for one session.
struct SessionDriver {
    connect_timeout: Duration,
    heartbeat: Heartbeat,
    listener: Arc<dyn SessionListener>,
    routes: Routes,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
}

/// How the select loop ended.
enum Exit {
    /// Client asked to close; no lifecycle report.
    Requested,
    Closed,
    Failed(RealtimeError),
}

impl SessionDriver {
    async fn run(mut self, upgrade: Request<()>, request: ConnectRequest) {
        let host = upgrade.uri().host().unwrap_or("localhost").to_string();

        let mut socket = match tokio::time::timeout(self.connect_timeout, connect_async(upgrade)).await {
            Ok(Ok((socket, _response))) => socket,
            Ok(Err(e)) => {
                self.listener
                    .on_error(RealtimeError::transport(format!("WebSocket connect failed: {}", e)));
                return;
            }
            Err(_) => {
                self.listener.on_error(RealtimeError::transport(format!(
                    "Connection timeout ({:?})",
                    self.connect_timeout
                )));
                return;
            }
        };

        let connect = connect_frame(&request, &host).encode();
        if let Err(e) = socket.send(Message::Text(connect)).await {
            self.listener
                .on_error(RealtimeError::transport(format!("CONNECT send failed: {}", e)));
            return;
        }

        let negotiated = match self.await_connected(&mut socket).await {
            Ok(Some(negotiated)) => negotiated,
            Ok(None) => {
                let _ = socket.close(None).await;
                return;
            }
            Err(e) => {
                self.listener.on_error(e);
                let _ = socket.close(None).await;
                return;
            }
        };

        tracing::debug!(
            outgoing = ?negotiated.outgoing,
            incoming = ?negotiated.incoming,
            "STOMP session established"
        );
        self.listener.on_connected();

        match self.pump(&mut socket, negotiated).await {
            Exit::Requested => {
                let disconnect = StompFrame::new(Command::Disconnect).encode();
                let _ = socket.send(Message::Text(disconnect)).await;
                let _ = socket.close(None).await;
            }
            Exit::Closed => self.listener.on_closed(),
            Exit::Failed(e) => {
                let _ = socket.close(None).await;
                self.listener.on_error(e);
            }
        }
    }

    /// Waits for `CONNECTED`. `Ok(None)` means the handle was dropped.
    async fn await_connected(
        &mut self,
        socket: &mut Socket,
    ) -> Result<Option<Heartbeat>, RealtimeError> {
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            let message = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(RealtimeError::transport("timed out waiting for CONNECTED"));
                }
                command = self.commands.recv() => match command {
                    // Frames issued before the handshake completes are dropped
                    // with the session; only a close ends the wait early.
                    Some(SessionCommand::Frame(_)) => continue,
                    Some(SessionCommand::Close) | None => return Ok(None),
                },
                message = socket.next() => message,
            };

            let text = match message {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Binary(data))) => String::from_utf8(data)
                    .map_err(|_| RealtimeError::parse("non UTF-8 binary frame"))?,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(RealtimeError::transport("closed during STOMP handshake"));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(RealtimeError::transport(e)),
            };

            for frame in StompFrame::decode_all(&text)? {
                match frame.command {
                    Command::Connected => {
                        return Ok(Some(negotiate_heartbeat(self.heartbeat, frame.get("heart-beat"))));
                    }
                    Command::Error => return Err(error_from_frame(&frame)),
                    other => tracing::debug!(command = %other, "Ignoring frame before CONNECTED"),
                }
            }
        }
    }

    async fn pump(&mut self, socket: &mut Socket, negotiated: Heartbeat) -> Exit {
        let sends_heartbeats = !negotiated.outgoing.is_zero();
        let expects_heartbeats = !negotiated.incoming.is_zero();
        let mut outgoing = tokio::time::interval(negotiated.outgoing.max(Duration::from_millis(1)));
        let mut watchdog = tokio::time::interval(negotiated.incoming.max(Duration::from_millis(1)));
        let mut last_inbound = Instant::now();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Frame(frame)) => {
                        if let Err(e) = socket.send(Message::Text(frame.encode())).await {
                            return Exit::Failed(RealtimeError::transport(e));
                        }
                    }
                    Some(SessionCommand::Close) | None => return Exit::Requested,
                },

                _ = outgoing.tick(), if sends_heartbeats => {
                    if let Err(e) = socket.send(Message::Text("\n".to_string())).await {
                        return Exit::Failed(RealtimeError::transport(e));
                    }
                }

                _ = watchdog.tick(), if expects_heartbeats => {
                    if last_inbound.elapsed() > negotiated.incoming * 2 {
                        return Exit::Failed(RealtimeError::transport("heart-beat timeout"));
                    }
                }

                message = socket.next() => {
                    last_inbound = Instant::now();
                    let text = match message {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                            Ok(text) => text,
                            Err(_) => {
                                tracing::warn!("Dropping non UTF-8 binary frame");
                                continue;
                            }
                        },
                        Some(Ok(Message::Close(_))) | None => return Exit::Closed,
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Exit::Failed(RealtimeError::transport(e)),
                    };
                    if is_heartbeat(&text) {
                        continue;
                    }
                    if let Some(exit) = self.dispatch(&text) {
                        return exit;
                    }
                }
            }
        }
    }

    fn dispatch(&self, text: &str) -> Option<Exit> {
        let frames = match StompFrame::decode_all(text) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!("Dropping undecodable STOMP payload: {}", e);
                return None;
            }
        };

        for frame in frames {
            match frame.command {
                Command::Message => {
                    let Some(subscription) = frame.get("subscription") else {
                        tracing::warn!("MESSAGE frame without subscription header");
                        continue;
                    };
                    let callback = self
                        .routes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .get(subscription)
                        .cloned();
                    match callback {
                        Some(callback) => callback(&frame.body),
                        None => tracing::debug!(subscription, "MESSAGE for unknown subscription"),
                    }
                }
                Command::Error => return Some(Exit::Failed(error_from_frame(&frame))),
                other => tracing::debug!(command = %other, "Ignoring server frame"),
            }
        }
        None
    }
}

fn error_from_frame(frame: &StompFrame) -> RealtimeError {
    let message = frame
        .get("message")
        .map(str::to_string)
        .unwrap_or_else(|| frame.body.clone());
    RealtimeError::transport(format!("STOMP ERROR: {}", message))
}
