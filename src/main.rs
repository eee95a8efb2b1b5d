//! chat-realtime: terminal chat client
//!
//! Joins one room or private chat, prints inbound messages and sends every
//! stdin line, falling back to the REST API while the realtime connection
//! is down.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use chat_realtime::adapters::{
    RestFallbackConfig, RestMessageFallback, StaticEndpoint, StompWebSocketTransport, TokenStore,
};
use chat_realtime::application::{deliver, ChannelAdapter, ChatClient, Delivery, MessageHandler};
use chat_realtime::config::AppConfig;
use chat_realtime::domain::foundation::{ChatId, RealtimeError, RoomId};
use chat_realtime::domain::messaging::{ChatMessage, OutboundMessage};
use chat_realtime::domain::realtime::ChannelKind;
use chat_realtime::ports::MessageFallback;

#[derive(Parser)]
#[command(name = "chat-realtime")]
#[command(about = "Realtime chat client over STOMP/WebSocket")]
struct Cli {
    /// Bearer token obtained at login (overrides configuration)
    #[arg(long, env = "CHAT_REALTIME_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Realtime endpoint URL (overrides configuration)
    #[arg(long)]
    endpoint: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    channel: Channel,
}

#[derive(Subcommand)]
enum Channel {
    /// Join a room's broadcast chat
    Room { id: String },
    /// Join a private 1:1 chat
    Private { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.realtime.endpoint_url = endpoint;
    }
    config.validate()?;

    init_tracing(&config.log_level, cli.json_logs)?;

    let tokens = Arc::new(TokenStore::new());
    match cli.token {
        Some(token) => tokens.set_token(token),
        None => tokens.set_token(config.require_token()?),
    }

    let transport = Arc::new(StompWebSocketTransport::new(Duration::from_secs(
        config.realtime.connect_timeout_secs,
    )));
    let client = ChatClient::from_config(
        &config.realtime,
        transport,
        tokens.clone(),
        Arc::new(StaticEndpoint::new(&config.realtime.endpoint_url)),
    );
    let fallback = RestMessageFallback::new(
        RestFallbackConfig::new(&config.api.base_url)
            .with_timeout(Duration::from_secs(config.api.request_timeout_secs)),
        tokens,
    )?;

    start_realtime(&client)?;

    let result = match cli.channel {
        Channel::Room { id } => {
            let channel = client.room_channel();
            run(&channel, &fallback, RoomId::new(id)).await
        }
        Channel::Private { id } => {
            let channel = client.private_channel();
            run(&channel, &fallback, ChatId::new(id)).await
        }
    };

    client.disconnect();
    result
}

/// Opens the realtime connection. Only a missing credential is fatal;
/// other failures retry in the background while sends use the REST API.
fn start_realtime(client: &ChatClient) -> Result<(), RealtimeError> {
    let outcome = client.connect(
        Some(Arc::new(|| tracing::info!("Connected"))),
        Some(Arc::new(|e: &RealtimeError| tracing::warn!("Connection error: {}", e))),
    );
    match outcome {
        Ok(_) => Ok(()),
        Err(RealtimeError::MissingCredential) => Err(RealtimeError::MissingCredential),
        Err(e) => {
            tracing::warn!("Realtime unavailable, continuing offline: {}", e);
            Ok(())
        }
    }
}

fn init_tracing(filter: &str, json: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

async fn run<K: ChannelKind>(
    channel: &Arc<ChannelAdapter<K>>,
    fallback: &dyn MessageFallback,
    entity: K::Id,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let print: MessageHandler = Arc::new(|message: ChatMessage| print_message(&message));
    channel.set_handler(print);
    channel.select(Some(entity.clone()))?;
    tracing::info!(channel = K::LABEL, entity = %entity, "Joined");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let content = line.trim();
                if content.is_empty() {
                    continue;
                }
                match deliver(channel, fallback, &entity, &OutboundMessage::text(content)).await {
                    Ok(Delivery::Realtime) => {}
                    Ok(Delivery::Fallback(created)) => print_message(&created),
                    Err(e) => tracing::error!("Message not delivered: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    channel.teardown();
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let time = message.timestamp().as_datetime().format("%H:%M:%S");
    match message.media() {
        Some(media) => println!(
            "[{}] {}: {} <{} {}>",
            time,
            message.sender(),
            message.content(),
            message.message_type(),
            media.url
        ),
        None => println!("[{}] {}: {}", time, message.sender(), message.content()),
    }
}
