//! Error types for the realtime core.

use std::fmt;
use thiserror::Error;

/// Error categories surfaced by the realtime core.
///
/// Every [`RealtimeError`] maps to exactly one kind, which decides how the
/// error travels: precondition and send failures are returned to the caller,
/// transport and parse failures are absorbed where they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation attempted without its precondition (credential, connection).
    PreconditionFailed,

    /// Socket or protocol failure; non-fatal, drives reconnect.
    TransportError,

    /// Malformed inbound frame or unencodable outbound payload.
    ParseError,

    /// Send attempted while the transport is not connected.
    SendRejected,

    /// Non-realtime delivery path failed.
    FallbackFailed,

    /// Internal state machine guard tripped.
    InvalidState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorKind::TransportError => "TRANSPORT_ERROR",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::SendRejected => "SEND_REJECTED",
            ErrorKind::FallbackFailed => "FALLBACK_FAILED",
            ErrorKind::InvalidState => "INVALID_STATE",
        };
        write!(f, "{}", s)
    }
}

/// Errors produced by the connection, registry and channel adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    #[error("No authentication credential available")]
    MissingCredential,

    #[error("Realtime transport is not connected")]
    NotConnected,

    #[error("Channel adapter has been torn down")]
    TornDown,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed frame: {0}")]
    Parse(String),

    #[error("Failed to encode payload: {0}")]
    Encode(String),

    #[error("Send rejected: realtime transport is not connected")]
    SendRejected,

    #[error("Fallback delivery failed: {0}")]
    Fallback(String),

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl RealtimeError {
    /// Creates a transport error from any displayable cause.
    pub fn transport(cause: impl fmt::Display) -> Self {
        RealtimeError::Transport(cause.to_string())
    }

    /// Creates a parse error from any displayable cause.
    pub fn parse(cause: impl fmt::Display) -> Self {
        RealtimeError::Parse(cause.to_string())
    }

    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RealtimeError::MissingCredential
            | RealtimeError::NotConnected
            | RealtimeError::TornDown => ErrorKind::PreconditionFailed,
            RealtimeError::Transport(_) => ErrorKind::TransportError,
            RealtimeError::Parse(_) | RealtimeError::Encode(_) => ErrorKind::ParseError,
            RealtimeError::SendRejected => ErrorKind::SendRejected,
            RealtimeError::Fallback(_) => ErrorKind::FallbackFailed,
            RealtimeError::InvalidTransition { .. } => ErrorKind::InvalidState,
        }
    }

    /// True when the caller is expected to take the non-realtime path.
    pub fn should_fall_back(&self) -> bool {
        matches!(
            self,
            RealtimeError::SendRejected | RealtimeError::NotConnected
        )
    }
}
