//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and the error
//! taxonomy that form the vocabulary of the realtime core.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{ErrorKind, RealtimeError};
pub use ids::{ChatId, RoomId, SubscriptionId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
