//! Lifecycle of a channel adapter binding.

use crate::domain::foundation::StateMachine;

/// State of one room or private-chat adapter.
///
/// `TornDown` is terminal: once the adapter is dropped or explicitly torn
/// down, nothing re-binds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelState {
    /// No entity selected.
    #[default]
    Idle,
    /// Entity selected, transport not connected (or subscribe failed).
    AwaitingConnection,
    /// Entity selected and its topic subscription is live.
    Subscribed,
    TornDown,
}

impl StateMachine for ChannelState {
    fn can_transition_to(&self, _target: &Self) -> bool {
        // Re-selecting rebinds, so every live state may reach every state.
        !matches!(self, ChannelState::TornDown)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ChannelState::*;
        match self {
            TornDown => vec![],
            _ => vec![Idle, AwaitingConnection, Subscribed, TornDown],
        }
    }
}
