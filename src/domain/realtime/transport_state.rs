//! Lifecycle of the shared realtime transport.

use std::fmt;

use crate::domain::foundation::StateMachine;

/// State of the single process-wide transport connection.
///
/// ```text
/// Disconnected --connect()--> Connecting --success--> Connected
///       ^                         |                       |
///       +-------failure-----------+                       |
///       +-------------close / disconnect()----------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl TransportState {
    pub fn is_connected(&self) -> bool {
        matches!(self, TransportState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, TransportState::Connecting)
    }
}

impl StateMachine for TransportState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TransportState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransportState::*;
        match self {
            Disconnected => vec![Connecting],
            Connecting => vec![Connected, Disconnected],
            Connected => vec![Disconnected],
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportState::Disconnected => "disconnected",
            TransportState::Connecting => "connecting",
            TransportState::Connected => "connected",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disconnected() {
        assert_eq!(TransportState::default(), TransportState::Disconnected);
    }

    #[test]
    fn cannot_skip_connecting() {
        assert!(TransportState::Disconnected
            .transition_to(TransportState::Connected)
            .is_err());
    }

    #[test]
    fn connected_only_falls_back_to_disconnected() {
        assert_eq!(
            TransportState::Connected.valid_transitions(),
            vec![TransportState::Disconnected]
        );
    }

    #[test]
    fn no_state_is_terminal() {
        for state in [
            TransportState::Disconnected,
            TransportState::Connecting,
            TransportState::Connected,
        ] {
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn predicates_match_variants() {
        assert!(TransportState::Connected.is_connected());
        assert!(TransportState::Connecting.is_connecting());
        assert!(!TransportState::Disconnected.is_connected());
    }
}
