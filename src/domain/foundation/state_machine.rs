//! State machine trait for lifecycle enums.
//!
//! Both the transport lifecycle and the channel adapter lifecycle are small
//! state machines. This trait gives them one way to declare their legal
//! edges and to guard transitions against them.

use super::RealtimeError;

/// Trait for status enums that represent state machines.
///
/// Implementors declare valid edges; validated transitions and terminal
/// detection come for free.
///
/// # Example
///
/// ```ignore
/// let next = TransportState::Connecting.transition_to(TransportState::Connected)?;
/// assert!(next.is_connected());
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, RealtimeError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(RealtimeError::InvalidTransition {
                from: format!("{:?}", self),
                to: format!("{:?}", target),
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Door {
        Closed,
        Open,
        Welded,
    }

    impl StateMachine for Door {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Door::*;
            matches!((self, target), (Closed, Open) | (Open, Closed) | (Closed, Welded))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Door::*;
            match self {
                Closed => vec![Open, Welded],
                Open => vec![Closed],
                Welded => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_edge() {
        assert_eq!(Door::Closed.transition_to(Door::Open), Ok(Door::Open));
    }

    #[test]
    fn transition_to_reports_both_states() {
        let err = Door::Open.transition_to(Door::Welded).unwrap_err();
        assert_eq!(
            err,
            RealtimeError::InvalidTransition {
                from: "Open".to_string(),
                to: "Welded".to_string(),
            }
        );
    }

    #[test]
    fn terminal_state_has_no_edges() {
        assert!(Door::Welded.is_terminal());
        assert!(!Door::Closed.is_terminal());
    }
}
