//! Transition graphs for status enums.

/// A status enum with a fixed graph of allowed moves.
///
/// Implementors list the outgoing edges; `transition_to` checks a move
/// against them.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    fn valid_transitions(&self) -> Vec<Self>;

    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn transition_to(&self, target: Self) -> Result<Self, InvalidTransition<Self>> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(InvalidTransition { from: *self, to: target })
        }
    }

    /// No outgoing edges.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

/// A refused move, carrying both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition<S> {
    pub from: S,
    pub to: S,
}
