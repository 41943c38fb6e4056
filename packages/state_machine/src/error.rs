use thiserror::Error;

use crate::StateId;

/// Errors that can occur when configuring or driving a [`StateMachine`][crate::StateMachine].
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TransitionError {
    /// Every state id of the machine is already in use.
    #[error("a state machine can hold at most {max} states")]
    TooManyStates {
        /// The maximum number of states per machine.
        max: usize,
    },

    /// The state id does not belong to any state registered with this machine.
    #[error("{state} is not registered with this state machine")]
    UnknownState {
        /// The id that was not recognized.
        state: StateId,
    },

    /// The operation needs a current state but the machine has not been started yet.
    #[error("the state machine has not been started")]
    NotStarted,

    /// A gate of either the current or the target state vetoed the transition.
    #[error("transition from {from} to {to} was refused")]
    Refused {
        /// The state the machine was in, and still is in.
        from: StateId,

        /// The state the machine was asked to enter.
        to: StateId,
    },
}

/// Result of fallible state machine operations.
pub type Result<T> = std::result::Result<T, TransitionError>;
