use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::model::ItemError;
use crate::scheduler::SchedulerError;

/// Engine operation that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    SubmitAnswer,
    SubmitRating,
    ClockExpire,
    Advance,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Start => "start session",
            Operation::SubmitAnswer => "submit answer",
            Operation::SubmitRating => "submit rating",
            Operation::ClockExpire => "expire clock",
            Operation::Advance => "advance",
        };
        f.write_str(name)
    }
}

/// Why an operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyStarted,
    NotActive,
    WrongMode,
    NotCurrentItem,
    UnknownOption,
    AlreadyAnswered,
    NotAnswered,
    AlreadyRated,
    NotResolved,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::AlreadyStarted => "session was already started",
            Rejection::NotActive => "session is not active",
            Rejection::WrongMode => "not available in this session mode",
            Rejection::NotCurrentItem => "item is not the current item",
            Rejection::UnknownOption => "option is not one of the item's options",
            Rejection::AlreadyAnswered => "item already has an answer",
            Rejection::NotAnswered => "item has not been answered yet",
            Rejection::AlreadyRated => "item already has a difficulty rating",
            Rejection::NotResolved => "current item is not resolved",
        };
        f.write_str(reason)
    }
}

/// Errors emitted by the session engine.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no items available for session")]
    Empty,

    #[error("too many items for a single session: {len}")]
    TooManyItems { len: usize },

    #[error("cannot {operation}: {reason}")]
    InvalidTransition {
        operation: Operation,
        reason: Rejection,
    },

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl SessionError {
    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            SessionError::InvalidTransition { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_operation_and_reason() {
        let err = SessionError::InvalidTransition {
            operation: Operation::SubmitAnswer,
            reason: Rejection::AlreadyAnswered,
        };
        assert_eq!(
            err.to_string(),
            "cannot submit answer: item already has an answer"
        );
        assert_eq!(err.rejection(), Some(Rejection::AlreadyAnswered));
        assert_eq!(SessionError::Empty.rejection(), None);
    }
}
