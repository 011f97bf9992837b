use thiserror::Error;

use super::session::{SessionState, TransitionError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("invalid answer: option {option_id:?} for item {item_id:?}")]
    InvalidAnswer { item_id: String, option_id: String },

    #[error("incomplete responses: {answered} of {total} items answered")]
    IncompleteResponses { answered: usize, total: usize },

    #[error("invalid item bank: {0}")]
    InvalidItemBank(String),

    #[error("{operation} is not allowed while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("a classification session is already active")]
    SessionActive,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

pub type EngineResult<T> = Result<T, ClassificationError>;
