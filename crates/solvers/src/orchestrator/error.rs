use thiserror::Error;

use crate::{
    nlp::interior_point,
    transcription::{InterpError, TranscriptionError},
};

use super::ConfigError;

/// Errors that abort a solve without producing a solution.
///
/// Failing to converge is not an error; it is reported through the
/// solution's [`Status`](super::Status).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration")]
    InvalidConfig(#[from] ConfigError),

    /// A callback returned the wrong number of values.
    ///
    /// `phase` is `None` for the linkage callback.
    #[error("`{callback}` returned {actual} values, expected {expected}")]
    CallbackContractViolation {
        callback: &'static str,
        phase: Option<usize>,
        expected: usize,
        actual: usize,
    },

    /// A callback reported an error.
    #[error("callback failed")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A phase guess could not be interpolated onto its collocation nodes.
    #[error("initial guess could not be interpolated")]
    InvalidGuess(#[from] InterpError),

    #[error("a solve is already running on this orchestrator")]
    AlreadySolving,

    #[error("cannot solve from the {state} state")]
    InvalidState { state: &'static str },

    /// The engine could not continue; the text describes why.
    #[error("solver engine failed: {0}")]
    EngineInternal(String),
}

impl<E> From<TranscriptionError<E>> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: TranscriptionError<E>) -> Self {
        match err {
            TranscriptionError::Contract {
                callback,
                phase,
                expected,
                actual,
            } => Self::CallbackContractViolation {
                callback,
                phase,
                expected,
                actual,
            },
            TranscriptionError::Callback(source) => Self::Callback(Box::new(source)),
        }
    }
}

impl<E> From<interior_point::Error<TranscriptionError<E>>> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: interior_point::Error<TranscriptionError<E>>) -> Self {
        match err {
            interior_point::Error::Problem(source) => source.into(),
            other => Self::EngineInternal(other.to_string()),
        }
    }
}
