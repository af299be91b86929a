use ninterp::error::{InterpolateError, ValidateError};
use thiserror::Error;

/// Errors raised while evaluating the transcribed problem.
#[derive(Debug, Error)]
pub enum TranscriptionError<E> {
    /// A callback returned the wrong number of values.
    ///
    /// `phase` is `None` for the linkage callback, which spans all phases.
    #[error("`{callback}` returned {actual} values, expected {expected}")]
    Contract {
        callback: &'static str,
        phase: Option<usize>,
        expected: usize,
        actual: usize,
    },

    /// A callback failed.
    #[error("callback failed")]
    Callback(#[source] E),
}

/// Errors raised while interpolating a phase guess onto its nodes.
#[derive(Debug, Error)]
pub enum InterpError {
    #[error(transparent)]
    Validation(#[from] ValidateError),
    #[error(transparent)]
    Interpolation(#[from] InterpolateError),
}
