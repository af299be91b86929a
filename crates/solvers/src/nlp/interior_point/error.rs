use std::error::Error as StdError;

/// Errors that abort an interior-point solve.
///
/// Failing to converge is not an error; it is reported through
/// [`Status`](super::Status) on the returned solution.
#[derive(Debug, thiserror::Error)]
pub enum Error<E: StdError + 'static> {
    #[error("invalid problem: {reason}")]
    InvalidProblem { reason: String },

    #[error("problem evaluation failed")]
    Problem(#[source] E),

    #[error("non-finite {quantity} at iteration {iter}")]
    NonFinite { quantity: &'static str, iter: usize },

    #[error("KKT system could not be regularized at iteration {iter}")]
    Singular { iter: usize },
}

impl<E: StdError + 'static> Error<E> {
    pub(super) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidProblem {
            reason: reason.into(),
        }
    }
}
