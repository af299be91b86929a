use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::{Error, Status};

/// Where an orchestrator is in its lifecycle.
///
/// ```text
/// Unconfigured → Configured → Solving → Converged
///                                     → IterationLimitReached
///                                     → StoppedByObserver
///                                     → Failed
/// ```
///
/// Configuring is allowed from any state except `Solving` and always leads
/// back to `Configured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Configured,
    Solving,
    Converged,
    IterationLimitReached,
    StoppedByObserver,
    Failed,
}

impl State {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Solving => "solving",
            Self::Converged => "converged",
            Self::IterationLimitReached => "iteration-limit-reached",
            Self::StoppedByObserver => "stopped-by-observer",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Status> for State {
    fn from(status: Status) -> Self {
        match status {
            Status::Converged => Self::Converged,
            Status::IterationLimitReached => Self::IterationLimitReached,
            Status::StoppedByObserver => Self::StoppedByObserver,
            Status::Failed => Self::Failed,
        }
    }
}

pub(super) fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds an orchestrator in `Solving` for the duration of one solve.
///
/// Dropping the guard moves the orchestrator to the outcome recorded with
/// [`Solving::finish`], or to `Failed` if the solve returned early.
pub(super) struct Solving<'a> {
    state: &'a Mutex<State>,
    outcome: State,
}

impl<'a> Solving<'a> {
    pub(super) fn enter(state: &'a Mutex<State>) -> Result<Self, Error> {
        let mut current = lock(state);
        match *current {
            State::Configured => {
                *current = State::Solving;
                Ok(Self {
                    state,
                    outcome: State::Failed,
                })
            }
            State::Solving => Err(Error::AlreadySolving),
            other => Err(Error::InvalidState {
                state: other.as_str(),
            }),
        }
    }

    pub(super) fn finish(mut self, outcome: State) {
        self.outcome = outcome;
    }
}

impl Drop for Solving<'_> {
    fn drop(&mut self) {
        *lock(self.state) = self.outcome;
    }
}
