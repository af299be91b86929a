use nalgebra::DMatrix;

use crate::nlp::interior_point;

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Status {
    /// The optimality conditions hold within the configured tolerance.
    Converged,

    /// The iteration limit was reached first.
    IterationLimitReached,

    /// An observer asked the engine to stop.
    StoppedByObserver,

    /// The engine could not make progress.
    Failed,
}

impl Status {
    #[must_use]
    pub fn is_converged(self) -> bool {
        self == Self::Converged
    }
}

impl From<interior_point::Status> for Status {
    fn from(status: interior_point::Status) -> Self {
        match status {
            interior_point::Status::Converged => Self::Converged,
            interior_point::Status::MaxIters => Self::IterationLimitReached,
            interior_point::Status::StoppedByObserver => Self::StoppedByObserver,
            interior_point::Status::Failed => Self::Failed,
        }
    }
}

/// Trajectories of one phase at its collocation nodes.
///
/// Columns follow the node order of the mesh. Each mesh segment owns its
/// nodes, so the time at a knot between segments appears twice.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PhaseSolution {
    pub time: Vec<f64>,

    /// One row per state.
    pub states: DMatrix<f64>,

    /// One row per control.
    pub controls: DMatrix<f64>,

    pub parameters: Vec<f64>,

    /// Costate estimates, one row per state.
    ///
    /// Each column comes from the defect multipliers at its node; event and
    /// continuity multipliers are not folded in. Both copies of a segment
    /// knot hold the quadrature-weighted average of their two estimates, and
    /// the estimates at the phase ends are the least accurate.
    pub costates: DMatrix<f64>,

    pub hamiltonian: Vec<f64>,
}

impl PhaseSolution {
    #[must_use]
    pub fn t0(&self) -> f64 {
        self.time[0]
    }

    #[must_use]
    pub fn tf(&self) -> f64 {
        self.time[self.time.len() - 1]
    }
}

/// The result of a solve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Solution {
    pub status: Status,

    /// Total cost over all phases.
    pub objective: f64,

    pub iterations: usize,

    /// One entry per phase, in phase order.
    pub phases: Vec<PhaseSolution>,

    /// The raw NLP decision vector.
    pub decision: Vec<f64>,

    /// The raw NLP constraint multipliers.
    pub multipliers: Vec<f64>,
}
