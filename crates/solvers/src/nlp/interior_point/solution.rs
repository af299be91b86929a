/// Indicates how the solver terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Status {
    /// The scaled optimality error fell below the tolerance.
    Converged,

    /// Reached the iteration limit without converging.
    MaxIters,

    /// Stopped early due to an observer decision.
    StoppedByObserver,

    /// The line search could not find an acceptable step.
    Failed,
}

/// The result of an interior-point solve.
///
/// Multipliers follow the Lagrangian `f(x) + λᵀg(x) + νᵀx`: at a solution
/// `∇f + Jᵀλ + ν = 0`, with `ν` positive on active upper bounds and
/// negative on active lower bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Final solver status.
    pub status: Status,

    /// Final primal point.
    pub x: Vec<f64>,

    /// Objective at `x`.
    pub objective: f64,

    /// Constraint values at `x`.
    pub constraints: Vec<f64>,

    /// Constraint multipliers `λ`.
    pub multipliers: Vec<f64>,

    /// Variable bound multipliers `ν`.
    pub bound_multipliers: Vec<f64>,

    /// Iteration count when the solver finished.
    pub iters: usize,
}
