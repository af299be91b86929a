/// Event emitted once per iteration, at the iterate the solver is about to
/// step from.
///
/// Iteration zero is the starting point after it has been moved into the
/// interior of the bounds. Infeasibilities are measured on the scaled problem.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub iter: usize,

    /// Objective in the problem's own units.
    pub objective: f64,

    /// Largest constraint violation.
    pub primal_infeasibility: f64,

    /// Largest entry of the Lagrangian gradient.
    pub dual_infeasibility: f64,

    /// Current barrier parameter.
    pub mu: f64,

    /// Primal step length that produced this iterate (zero at iteration zero).
    pub alpha: f64,

    /// Hessian regularization used for that step.
    pub regularization: f64,

    /// The current primal point.
    pub x: &'a [f64],
}
