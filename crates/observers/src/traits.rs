//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, enabling
//! observers to work generically across different solvers.
//!
//! # Event traits
//!
//! - [`HasObjective`] — events that carry an objective value
//! - [`HasInfeasibility`] — events that report constraint and optimality
//!   violations
//!
//! # Action traits
//!
//! - [`CanStopEarly`] — actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use vela_core::Observer;
//! use vela_observers::traits::{CanStopEarly, HasObjective};
//!
//! struct Budget {
//!     target: f64,
//! }
//!
//! impl<E: HasObjective, A: CanStopEarly> Observer<E, A> for Budget {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.objective() <= self.target).then(A::stop_early)
//!     }
//! }
//! ```

use vela_solvers::nlp::interior_point;

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    fn objective(&self) -> f64;
}

/// An event that reports how far the iterate is from optimality.
pub trait HasInfeasibility {
    /// Largest constraint violation.
    fn primal_infeasibility(&self) -> f64;

    /// Largest violation of the stationarity conditions.
    fn dual_infeasibility(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

impl HasObjective for interior_point::Event<'_> {
    fn objective(&self) -> f64 {
        self.objective
    }
}

impl HasInfeasibility for interior_point::Event<'_> {
    fn primal_infeasibility(&self) -> f64 {
        self.primal_infeasibility
    }

    fn dual_infeasibility(&self) -> f64 {
        self.dual_infeasibility
    }
}

impl CanStopEarly for interior_point::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}
