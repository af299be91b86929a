//! Primal-dual interior-point method for dense nonlinear programs.
//!
//! # Algorithm
//!
//! Inequality constraints receive slack variables and every bound is
//! replaced by a logarithmic barrier with parameter `μ`. Each iteration takes
//! one Newton step on the primal-dual optimality conditions of the barrier
//! problem:
//!
//! - Finite bounds of free variables and inequality rows are relaxed by a
//!   relative `1e-8`, so an equality that pins a variable onto its bound
//!   still leaves the barrier problem a strict interior.
//! - The KKT system is assembled densely and factored by LU. When the
//!   factorization is singular or the step shows non-positive curvature, the
//!   Hessian block is regularized and the system is factored again.
//! - The step is cut back to keep iterates strictly inside their bounds, then
//!   a backtracking filter line search on the barrier objective and the
//!   constraint violation selects the step length. The first trial may be
//!   replaced by up to four second-order corrections. Comparisons allow for
//!   roundoff, and a step at the roundoff level is taken whole.
//! - If no trial is acceptable, the full step is still taken when it reduces
//!   the barrier problem's optimality error; otherwise the solve fails.
//! - `μ` decreases superlinearly once the barrier subproblem is solved to
//!   within a multiple of `μ`.
//!
//! The solver converges when the scaled optimality error (dual
//! infeasibility, constraint violation and complementarity) falls below the
//! configured tolerance and the unscaled dual infeasibility, constraint
//! violation and complementarity are below `1`, `1e-4` and `1e-4`.
//!
//! # Derivatives
//!
//! First and second derivatives come from the problem's hooks when it
//! provides them. Missing derivatives are approximated by central finite
//! differences of the flat problem functions, which costs `O(n)` evaluations
//! for first derivatives and `O(n²)` for the Hessian.
//!
//! # Observer Events
//!
//! The solver emits one [`Event`] per iteration, starting with iteration zero
//! at the starting point. Observers can return [`Action::StopEarly`] to halt
//! and receive the current iterate with [`Status::StoppedByObserver`].

mod action;
mod config;
mod error;
mod evaluator;
mod event;
mod filter;
mod iterate;
mod kkt;
mod search;
mod solution;


pub use action::Action;
pub use config::{Config, ConfigError, Scaling};
pub use error::Error;
pub use event::Event;
pub use solution::{Solution, Status};

use vela_core::{NlpProblem, Observer};

use search::search;

/// Minimizes the problem from its initial point.
///
/// The observer receives an [`Event`] for every iteration.
/// See the [module docs](self) for details.
///
/// # Errors
///
/// Returns an error if the bounds are inconsistent, a problem evaluation
/// fails, a non-finite value appears at an accepted iterate, or the KKT
/// system cannot be regularized. Failing to converge is reported through the
/// solution's [`Status`] instead.
pub fn solve<P, Obs>(problem: &P, config: &Config, observer: Obs) -> Result<Solution, Error<P::Error>>
where
    P: NlpProblem,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    search(problem, config, observer)
}

/// Minimizes the problem without observer support.
///
/// This is a convenience wrapper around [`solve`] that uses a no-op observer.
///
/// # Errors
///
/// Returns an error under the same conditions as [`solve`].
pub fn solve_unobserved<P>(problem: &P, config: &Config) -> Result<Solution, Error<P::Error>>
where
    P: NlpProblem,
{
    solve(problem, config, ())
}
