//! Solve orchestration: lifecycle, transcription, engine call and solution
//! extraction.
//!
//! An [`Orchestrator`] owns a [`Problem`], its [`Callbacks`] and a
//! [`Config`]. Each call to [`Orchestrator::solve`] transcribes the problem
//! with LGL collocation, runs the configured NLP engine and returns exactly
//! one [`Solution`] or an [`Error`].
//!
//! Non-convergence is not an error. It is reported through the solution's
//! [`Status`], and the orchestrator's [`State`] records the outcome of the
//! most recent solve.
//!
//! # Example
//!
//! ```
//! use vela_core::{Bounds, Callbacks, Dae, Dimensions, Guess, Interval, NodePoint, Phase, Problem};
//! use vela_solvers::orchestrator::{Config, Orchestrator, Status};
//!
//! struct Integrator;
//!
//! impl Callbacks for Integrator {
//!     type Error = std::convert::Infallible;
//!
//!     fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
//!         Ok(Dae::new(vec![point.controls[0]]))
//!     }
//!
//!     fn integrand_cost(&self, point: &NodePoint<'_>) -> Result<f64, Self::Error> {
//!         Ok(0.5 * point.controls[0] * point.controls[0])
//!     }
//!
//!     fn events(&self, ends: &vela_core::Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
//!         Ok(vec![ends.initial_states[0], ends.final_states[0]])
//!     }
//! }
//!
//! let mut phase = Phase::new(Dimensions::new(1, 1).with_events(2));
//! phase.set_nodes(vec![10])?;
//! phase.set_event_bounds(Bounds::fixed(vec![0.0, 1.0]))?;
//! phase.set_start_time(Interval::fixed(0.0));
//! phase.set_end_time(Interval::fixed(1.0));
//! phase.set_guess(Guess::linear([0.0, 1.0], [&[0.0], &[0.0]], [&[0.0], &[0.0]], 2)?)?;
//!
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.configure(
//!     Problem::new("integrator", vec![phase])?,
//!     Integrator,
//!     Config::default(),
//! )?;
//!
//! let solution = orchestrator.solve()?;
//! assert_eq!(solution.status, Status::Converged);
//! assert!((solution.objective - 0.5).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
mod extract;
mod lifecycle;
mod solution;

pub use config::{Config, ConfigError, DerivativeMethod, NlpMethod};
pub use error::Error;
pub use lifecycle::State;
pub use solution::{PhaseSolution, Solution, Status};

use std::sync::Mutex;

use tracing::{debug, info, info_span, warn};
use vela_core::{Callbacks, NlpProblem, Observer, Problem};

use crate::{
    nlp::interior_point::{self, Action, Event, Scaling},
    transcription::Transcription,
};

use lifecycle::{Solving, lock};

/// Runs solves of one configured problem.
///
/// `solve` takes `&self`, so an orchestrator can be shared between threads.
/// Only one solve runs at a time; a concurrent call returns
/// [`Error::AlreadySolving`] and leaves the running solve alone.
pub struct Orchestrator<C> {
    state: Mutex<State>,
    setup: Option<Setup<C>>,
}

struct Setup<C> {
    problem: Problem,
    callbacks: C,
    config: Config,
}

impl<C> Default for Orchestrator<C> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::Unconfigured),
            setup: None,
        }
    }
}

impl<C: Callbacks> Orchestrator<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a problem, its callbacks and a config, replacing any previous
    /// setup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the config fails validation. The
    /// previous setup and state are kept in that case.
    pub fn configure(&mut self, problem: Problem, callbacks: C, config: Config) -> Result<(), Error> {
        config.validate()?;
        self.setup = Some(Setup {
            problem,
            callbacks,
            config,
        });
        *lock(&self.state) = State::Configured;
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> State {
        *lock(&self.state)
    }

    /// The configured problem, if any.
    #[must_use]
    pub fn problem(&self) -> Option<&Problem> {
        self.setup.as_ref().map(|setup| &setup.problem)
    }

    /// The configured solve settings, if any.
    #[must_use]
    pub fn config(&self) -> Option<&Config> {
        self.setup.as_ref().map(|setup| &setup.config)
    }

    /// Solves the configured problem.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::solve_observed`].
    pub fn solve(&self) -> Result<Solution, Error> {
        self.solve_observed(())
    }

    /// Solves the configured problem, reporting every engine iteration to
    /// `observer`.
    ///
    /// The observer may stop the solve early by returning
    /// [`Action::StopEarly`]; the current iterate is then returned with
    /// [`Status::StoppedByObserver`].
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadySolving`] if another solve is running
    /// - [`Error::InvalidState`] unless the orchestrator is freshly configured
    /// - [`Error::CallbackContractViolation`] or [`Error::Callback`] if a
    ///   callback misbehaves
    /// - [`Error::InvalidConfig`] if explicit scaling factors do not match the
    ///   transcribed problem
    /// - [`Error::InvalidGuess`] if a phase guess cannot be interpolated onto
    ///   the collocation nodes
    /// - [`Error::EngineInternal`] if the engine cannot continue
    pub fn solve_observed<Obs>(&self, observer: Obs) -> Result<Solution, Error>
    where
        Obs: for<'a> Observer<Event<'a>, Action>,
    {
        let solving = Solving::enter(&self.state)?;
        let Some(setup) = &self.setup else {
            return Err(Error::InvalidState {
                state: State::Unconfigured.as_str(),
            });
        };
        let Setup {
            problem,
            callbacks,
            config,
        } = setup;

        let span = info_span!("solve", problem = problem.name());
        let _entered = span.enter();

        let nlp = Transcription::new(
            problem,
            callbacks,
            config.derivative_method(),
            config.workers(),
        )?;
        debug!(
            variables = nlp.num_variables(),
            constraints = nlp.num_constraints(),
            "transcribed"
        );

        if let Scaling::Explicit { constraints, .. } = config.scaling() {
            if constraints.len() != nlp.num_constraints() {
                return Err(ConfigError::ScalingLength {
                    expected: nlp.num_constraints(),
                    actual: constraints.len(),
                }
                .into());
            }
        }

        let result = match config.nlp_method() {
            NlpMethod::InteriorPoint => {
                interior_point::solve(&nlp, &config.engine_config()?, observer)?
            }
        };
        let solution = extract::extract(&nlp, callbacks, result)?;

        if solution.status.is_converged() {
            info!(
                objective = solution.objective,
                iterations = solution.iterations,
                "solve converged"
            );
        } else {
            warn!(
                status = ?solution.status,
                objective = solution.objective,
                iterations = solution.iterations,
                "solve did not converge"
            );
        }

        solving.finish(solution.status.into());
        Ok(solution)
    }
}
