mod common;

use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use vela_core::{
    Boundary, Bounds, Callbacks, Dae, Dimensions, Guess, Interval, NodePoint, Phase, Problem,
};
use vela_solvers::{
    nlp::interior_point::{Action, Event, Scaling},
    orchestrator::{Config, ConfigError, DerivativeMethod, Error, Orchestrator, State, Status},
};

use common::{Integrator, integrator_phase};

fn integrator(nodes: Vec<usize>) -> Problem {
    Problem::new(
        "integrator",
        vec![integrator_phase(nodes, [0.0, 1.0], [0.0, 1.0])],
    )
    .expect("complete problem")
}

fn configured<C: Callbacks>(problem: Problem, callbacks: C, config: Config) -> Orchestrator<C> {
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .configure(problem, callbacks, config)
        .expect("valid config");
    orchestrator
}

#[test]
fn integrator_matches_the_closed_form_solution() {
    let orchestrator = configured(integrator(vec![8]), Integrator, Config::default());
    let solution = orchestrator.solve().expect("solves");

    assert_eq!(solution.status, Status::Converged);
    assert_eq!(orchestrator.state(), State::Converged);
    assert_relative_eq!(solution.objective, 0.5, epsilon = 1e-6);

    let phase = &solution.phases[0];
    assert_eq!(phase.time.len(), 8);
    for k in 0..phase.time.len() {
        assert_relative_eq!(phase.states[(0, k)], phase.time[k], epsilon = 1e-6);
        assert_relative_eq!(phase.controls[(0, k)], 1.0, epsilon = 1e-5);
        assert_relative_eq!(phase.costates[(0, k)], -1.0, epsilon = 1e-4);
        assert_relative_eq!(phase.hamiltonian[k], -0.5, epsilon = 1e-4);
    }
}

#[test]
fn integrator_converges_for_every_mesh() {
    let meshes = (2..=8)
        .map(|nodes| vec![nodes])
        .chain([vec![10], vec![20], vec![4, 3], vec![6, 4]]);

    for nodes in meshes {
        let orchestrator = configured(integrator(nodes.clone()), Integrator, Config::default());
        let solution = orchestrator.solve().expect("solves");

        assert_eq!(solution.status, Status::Converged, "nodes {nodes:?}");
        assert_relative_eq!(solution.objective, 0.5, epsilon = 1e-6);
        let phase = &solution.phases[0];
        for k in 0..phase.time.len() {
            assert_relative_eq!(phase.controls[(0, k)], 1.0, epsilon = 1e-5);
        }
    }
}

#[test]
fn knots_are_repeated_in_each_segment() {
    let orchestrator = configured(integrator(vec![4, 3]), Integrator, Config::default());
    let solution = orchestrator.solve().expect("solves");
    assert_eq!(solution.status, Status::Converged);

    let time = &solution.phases[0].time;
    assert_eq!(time.len(), 7);
    assert_relative_eq!(time[3], 0.5, epsilon = 1e-12);
    assert_relative_eq!(time[4], 0.5, epsilon = 1e-12);
    let costates = &solution.phases[0].costates;
    assert_eq!(costates[(0, 3)], costates[(0, 4)]);
    for k in 0..time.len() {
        assert_relative_eq!(solution.phases[0].costates[(0, k)], -1.0, epsilon = 1e-4);
    }
}

#[test]
fn resolving_from_the_solution_reproduces_the_objective() {
    let config = Config::new(1000, 1e-8).expect("valid config");
    let first = configured(integrator(vec![5, 5]), Integrator, config.clone())
        .solve()
        .expect("solves");

    let phase = &first.phases[0];
    let guess = Guess::new(
        phase.time.clone(),
        phase.states.clone(),
        phase.controls.clone(),
    )
    .expect("solution grid is a valid guess");
    let mut warm = integrator_phase(vec![5, 5], [0.0, 1.0], [0.0, 1.0]);
    warm.set_guess(guess).expect("matching guess");
    let problem = Problem::new("warm", vec![warm]).expect("complete problem");

    let second = configured(problem, Integrator, config).solve().expect("solves");
    assert_eq!(second.status, Status::Converged);
    assert_relative_eq!(second.objective, first.objective, epsilon = 1e-6);
}

#[test]
fn solves_are_bit_reproducible() {
    let solve = |workers: usize| {
        let config = Config::default().with_workers(workers).expect("valid");
        configured(integrator(vec![6, 4]), Integrator, config)
            .solve()
            .expect("solves")
    };

    let first = solve(1);
    let second = solve(1);
    let threaded = solve(3);

    let bits = |x: &[f64]| x.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first.decision), bits(&second.decision));
    assert_eq!(bits(&first.decision), bits(&threaded.decision));
    assert_eq!(first.iterations, threaded.iterations);
}

#[test]
fn zero_iterations_return_the_interpolated_guess() {
    let config = Config::new(0, 1e-6).expect("valid config");
    let orchestrator = configured(integrator(vec![5]), Integrator, config);
    let solution = orchestrator.solve().expect("solves");

    assert_eq!(solution.status, Status::IterationLimitReached);
    assert_eq!(orchestrator.state(), State::IterationLimitReached);
    assert_eq!(solution.iterations, 0);

    // The guess moves linearly from 0 to 1 over [0, 1] with zero control.
    let phase = &solution.phases[0];
    for k in 0..phase.time.len() {
        assert_relative_eq!(phase.states[(0, k)], phase.time[k], epsilon = 1e-12);
        assert_eq!(phase.controls[(0, k)], 0.0);
    }
}

#[test]
fn single_node_segments_are_raised_to_two() {
    let orchestrator = configured(integrator(vec![1]), Integrator, Config::default());
    let solution = orchestrator.solve().expect("terminates");

    let phase = &solution.phases[0];
    assert_eq!(phase.time, vec![0.0, 1.0]);
    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.objective, 0.5, epsilon = 1e-6);
}

#[test]
fn finite_difference_derivatives_agree() {
    let config = Config::default().with_derivative_method(DerivativeMethod::FiniteDifference);
    let solution = configured(integrator(vec![5]), Integrator, config)
        .solve()
        .expect("solves");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.objective, 0.5, epsilon = 1e-6);
}

#[test]
fn observer_can_stop_the_solve() {
    let orchestrator = configured(integrator(vec![6]), Integrator, Config::default());
    let mut seen = Vec::new();
    let observer = |event: &Event<'_>| {
        seen.push(event.iter);
        (event.iter == 1).then_some(Action::StopEarly)
    };

    let solution = orchestrator.solve_observed(observer).expect("stops");
    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(orchestrator.state(), State::StoppedByObserver);
    assert_eq!(seen, vec![0, 1]);
}

#[test]
fn lifecycle_requires_configuration_before_each_solve() {
    let mut orchestrator: Orchestrator<Integrator> = Orchestrator::new();
    assert_eq!(orchestrator.state(), State::Unconfigured);
    assert!(matches!(
        orchestrator.solve(),
        Err(Error::InvalidState {
            state: "unconfigured"
        })
    ));

    orchestrator
        .configure(integrator(vec![4]), Integrator, Config::default())
        .expect("valid config");
    assert_eq!(orchestrator.state(), State::Configured);
    orchestrator.solve().expect("solves");

    assert!(matches!(
        orchestrator.solve(),
        Err(Error::InvalidState { state: "converged" })
    ));
    assert_eq!(orchestrator.state(), State::Converged);

    orchestrator
        .configure(integrator(vec![4]), Integrator, Config::default())
        .expect("valid config");
    assert_eq!(orchestrator.state(), State::Configured);
}

#[test]
fn explicit_scaling_must_match_the_transcription() {
    let explicit = Config::default()
        .with_scaling(Scaling::Explicit {
            objective: 1.0,
            constraints: vec![1.0; 3],
        })
        .expect("positive factors");
    let orchestrator = configured(integrator(vec![4]), Integrator, explicit);

    // Four defects, two events and one duration row.
    assert!(matches!(
        orchestrator.solve(),
        Err(Error::InvalidConfig(ConfigError::ScalingLength {
            expected: 7,
            actual: 3,
        }))
    ));
    assert_eq!(orchestrator.state(), State::Failed);
}

#[test]
fn invalid_config_is_rejected_before_binding() {
    let mut orchestrator: Orchestrator<Integrator> = Orchestrator::new();
    assert!(matches!(
        Config::default().with_workers(0),
        Err(ConfigError::Workers)
    ));
    assert!(Config::new(10, -1.0).is_err());
    assert!(orchestrator.problem().is_none());

    orchestrator
        .configure(integrator(vec![4]), Integrator, Config::default())
        .expect("valid config");
    assert_eq!(orchestrator.problem().map(Problem::name), Some("integrator"));
    assert_eq!(orchestrator.config().map(Config::workers), Some(1));
}

/// Spins in the first dynamics call until released.
struct Gate {
    entered: Arc<AtomicBool>,
    release: Arc<AtomicBool>,
}

impl Callbacks for Gate {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        self.entered.store(true, Ordering::SeqCst);
        while !self.release.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        Integrator.dynamics(point)
    }

    fn integrand_cost(&self, point: &NodePoint<'_>) -> Result<f64, Self::Error> {
        Integrator.integrand_cost(point)
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Integrator.events(ends)
    }
}

#[test]
fn concurrent_solve_is_rejected() {
    let entered = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));
    let gate = Gate {
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    };
    let orchestrator = configured(integrator(vec![4]), gate, Config::default());

    thread::scope(|scope| {
        let running = scope.spawn(|| orchestrator.solve());

        while !entered.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        assert_eq!(orchestrator.state(), State::Solving);
        assert!(matches!(orchestrator.solve(), Err(Error::AlreadySolving)));
        release.store(true, Ordering::SeqCst);

        let solution = running
            .join()
            .expect("solver thread")
            .expect("first solve is unaffected");
        assert_eq!(solution.status, Status::Converged);
    });
    assert_eq!(orchestrator.state(), State::Converged);
}

/// Declares two events but returns one.
struct MissingEvent;

impl Callbacks for MissingEvent {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        Integrator.dynamics(point)
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Ok(vec![ends.initial_states[0]])
    }
}

#[test]
fn wrong_event_count_aborts_without_a_solution() {
    let orchestrator = configured(integrator(vec![4]), MissingEvent, Config::default());

    let err = orchestrator.solve().unwrap_err();
    assert!(matches!(
        err,
        Error::CallbackContractViolation {
            callback: "events",
            phase: Some(0),
            expected: 2,
            actual: 1,
        }
    ));
    assert_eq!(orchestrator.state(), State::Failed);
}

#[derive(Debug, thiserror::Error)]
#[error("model diverged at t = {0}")]
struct Diverged(f64);

/// Fails once time passes one half.
struct Fragile;

impl Callbacks for Fragile {
    type Error = Diverged;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        if point.time > 0.5 {
            return Err(Diverged(point.time));
        }
        Ok(Dae::new(vec![point.controls[0]]))
    }
}

#[test]
fn callback_errors_are_propagated() {
    let orchestrator = configured(integrator(vec![4]), Fragile, Config::default());

    let Err(Error::Callback(source)) = orchestrator.solve() else {
        panic!("expected a callback error");
    };
    assert!(source.downcast_ref::<Diverged>().is_some());
}

/// `dx/dt = p` with a free parameter, cost `p²` and `x(1) = 2`.
struct Rate;

impl Callbacks for Rate {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        Ok(Dae::new(vec![point.parameters[0]]))
    }

    fn endpoint_cost(&self, ends: &Boundary<'_>) -> Result<f64, Self::Error> {
        Ok(ends.parameters[0].powi(2))
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Ok(vec![ends.initial_states[0], ends.final_states[0]])
    }
}

#[test]
fn static_parameters_are_decision_variables() {
    let mut phase = Phase::new(Dimensions::new(1, 0).with_events(2).with_parameters(1));
    phase.set_nodes(vec![4]).expect("valid nodes");
    phase
        .set_event_bounds(Bounds::fixed(vec![0.0, 2.0]))
        .expect("two events");
    phase
        .set_parameter_bounds(Bounds::uniform(1, -10.0, 10.0).expect("valid"))
        .expect("one parameter");
    phase.set_start_time(Interval::fixed(0.0));
    phase.set_end_time(Interval::fixed(1.0));
    phase
        .set_guess(
            Guess::new(vec![0.0], DMatrix::zeros(1, 1), DMatrix::zeros(0, 1))
                .expect("valid")
                .with_parameters(vec![0.5]),
        )
        .expect("matching guess");
    let problem = Problem::new("rate", vec![phase]).expect("complete problem");

    let solution = configured(problem, Rate, Config::default())
        .solve()
        .expect("solves");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.phases[0].parameters[0], 2.0, epsilon = 1e-6);
    assert_relative_eq!(solution.objective, 4.0, epsilon = 1e-5);
}

/// `dx/dt = u` with `u ≤ 0.8` as a path constraint and minimum final time.
struct Limited;

impl Callbacks for Limited {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        Ok(Dae::new(vec![point.controls[0]]).with_path(vec![point.controls[0]]))
    }

    fn endpoint_cost(&self, ends: &Boundary<'_>) -> Result<f64, Self::Error> {
        Ok(ends.tf)
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Integrator.events(ends)
    }
}

#[test]
fn path_constraints_bound_the_control() {
    let mut phase = Phase::new(Dimensions::new(1, 1).with_events(2).with_path(1));
    phase.set_nodes(vec![6]).expect("valid nodes");
    phase
        .set_event_bounds(Bounds::fixed(vec![0.0, 1.0]))
        .expect("two events");
    phase
        .set_path_bounds(Bounds::new(vec![f64::NEG_INFINITY], vec![0.8]).expect("valid"))
        .expect("one path constraint");
    phase.set_start_time(Interval::fixed(0.0));
    phase.set_end_time(Interval::new(0.1, 10.0).expect("valid"));
    phase
        .set_guess(Guess::linear([0.0, 2.0], [&[0.0], &[1.0]], [&[0.5], &[0.5]], 2).expect("valid"))
        .expect("matching guess");
    let problem = Problem::new("minimum time", vec![phase]).expect("complete problem");

    let solution = configured(problem, Limited, Config::default())
        .solve()
        .expect("solves");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.objective, 1.25, epsilon = 1e-4);
    for &u in solution.phases[0].controls.iter() {
        assert!(u <= 0.8 + 1e-6);
    }
}
