//! The Bryson–Denham double integrator with a state limit.
//!
//! Minimize `∫ u²/2` for `x'' = u` from `(x, v) = (0, 1)` to `(0, -1)` with
//! `0 ≤ x ≤ l`. Over one unit of time with `l = 1/9` the limit is active on
//! the middle third of the interval and the optimal cost is `4 / (9 l) = 4`.
//! With a free final time the same cost is reached for any `tf ≥ 6 l`, since
//! the mass can rest at the limit for as long as it likes.
//!
//! The lower bound on `x` coincides with the fixed endpoint events, which
//! leaves the collocated program without a strict interior unless the
//! solver relaxes its bounds.

use std::convert::Infallible;

use approx::assert_relative_eq;
use vela_core::{
    Boundary, Bounds, Callbacks, Dae, Dimensions, Guess, Interval, NodePoint, Phase, Problem,
};
use vela_solvers::orchestrator::{Config, Orchestrator, Status};

const LIMIT: f64 = 1.0 / 9.0;

struct BrysonDenham;

impl Callbacks for BrysonDenham {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        Ok(Dae::new(vec![point.states[1], point.controls[0]]))
    }

    fn integrand_cost(&self, point: &NodePoint<'_>) -> Result<f64, Self::Error> {
        Ok(0.5 * point.controls[0].powi(2))
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Ok(vec![
            ends.initial_states[0],
            ends.initial_states[1],
            ends.final_states[0],
            ends.final_states[1],
        ])
    }
}

fn problem(nodes: Vec<usize>) -> Problem {
    let mut phase = Phase::new(Dimensions::new(2, 1).with_events(4));
    phase.set_nodes(nodes).expect("valid nodes");
    phase
        .set_state_bounds(Bounds::new(vec![0.0, -10.0], vec![LIMIT, 10.0]).expect("ordered"))
        .expect("two states");
    phase
        .set_control_bounds(Bounds::uniform(1, -10.0, 10.0).expect("ordered"))
        .expect("one control");
    phase
        .set_event_bounds(Bounds::fixed(vec![0.0, 1.0, 0.0, -1.0]))
        .expect("four events");
    phase.set_start_time(Interval::fixed(0.0));
    phase.set_end_time(Interval::fixed(1.0));
    phase
        .set_guess(
            Guess::linear([0.0, 1.0], [&[0.0, 1.0], &[0.0, -1.0]], [&[-2.0], &[-2.0]], 2)
                .expect("valid"),
        )
        .expect("matching guess");
    Problem::new("bryson-denham", vec![phase]).expect("complete problem")
}

#[test]
fn reaches_the_analytic_cost() {
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .configure(problem(vec![10, 10]), BrysonDenham, Config::default())
        .expect("valid config");
    let solution = orchestrator.solve().expect("solves");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.objective, 4.0, epsilon = 1e-2);

    let phase = &solution.phases[0];
    let last = phase.time.len() - 1;
    assert_relative_eq!(phase.states[(0, 0)], 0.0, epsilon = 1e-5);
    assert_relative_eq!(phase.states[(1, 0)], 1.0, epsilon = 1e-5);
    assert_relative_eq!(phase.states[(0, last)], 0.0, epsilon = 1e-5);
    assert_relative_eq!(phase.states[(1, last)], -1.0, epsilon = 1e-5);
    for &x in phase.states.row(0).iter() {
        assert!((-1e-6..=LIMIT + 1e-6).contains(&x), "x {x}");
    }

    // The limit is active at mid-interval.
    let mid = phase
        .time
        .iter()
        .position(|&t| (t - 0.5).abs() < 1e-9)
        .expect("a knot at t = 0.5");
    assert_relative_eq!(phase.states[(0, mid)], LIMIT, epsilon = 1e-3);
}

/// The three-state form: `x3` accumulates `u²/2` and the cost is `x3(tf)`.
struct Accumulated;

impl Callbacks for Accumulated {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        let u = point.controls[0];
        Ok(Dae::new(vec![point.states[1], u, 0.5 * u * u]))
    }

    fn endpoint_cost(&self, ends: &Boundary<'_>) -> Result<f64, Self::Error> {
        Ok(ends.final_states[2])
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Ok(vec![
            ends.initial_states[0],
            ends.initial_states[1],
            ends.initial_states[2],
            ends.final_states[0],
            ends.final_states[1],
        ])
    }
}

#[test]
fn free_final_time_reaches_the_same_cost() {
    let mut phase = Phase::new(Dimensions::new(3, 1).with_events(5));
    phase.set_nodes(vec![10, 50]).expect("valid nodes");
    phase
        .set_state_bounds(
            Bounds::new(vec![0.0, -10.0, -10.0], vec![LIMIT, 10.0, 10.0]).expect("ordered"),
        )
        .expect("three states");
    phase
        .set_control_bounds(Bounds::uniform(1, -10.0, 10.0).expect("ordered"))
        .expect("one control");
    phase
        .set_event_bounds(Bounds::fixed(vec![0.0, 1.0, 0.0, 0.0, -1.0]))
        .expect("five events");
    phase.set_start_time(Interval::fixed(0.0));
    phase.set_end_time(Interval::new(0.0, 50.0).expect("ordered"));
    phase
        .set_guess(
            Guess::linear(
                [0.0, 0.5],
                [&[0.0, 1.0, 0.0], &[0.0, -1.0, 0.0]],
                [&[0.0], &[0.0]],
                10,
            )
            .expect("valid"),
        )
        .expect("matching guess");
    let problem = Problem::new("bryson-denham", vec![phase]).expect("complete problem");

    let mut orchestrator = Orchestrator::new();
    orchestrator
        .configure(problem, Accumulated, Config::default())
        .expect("valid config");
    let solution = orchestrator.solve().expect("solves");

    assert_eq!(solution.status, Status::Converged);
    assert_relative_eq!(solution.objective, 4.0, epsilon = 1e-2);

    let phase = &solution.phases[0];
    assert!(phase.tf() > 0.6, "tf {}", phase.tf());
    let last = phase.time.len() - 1;
    assert_relative_eq!(phase.states[(0, 0)], 0.0, epsilon = 1e-5);
    assert_relative_eq!(phase.states[(2, 0)], 0.0, epsilon = 1e-5);
    assert_relative_eq!(phase.states[(0, last)], 0.0, epsilon = 1e-5);
    assert_relative_eq!(phase.states[(1, last)], -1.0, epsilon = 1e-5);
    assert_relative_eq!(phase.states[(2, last)], solution.objective, epsilon = 1e-9);
    for &x in phase.states.row(0).iter() {
        assert!((-1e-6..=LIMIT + 1e-6).contains(&x), "x {x}");
    }
    for &u in phase.controls.iter() {
        assert!(u.abs() <= 10.0 + 1e-6);
    }
}
