use std::convert::Infallible;

use approx::assert_relative_eq;
use vela_core::{
    Boundary, Bounds, Callbacks, Dae, Dimensions, Guess, Interval, NodePoint, Phase, Problem,
};
use vela_solvers::orchestrator::{Config, Error, Orchestrator, Solution, State, Status};

/// `x'' = u` with cost `∫ u²/2`, moved from rest at 0 to rest at 1 over
/// `[0, 2]`. The optimum is `u = 1.5 (1 − t)` with cost `6 d² / T³ = 0.75`.
struct DoubleIntegrator;

impl Callbacks for DoubleIntegrator {
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

/// The same motion split at `t = 1` into two phases.
///
/// The first phase pins its start and its end time, the second its end. The
/// switch is joined by position, velocity and time continuity.
struct Split;

impl Callbacks for Split {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        DoubleIntegrator.dynamics(point)
    }

    fn integrand_cost(&self, point: &NodePoint<'_>) -> Result<f64, Self::Error> {
        DoubleIntegrator.integrand_cost(point)
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Ok(match ends.phase {
            0 => vec![ends.initial_states[0], ends.initial_states[1], ends.tf],
            _ => vec![ends.final_states[0], ends.final_states[1]],
        })
    }

    fn linkages(&self, ends: &[Boundary<'_>]) -> Result<Vec<f64>, Self::Error> {
        let (first, second) = (&ends[0], &ends[1]);
        Ok(vec![
            first.final_states[0] - second.initial_states[0],
            first.final_states[1] - second.initial_states[1],
            first.tf - second.t0,
        ])
    }
}

fn phase(events: Vec<f64>, start: Interval, end: Interval, span: [f64; 2]) -> Phase {
    let mut phase = Phase::new(Dimensions::new(2, 1).with_events(events.len()));
    phase.set_nodes(vec![5, 5]).expect("valid nodes");
    phase
        .set_event_bounds(Bounds::fixed(events))
        .expect("matching events");
    phase.set_start_time(start);
    phase.set_end_time(end);
    phase
        .set_guess(
            Guess::linear(span, [&[0.0, 0.0], &[1.0, 0.0]], [&[0.0], &[0.0]], 2)
                .expect("valid"),
        )
        .expect("matching guess");
    phase
}

fn single_phase() -> Problem {
    let whole = phase(
        vec![0.0, 0.0, 1.0, 0.0],
        Interval::fixed(0.0),
        Interval::fixed(2.0),
        [0.0, 2.0],
    );
    Problem::new("one phase", vec![whole]).expect("complete problem")
}

fn two_phases() -> Problem {
    let switch = Interval::new(0.5, 1.5).expect("ordered");
    let first = phase(
        vec![0.0, 0.0, 1.0],
        Interval::fixed(0.0),
        switch,
        [0.0, 1.0],
    );
    let second = phase(vec![1.0, 0.0], switch, Interval::fixed(2.0), [1.0, 2.0]);
    Problem::new("two phases", vec![first, second])
        .expect("complete problem")
        .with_linkages(3)
}

fn solve<C: Callbacks>(
    problem: Problem,
    callbacks: C,
) -> (Orchestrator<C>, Result<Solution, Error>) {
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .configure(problem, callbacks, Config::default())
        .expect("valid config");
    let result = orchestrator.solve();
    (orchestrator, result)
}

#[test]
fn linked_phases_match_a_single_phase() {
    let (_, single) = solve(single_phase(), DoubleIntegrator);
    let single = single.expect("solves");
    let (_, linked) = solve(two_phases(), Split);
    let linked = linked.expect("solves");

    assert_eq!(single.status, Status::Converged);
    assert_eq!(linked.status, Status::Converged);
    assert_relative_eq!(single.objective, 0.75, epsilon = 1e-6);
    assert_relative_eq!(linked.objective, single.objective, epsilon = 1e-6);

    let [first, second] = linked.phases.as_slice() else {
        panic!("expected two phases");
    };
    assert_relative_eq!(first.tf(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(second.t0(), 1.0, epsilon = 1e-6);

    let last = first.time.len() - 1;
    for (phase, k) in [(first, last), (second, 0)] {
        assert_relative_eq!(phase.states[(0, k)], 0.5, epsilon = 1e-6);
        assert_relative_eq!(phase.states[(1, k)], 0.75, epsilon = 1e-6);
    }
    for phase in [first, second] {
        for (k, t) in phase.time.iter().enumerate() {
            assert_relative_eq!(phase.controls[(0, k)], 1.5 * (1.0 - t), epsilon = 1e-4);
        }
    }
}

/// Reports two linkages where the problem declares three.
struct MissingLinkage;

impl Callbacks for MissingLinkage {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        Split.dynamics(point)
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Split.events(ends)
    }

    fn linkages(&self, ends: &[Boundary<'_>]) -> Result<Vec<f64>, Self::Error> {
        let mut values = Split.linkages(ends)?;
        values.pop();
        Ok(values)
    }
}

#[test]
fn wrong_linkage_count_names_no_phase() {
    let (orchestrator, result) = solve(two_phases(), MissingLinkage);

    assert!(matches!(
        result,
        Err(Error::CallbackContractViolation {
            callback: "linkages",
            phase: None,
            expected: 3,
            actual: 2,
        })
    ));
    assert_eq!(orchestrator.state(), State::Failed);
}
