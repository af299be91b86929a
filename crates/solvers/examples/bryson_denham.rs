//! Solves the Bryson–Denham problem and prints the solved trajectory.
//!
//! A unit mass starts at `x = 0` moving at `v = 1` and must return to
//! `x = 0` moving at `v = -1` without passing `x = 1/9`, using as little
//! control effort as possible. A third state accumulates `u²/2` and its final
//! value is the cost. The final time is free in `[0, 50]`. The analytic
//! optimum is 4, reached for any final time of at least 2/3.
//!
//! # Usage
//!
//! ```text
//! cargo run --example bryson_denham
//! cargo run --example bryson_denham -- target/bryson-denham
//! ```
//!
//! With a directory argument the trajectory tables are also written there.

use std::{convert::Infallible, error::Error};

use tracing::info;
use vela_core::{
    Boundary, Bounds, Callbacks, Dae, Dimensions, Guess, Interval, NodePoint, Phase, Problem,
};
use vela_solvers::{
    export,
    nlp::interior_point::{Action, Event},
    orchestrator::{Config, Orchestrator},
};

const LIMIT: f64 = 1.0 / 9.0;

struct BrysonDenham;

impl Callbacks for BrysonDenham {
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

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let mut phase = Phase::new(Dimensions::new(3, 1).with_events(5));
    phase.set_nodes(vec![10, 50])?;
    phase.set_state_bounds(Bounds::new(
        vec![0.0, -10.0, -10.0],
        vec![LIMIT, 10.0, 10.0],
    )?)?;
    phase.set_control_bounds(Bounds::uniform(1, -10.0, 10.0)?)?;
    phase.set_event_bounds(Bounds::fixed(vec![0.0, 1.0, 0.0, 0.0, -1.0]))?;
    phase.set_start_time(Interval::fixed(0.0));
    phase.set_end_time(Interval::new(0.0, 50.0)?);
    phase.set_guess(Guess::linear(
        [0.0, 0.5],
        [&[0.0, 1.0, 0.0], &[0.0, -1.0, 0.0]],
        [&[0.0], &[0.0]],
        10,
    )?)?;

    let mut problem = Problem::new("bryson-denham", vec![phase])?;
    if let Some(dir) = std::env::args().nth(1) {
        problem = problem.with_output_destination(dir);
    }

    let mut orchestrator = Orchestrator::new();
    orchestrator.configure(problem, BrysonDenham, Config::default())?;

    let observer = |event: &Event<'_>| -> Option<Action> {
        info!(
            iter = event.iter,
            objective = event.objective,
            infeasibility = event.primal_infeasibility,
            mu = event.mu,
            "iteration"
        );
        None
    };
    let solution = orchestrator.solve_observed(observer)?;

    println!("status:     {:?}", solution.status);
    println!("objective:  {:.6} (analytic 4)", solution.objective);
    println!("iterations: {}", solution.iterations);
    println!("final time: {:.4}", solution.phases[0].tf());
    println!();
    println!("{:>8} {:>10} {:>10} {:>10}", "t", "x", "v", "u");
    let phase = &solution.phases[0];
    for (k, t) in phase.time.iter().enumerate() {
        println!(
            "{t:>8.4} {:>10.5} {:>10.5} {:>10.5}",
            phase.states[(0, k)],
            phase.states[(1, k)],
            phase.controls[(0, k)],
        );
    }

    if let Some(problem) = orchestrator.problem() {
        if problem.output_destination().is_some() {
            for path in export::write(problem, &solution)? {
                println!("wrote {}", path.display());
            }
        }
    }
    Ok(())
}
