#![allow(dead_code)]

use std::convert::Infallible;

use vela_core::{Boundary, Bounds, Callbacks, Dae, Dimensions, Guess, Interval, NodePoint, Phase};

/// `dx/dt = u` with cost `∫ u²/2` and events `[x(t0), x(tf)]`.
pub struct Integrator;

impl Callbacks for Integrator {
    type Error = Infallible;

    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error> {
        Ok(Dae::new(vec![point.controls[0]]))
    }

    fn integrand_cost(&self, point: &NodePoint<'_>) -> Result<f64, Self::Error> {
        Ok(0.5 * point.controls[0].powi(2))
    }

    fn events(&self, ends: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        Ok(vec![ends.initial_states[0], ends.final_states[0]])
    }
}

/// A phase of [`Integrator`] from `x(t0) = from` to `x(tf) = to` over the
/// fixed interval `[t0, tf]`, guessed at rest.
pub fn integrator_phase(nodes: Vec<usize>, [t0, tf]: [f64; 2], [from, to]: [f64; 2]) -> Phase {
    let mut phase = Phase::new(Dimensions::new(1, 1).with_events(2));
    phase.set_nodes(nodes).expect("valid nodes");
    phase
        .set_event_bounds(Bounds::fixed(vec![from, to]))
        .expect("two events");
    phase.set_start_time(Interval::fixed(t0));
    phase.set_end_time(Interval::fixed(tf));
    phase
        .set_guess(Guess::linear([t0, tf], [&[from], &[to]], [&[0.0], &[0.0]], 2).expect("valid"))
        .expect("matching guess");
    phase
}
