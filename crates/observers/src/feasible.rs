use vela_core::Observer;

use crate::traits::{CanStopEarly, HasInfeasibility};

/// Stops a solve at the first iterate whose constraint violation is at most
/// the tolerance.
///
/// Use it to find a feasible trajectory quickly, for example to warm start a
/// later solve. Iterations before `min_iters` are never stopped, so an
/// already feasible guess still takes that many steps.
#[derive(Debug, Clone, Copy)]
pub struct StopWhenFeasible {
    tolerance: f64,
    min_iters: usize,
    seen: usize,
}

impl StopWhenFeasible {
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            min_iters: 0,
            seen: 0,
        }
    }

    /// Observes at least `min_iters` events before stopping.
    #[must_use]
    pub fn with_min_iters(mut self, min_iters: usize) -> Self {
        self.min_iters = min_iters;
        self
    }
}

impl<E: HasInfeasibility, A: CanStopEarly> Observer<E, A> for StopWhenFeasible {
    fn observe(&mut self, event: &E) -> Option<A> {
        self.seen += 1;
        if self.seen > self.min_iters && event.primal_infeasibility() <= self.tolerance {
            return Some(A::stop_early());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use vela_solvers::nlp::interior_point::{Action, Event};

    fn event(primal: f64) -> Event<'static> {
        Event {
            iter: 0,
            objective: 0.0,
            primal_infeasibility: primal,
            dual_infeasibility: 1.0,
            mu: 0.1,
            alpha: 0.0,
            regularization: 0.0,
            x: &[],
        }
    }

    #[test]
    fn stops_on_the_first_feasible_event() {
        let mut observer = StopWhenFeasible::new(1e-6);
        let mut observe = |primal| -> Option<Action> { observer.observe(&event(primal)) };

        assert_eq!(observe(1.0), None);
        assert_eq!(observe(1e-3), None);
        assert_eq!(observe(1e-7), Some(Action::StopEarly));
    }

    #[test]
    fn waits_for_the_minimum_iterations() {
        let mut observer = StopWhenFeasible::new(1e-6).with_min_iters(2);
        let mut observe = |primal| -> Option<Action> { observer.observe(&event(primal)) };

        assert_eq!(observe(0.0), None);
        assert_eq!(observe(0.0), None);
        assert_eq!(observe(0.0), Some(Action::StopEarly));
    }
}
