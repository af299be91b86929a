use vela_core::Observer;

use crate::traits::{HasInfeasibility, HasObjective};

/// One observed iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub objective: f64,
    pub primal_infeasibility: f64,
    pub dual_infeasibility: f64,
}

/// Records every event it observes and never acts.
///
/// Solvers take their observer by value, so lend the history through a
/// closure to read it after the solve:
///
/// ```rust
/// use vela_core::Observer;
/// use vela_observers::History;
/// use vela_solvers::nlp::interior_point::{Action, Event};
///
/// let mut history = History::new();
/// let observer = |event: &Event<'_>| -> Option<Action> { history.observe(event) };
/// # drop(observer);
/// assert!(history.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<Record>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in the order observed.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent record.
    #[must_use]
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Lowest objective among records whose primal infeasibility is at most
    /// `tolerance`.
    #[must_use]
    pub fn best_feasible(&self, tolerance: f64) -> Option<&Record> {
        self.records
            .iter()
            .filter(|r| r.primal_infeasibility <= tolerance)
            .min_by(|a, b| a.objective.total_cmp(&b.objective))
    }
}

impl<E: HasObjective + HasInfeasibility, A> Observer<E, A> for History {
    fn observe(&mut self, event: &E) -> Option<A> {
        self.records.push(Record {
            objective: event.objective(),
            primal_infeasibility: event.primal_infeasibility(),
            dual_infeasibility: event.dual_infeasibility(),
        });
        None
    }
}
