//! The functions a problem author supplies.
//!
//! Every callback receives a borrowed evaluation context describing where it
//! is being evaluated. Contexts are valid only for the duration of the call.
//! Callbacks must be deterministic: the solver evaluates them many times per
//! iteration, including at perturbed points, and may do so from several
//! threads at once.

/// Evaluation context for a single collocation node.
#[derive(Debug, Clone, Copy)]
pub struct NodePoint<'a> {
    /// Zero-based phase index.
    pub phase: usize,
    pub states: &'a [f64],
    pub controls: &'a [f64],
    pub parameters: &'a [f64],
    pub time: f64,
}

/// Evaluation context for the two ends of a phase.
#[derive(Debug, Clone, Copy)]
pub struct Boundary<'a> {
    /// Zero-based phase index.
    pub phase: usize,
    pub initial_states: &'a [f64],
    pub final_states: &'a [f64],
    pub parameters: &'a [f64],
    pub t0: f64,
    pub tf: f64,
}

/// The output of the dynamics callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dae {
    /// State derivatives, one per state.
    pub derivatives: Vec<f64>,

    /// Path constraint values, one per path constraint.
    pub path: Vec<f64>,
}

impl Dae {
    /// Dynamics with no path constraints.
    #[must_use]
    pub fn new(derivatives: Vec<f64>) -> Self {
        Self {
            derivatives,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: Vec<f64>) -> Self {
        self.path = path;
        self
    }
}

/// The callback set that defines a problem's physics and cost.
///
/// Only [`Callbacks::dynamics`] is required. The defaults describe a problem
/// with zero cost, no events and no linkages.
///
/// Output lengths are part of the contract: derivatives must have one entry
/// per state, path values one per path constraint, events one per event and
/// linkages one per declared linkage. The solver aborts on any mismatch.
pub trait Callbacks: Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Evaluates the state derivatives and path constraints at a node.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the dynamics cannot be evaluated; the solve
    /// is aborted.
    fn dynamics(&self, point: &NodePoint<'_>) -> Result<Dae, Self::Error>;

    /// Evaluates the running cost at a node.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the cost cannot be evaluated.
    fn integrand_cost(&self, point: &NodePoint<'_>) -> Result<f64, Self::Error> {
        let _ = point;
        Ok(0.0)
    }

    /// Evaluates the endpoint (Mayer) cost of a phase.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the cost cannot be evaluated.
    fn endpoint_cost(&self, boundary: &Boundary<'_>) -> Result<f64, Self::Error> {
        let _ = boundary;
        Ok(0.0)
    }

    /// Evaluates the boundary event functions of a phase.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the events cannot be evaluated.
    fn events(&self, boundary: &Boundary<'_>) -> Result<Vec<f64>, Self::Error> {
        let _ = boundary;
        Ok(Vec::new())
    }

    /// Evaluates the inter-phase linkage residuals.
    ///
    /// `boundaries` holds one entry per phase, in phase order.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the linkages cannot be evaluated.
    fn linkages(&self, boundaries: &[Boundary<'_>]) -> Result<Vec<f64>, Self::Error> {
        let _ = boundaries;
        Ok(Vec::new())
    }
}
