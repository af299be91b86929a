//! Multi-segment LGL transcription of a multi-phase optimal control problem.
//!
//! [`Transcription`] turns a [`Problem`] and its [`Callbacks`] into an
//! [`NlpProblem`]. For each phase with `S` segments:
//!
//! ```text
//! defects     Σ_b D_ab x_b − (tf − t0)/(2S) f(x_a, u_a, p, t_a) = 0
//! continuity  first state of segment s − last state of segment s−1 = 0
//! path        g(x_a, u_a, p, t_a) ∈ path bounds
//! events      e(x(t0), x(tf), p, t0, tf) ∈ event bounds
//! duration    tf − t0 ≥ 0
//! ```
//!
//! followed by the linkage rows `ψ(boundaries) ∈ linkage bounds`. The
//! objective sums each phase's endpoint cost and its Gauss–Lobatto quadrature
//! of the running cost.
//!
//! Callback work is split into elements: one per node, one per phase boundary
//! and one for the linkages. With [`DerivativeMethod::Automatic`] each element
//! is differentiated on its own few variables and the results are assembled
//! into the full Jacobian and Hessian. Elements may be evaluated on several
//! scoped threads. Results are always combined in element order, so the
//! output does not depend on the worker count.

mod element;
mod error;
mod guess;
mod layout;


pub use error::{InterpError, TranscriptionError};

pub(crate) use layout::{PhaseLayout, time_at};

use nalgebra::DMatrix;
use vela_core::{Callbacks, NlpProblem, Problem};

use crate::orchestrator::DerivativeMethod;

use element::Element;

/// A problem and its callbacks viewed as a nonlinear program.
pub struct Transcription<'a, C> {
    problem: &'a Problem,
    callbacks: &'a C,
    derivatives: DerivativeMethod,
    workers: usize,
    layouts: Vec<PhaseLayout>,
    elements: Vec<Element>,
    linkage_row: usize,
    num_variables: usize,
    num_constraints: usize,
    initial: Vec<f64>,
}

impl<'a, C: Callbacks> Transcription<'a, C> {
    /// Lays out the NLP and interpolates each phase guess onto its nodes.
    ///
    /// `workers` is the number of threads used to evaluate callbacks; values
    /// below one are treated as one.
    ///
    /// # Errors
    ///
    /// Returns an error if a guess cannot be interpolated.
    pub fn new(
        problem: &'a Problem,
        callbacks: &'a C,
        derivatives: DerivativeMethod,
        workers: usize,
    ) -> Result<Self, InterpError> {
        let mut layouts = Vec::with_capacity(problem.phases().len());
        let (mut var_offset, mut row_offset) = (0, 0);
        for phase in problem.phases() {
            let layout = PhaseLayout::new(phase, var_offset, row_offset);
            var_offset += layout.num_variables();
            row_offset += layout.num_rows();
            layouts.push(layout);
        }

        let linkage_row = row_offset;
        let num_linkages = problem.num_linkages();
        let elements = Element::build(&layouts, linkage_row, num_linkages);

        let mut initial = vec![0.0; var_offset];
        for (phase, layout) in problem.phases().iter().zip(&layouts) {
            guess::fill(phase, layout, &mut initial)?;
        }

        Ok(Self {
            problem,
            callbacks,
            derivatives,
            workers: workers.max(1),
            layouts,
            elements,
            linkage_row,
            num_variables: var_offset,
            num_constraints: linkage_row + num_linkages,
            initial,
        })
    }

    pub(crate) fn layouts(&self) -> &[PhaseLayout] {
        &self.layouts
    }

    /// Starting point built from the phase guesses.
    #[must_use]
    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    /// Visits every `(row, column, coefficient)` of the rows that are linear
    /// in the decision variables: defect differentiation terms, knot
    /// continuity and phase duration.
    fn linear_terms(&self, mut visit: impl FnMut(usize, usize, f64)) {
        for layout in &self.layouts {
            let ns = layout.dims().states;
            let segments = layout.mesh().segments();

            for segment in segments {
                let first = segment.first_node();
                let d = segment.rule().differentiation();
                for a in 0..segment.len() {
                    let row = layout.defect(first + a);
                    for b in 0..segment.len() {
                        let col = layout.state(first + b);
                        for i in 0..ns {
                            visit(row + i, col + i, d[(a, b)]);
                        }
                    }
                }
            }

            for (s, pair) in segments.windows(2).enumerate() {
                let row = layout.continuity(s + 1);
                let next = layout.state(pair[1].first_node());
                let prev = layout.state(pair[0].first_node() + pair[0].len() - 1);
                for i in 0..ns {
                    visit(row + i, next + i, 1.0);
                    visit(row + i, prev + i, -1.0);
                }
            }

            visit(layout.duration(), layout.tf(), 1.0);
            visit(layout.duration(), layout.t0(), -1.0);
        }
    }

    fn assemble(&self, x: &[f64], g: &mut [f64]) -> Result<f64, TranscriptionError<C::Error>> {
        g.fill(0.0);
        let values = self.element_values(x)?;

        let mut objective = 0.0;
        for (element, (term, out)) in self.elements.iter().zip(values) {
            objective += term;
            for (&row, value) in element.rows().iter().zip(out) {
                g[row] += value;
            }
        }

        self.linear_terms(|row, col, coef| g[row] += coef * x[col]);
        Ok(objective)
    }
}

impl<C: Callbacks> NlpProblem for Transcription<'_, C> {
    type Error = TranscriptionError<C::Error>;

    fn num_variables(&self) -> usize {
        self.num_variables
    }

    fn num_constraints(&self) -> usize {
        self.num_constraints
    }

    fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
        for (phase, layout) in self.problem.phases().iter().zip(&self.layouts) {
            let dims = layout.dims();
            let states = phase.state_bounds();
            let controls = phase.control_bounds();

            for k in 0..layout.num_nodes() {
                let x = layout.state(k);
                lower[x..x + dims.states].copy_from_slice(states.lower());
                upper[x..x + dims.states].copy_from_slice(states.upper());
                let u = layout.control(k);
                lower[u..u + dims.controls].copy_from_slice(controls.lower());
                upper[u..u + dims.controls].copy_from_slice(controls.upper());
            }

            let parameters = phase.parameter_bounds();
            let p = layout.parameters();
            lower[p..p + dims.parameters].copy_from_slice(parameters.lower());
            upper[p..p + dims.parameters].copy_from_slice(parameters.upper());

            let (start, end) = (phase.start_time(), phase.end_time());
            (lower[layout.t0()], upper[layout.t0()]) = (start.lower, start.upper);
            (lower[layout.tf()], upper[layout.tf()]) = (end.lower, end.upper);
        }
    }

    fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]) {
        lower.fill(0.0);
        upper.fill(0.0);

        for (phase, layout) in self.problem.phases().iter().zip(&self.layouts) {
            let dims = layout.dims();
            let path = phase.path_bounds();
            for k in 0..layout.num_nodes() {
                let r = layout.path(k);
                lower[r..r + dims.path].copy_from_slice(path.lower());
                upper[r..r + dims.path].copy_from_slice(path.upper());
            }

            let events = phase.event_bounds();
            let r = layout.events();
            lower[r..r + dims.events].copy_from_slice(events.lower());
            upper[r..r + dims.events].copy_from_slice(events.upper());

            upper[layout.duration()] = f64::INFINITY;
        }

        let linkages = self.problem.linkage_bounds();
        let r = self.linkage_row;
        lower[r..r + linkages.len()].copy_from_slice(linkages.lower());
        upper[r..r + linkages.len()].copy_from_slice(linkages.upper());
    }

    fn initial_point(&self, x: &mut [f64]) {
        x.copy_from_slice(&self.initial);
    }

    fn objective(&self, x: &[f64]) -> Result<f64, Self::Error> {
        let mut g = vec![0.0; self.num_constraints];
        self.assemble(x, &mut g)
    }

    fn constraints(&self, x: &[f64], g: &mut [f64]) -> Result<(), Self::Error> {
        self.assemble(x, g).map(|_| ())
    }

    fn evaluate(&self, x: &[f64], g: &mut [f64]) -> Result<f64, Self::Error> {
        self.assemble(x, g)
    }

    fn first_derivatives(
        &self,
        x: &[f64],
        gradient: &mut [f64],
        jacobian: &mut DMatrix<f64>,
    ) -> Option<Result<(), Self::Error>> {
        if self.derivatives == DerivativeMethod::FiniteDifference {
            return None;
        }

        gradient.fill(0.0);
        jacobian.fill(0.0);
        let blocks = match self.element_jacobians(x) {
            Ok(blocks) => blocks,
            Err(err) => return Some(Err(err)),
        };

        for (element, block) in self.elements.iter().zip(blocks) {
            let rows = element.rows();
            for (c, &col) in element.vars().iter().enumerate() {
                for (r, &row) in rows.iter().enumerate() {
                    jacobian[(row, col)] += block[(r, c)];
                }
                gradient[col] += block[(rows.len(), c)];
            }
        }
        self.linear_terms(|row, col, coef| jacobian[(row, col)] += coef);
        Some(Ok(()))
    }

    fn hessian(
        &self,
        x: &[f64],
        obj_factor: f64,
        lambda: &[f64],
        hessian: &mut DMatrix<f64>,
    ) -> Option<Result<(), Self::Error>> {
        if self.derivatives == DerivativeMethod::FiniteDifference {
            return None;
        }

        hessian.fill(0.0);
        let blocks = match self.element_hessians(x, obj_factor, lambda) {
            Ok(blocks) => blocks,
            Err(err) => return Some(Err(err)),
        };

        for (element, block) in self.elements.iter().zip(blocks) {
            let vars = element.vars();
            for (a, &i) in vars.iter().enumerate() {
                for (b, &j) in vars.iter().enumerate() {
                    hessian[(i, j)] += block[(a, b)];
                }
            }
        }
        Some(Ok(()))
    }
}
