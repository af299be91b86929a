use std::{panic, thread};

use nalgebra::DMatrix;
use vela_core::{Boundary, Callbacks, Dimensions, NodePoint};

use crate::fd;

use super::{
    Transcription, TranscriptionError,
    layout::{PhaseLayout, time_at},
};

/// A piece of the transcribed problem that depends on a few variables.
///
/// Each element reads `vars`, writes one value per entry of `rows` and may
/// add a term to the objective.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    kind: Kind,
    vars: Vec<usize>,
    rows: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    /// Dynamics, path constraints and running cost at one collocation node.
    Node {
        phase: usize,
        segment: usize,
        local: usize,
    },
    /// Events and endpoint cost of one phase.
    Boundary { phase: usize },
    /// Inter-phase linkages.
    Linkage,
}

impl Element {
    /// Lists every element of the problem in evaluation order.
    pub(crate) fn build(
        layouts: &[PhaseLayout],
        linkage_row: usize,
        num_linkages: usize,
    ) -> Vec<Self> {
        let mut elements = Vec::new();

        for (phase, layout) in layouts.iter().enumerate() {
            let dims = layout.dims();
            let shared = layout.parameters()..layout.tf() + 1;

            for (k, (segment, local)) in layout.mesh().nodes().enumerate() {
                let state = layout.state(k);
                elements.push(Self {
                    kind: Kind::Node {
                        phase,
                        segment,
                        local,
                    },
                    vars: (state..state + dims.states + dims.controls)
                        .chain(shared.clone())
                        .collect(),
                    rows: (layout.defect(k)..layout.defect(k) + dims.states)
                        .chain(layout.path(k)..layout.path(k) + dims.path)
                        .collect(),
                });
            }

            elements.push(Self {
                kind: Kind::Boundary { phase },
                vars: layout.boundary_variables(),
                rows: (layout.events()..layout.events() + dims.events).collect(),
            });
        }

        if num_linkages > 0 {
            elements.push(Self {
                kind: Kind::Linkage,
                vars: layouts
                    .iter()
                    .flat_map(PhaseLayout::boundary_variables)
                    .collect(),
                rows: (linkage_row..linkage_row + num_linkages).collect(),
            });
        }

        elements
    }

    pub(crate) fn vars(&self) -> &[usize] {
        &self.vars
    }

    pub(crate) fn rows(&self) -> &[usize] {
        &self.rows
    }

    fn gather(&self, x: &[f64]) -> Vec<f64> {
        self.vars.iter().map(|&j| x[j]).collect()
    }
}

/// Result type of element evaluations.
type Eval<T, C> = Result<T, TranscriptionError<<C as Callbacks>::Error>>;

impl<C: Callbacks> Transcription<'_, C> {
    /// Evaluates one element at its local variables.
    ///
    /// Writes the row values into `out` and returns the objective term.
    fn eval(&self, element: &Element, local: &[f64], out: &mut [f64]) -> Eval<f64, C> {
        let callbacks = self.callbacks;
        match element.kind {
            Kind::Node {
                phase,
                segment,
                local: a,
            } => {
                let layout = &self.layouts[phase];
                let dims = layout.dims();
                let (states, rest) = local.split_at(dims.states);
                let (controls, rest) = rest.split_at(dims.controls);
                let (parameters, times) = rest.split_at(dims.parameters);
                let (t0, tf) = (times[0], times[1]);

                let seg = &layout.mesh().segments()[segment];
                let point = NodePoint {
                    phase,
                    states,
                    controls,
                    parameters,
                    time: time_at(seg.fraction(a), t0, tf),
                };

                let dae = callbacks
                    .dynamics(&point)
                    .map_err(TranscriptionError::Callback)?;
                check::<C>("dynamics", Some(phase), dims.states, dae.derivatives.len())?;
                check::<C>("path", Some(phase), dims.path, dae.path.len())?;

                let scale = (tf - t0) * seg.half_width();
                let (defects, path) = out.split_at_mut(dims.states);
                for (d, f) in defects.iter_mut().zip(&dae.derivatives) {
                    *d = -scale * f;
                }
                path.copy_from_slice(&dae.path);

                let cost = callbacks
                    .integrand_cost(&point)
                    .map_err(TranscriptionError::Callback)?;
                Ok(scale * seg.rule().weights()[a] * cost)
            }

            Kind::Boundary { phase } => {
                let ends = boundary(phase, self.layouts[phase].dims(), local);
                let events = callbacks
                    .events(&ends)
                    .map_err(TranscriptionError::Callback)?;
                check::<C>("events", Some(phase), out.len(), events.len())?;
                out.copy_from_slice(&events);

                callbacks
                    .endpoint_cost(&ends)
                    .map_err(TranscriptionError::Callback)
            }

            Kind::Linkage => {
                let mut boundaries = Vec::with_capacity(self.layouts.len());
                let mut rest = local;
                for (phase, layout) in self.layouts.iter().enumerate() {
                    let dims = layout.dims();
                    let (chunk, tail) = rest.split_at(2 * dims.states + dims.parameters + 2);
                    boundaries.push(boundary(phase, dims, chunk));
                    rest = tail;
                }

                let residuals = callbacks
                    .linkages(&boundaries)
                    .map_err(TranscriptionError::Callback)?;
                check::<C>("linkages", None, out.len(), residuals.len())?;
                out.copy_from_slice(&residuals);
                Ok(0.0)
            }
        }
    }

    /// Evaluates every element at `x`.
    ///
    /// Returns the objective contributions and row values of each element.
    pub(crate) fn element_values(&self, x: &[f64]) -> Eval<Vec<(f64, Vec<f64>)>, C> {
        self.map_elements(|element| {
            let mut out = vec![0.0; element.rows.len()];
            let objective = self.eval(element, &element.gather(x), &mut out)?;
            Ok((objective, out))
        })
    }

    /// Differentiates every element at `x`.
    ///
    /// Each matrix has one row per element row plus a final objective row,
    /// and one column per element variable.
    pub(crate) fn element_jacobians(&self, x: &[f64]) -> Eval<Vec<DMatrix<f64>>, C> {
        self.map_elements(|element| {
            let rows = element.rows.len();
            let mut local = element.gather(x);
            let mut jacobian = DMatrix::zeros(rows + 1, local.len());
            fd::jacobian(
                &mut local,
                |v: &[f64], out: &mut [f64]| {
                    let (values, objective) = out.split_at_mut(rows);
                    self.eval(element, v, values).map(|f| objective[0] = f)
                },
                &mut jacobian,
            )?;
            Ok(jacobian)
        })
    }

    /// Hessians of `obj_factor * objective + lambdaᵀ rows` for every element
    /// at `x`, in local variable order.
    pub(crate) fn element_hessians(
        &self,
        x: &[f64],
        obj_factor: f64,
        lambda: &[f64],
    ) -> Eval<Vec<DMatrix<f64>>, C> {
        self.map_elements(|element| {
            let mut local = element.gather(x);
            let mut hessian = DMatrix::zeros(local.len(), local.len());
            let weights: Vec<f64> = element.rows.iter().map(|&r| lambda[r]).collect();
            let mut out = vec![0.0; weights.len()];
            fd::hessian(
                &mut local,
                |v: &[f64]| {
                    let objective = self.eval(element, v, &mut out);
                    objective.map(|f| {
                        obj_factor * f + out.iter().zip(&weights).map(|(o, w)| o * w).sum::<f64>()
                    })
                },
                &mut hessian,
            )?;
            Ok(hessian)
        })
    }

    /// Applies `work` to every element, in parallel when configured.
    ///
    /// Results come back in element order whatever the worker count, and the
    /// first error in that order wins.
    fn map_elements<T, F>(&self, work: F) -> Eval<Vec<T>, C>
    where
        T: Send,
        F: Fn(&Element) -> Eval<T, C> + Sync,
    {
        let count = self.elements.len();
        let workers = self.workers.clamp(1, count.max(1));
        if workers == 1 {
            return self.elements.iter().map(work).collect();
        }

        let work = &work;
        let results: Vec<Eval<T, C>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .elements
                .chunks(count.div_ceil(workers))
                .map(|chunk| scope.spawn(move || chunk.iter().map(work).collect::<Vec<_>>()))
                .collect();

            let mut results = Vec::with_capacity(count);
            for handle in handles {
                match handle.join() {
                    Ok(part) => results.extend(part),
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            results
        });
        results.into_iter().collect()
    }
}

fn check<C: Callbacks>(
    callback: &'static str,
    phase: Option<usize>,
    expected: usize,
    actual: usize,
) -> Eval<(), C> {
    if expected == actual {
        Ok(())
    } else {
        Err(TranscriptionError::Contract {
            callback,
            phase,
            expected,
            actual,
        })
    }
}

/// Splits `[x(t0), x(tf), parameters, t0, tf]` into a boundary context.
fn boundary<'a>(phase: usize, dims: &Dimensions, local: &'a [f64]) -> Boundary<'a> {
    let (initial_states, rest) = local.split_at(dims.states);
    let (final_states, rest) = rest.split_at(dims.states);
    let (parameters, times) = rest.split_at(dims.parameters);
    Boundary {
        phase,
        initial_states,
        final_states,
        parameters,
        t0: times[0],
        tf: times[1],
    }
}
