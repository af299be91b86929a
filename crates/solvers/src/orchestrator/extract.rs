use nalgebra::DMatrix;
use vela_core::{Callbacks, NodePoint};

use crate::{
    nlp::interior_point,
    transcription::{PhaseLayout, Transcription, TranscriptionError, time_at},
};

use super::{Error, PhaseSolution, Solution};

/// Reads per-phase trajectories, costates and Hamiltonians off an engine
/// result.
///
/// With the NLP Lagrangian `f + μᵀg`, the costate at node `a` of a segment is
/// `λ_a = −μ_a / w_a`, where `μ_a` are the defect multipliers of that node and
/// `w_a` its LGL quadrature weight. The two copies of a knot shared by
/// adjacent segments both get the weight-averaged estimate
/// `−(μ_a + μ_b) / (w_a + w_b)`. The Hamiltonian is `L + λᵀf`.
pub(super) fn extract<C: Callbacks>(
    nlp: &Transcription<'_, C>,
    callbacks: &C,
    result: interior_point::Solution,
) -> Result<Solution, Error> {
    let phases = nlp
        .layouts()
        .iter()
        .enumerate()
        .map(|(phase, layout)| extract_phase(phase, layout, callbacks, &result))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Solution {
        status: result.status.into(),
        objective: result.objective,
        iterations: result.iters,
        phases,
        decision: result.x,
        multipliers: result.multipliers,
    })
}

fn extract_phase<C: Callbacks>(
    phase: usize,
    layout: &PhaseLayout,
    callbacks: &C,
    result: &interior_point::Solution,
) -> Result<PhaseSolution, Error> {
    let x = &result.x;
    let dims = layout.dims();
    let (ns, nu) = (dims.states, dims.controls);
    let count = layout.num_nodes();
    let (t0, tf) = (x[layout.t0()], x[layout.tf()]);
    let parameters = &x[layout.parameters()..layout.parameters() + dims.parameters];

    let mut time = Vec::with_capacity(count);
    let mut states = DMatrix::zeros(ns, count);
    let mut controls = DMatrix::zeros(nu, count);
    let mut costates = DMatrix::zeros(ns, count);
    let mut hamiltonian = Vec::with_capacity(count);

    let segments = layout.mesh().segments();
    for (k, (s, a)) in layout.mesh().nodes().enumerate() {
        let weight = segments[s].rule().weights()[a];
        let defect = layout.defect(k);
        for i in 0..ns {
            costates[(i, k)] = -result.multipliers[defect + i] / weight;
        }
    }
    for pair in segments.windows(2) {
        let (before, after) = (&pair[0], &pair[1]);
        let k = after.first_node();
        let w_before = before.rule().weights()[before.len() - 1];
        let w_after = after.rule().weights()[0];
        for i in 0..ns {
            let shared = (w_before * costates[(i, k - 1)] + w_after * costates[(i, k)])
                / (w_before + w_after);
            costates[(i, k - 1)] = shared;
            costates[(i, k)] = shared;
        }
    }

    for (k, (s, a)) in layout.mesh().nodes().enumerate() {
        let segment = &segments[s];
        let point = NodePoint {
            phase,
            states: &x[layout.state(k)..layout.state(k) + ns],
            controls: &x[layout.control(k)..layout.control(k) + nu],
            parameters,
            time: time_at(segment.fraction(a), t0, tf),
        };
        let lambda: Vec<f64> = costates.column(k).iter().copied().collect();

        let dae = callbacks
            .dynamics(&point)
            .map_err(TranscriptionError::Callback)?;
        if dae.derivatives.len() != ns {
            return Err(Error::CallbackContractViolation {
                callback: "dynamics",
                phase: Some(phase),
                expected: ns,
                actual: dae.derivatives.len(),
            });
        }
        let running = callbacks
            .integrand_cost(&point)
            .map_err(TranscriptionError::Callback)?;

        time.push(point.time);
        states.column_mut(k).copy_from_slice(point.states);
        controls.column_mut(k).copy_from_slice(point.controls);
        let work: f64 = lambda.iter().zip(&dae.derivatives).map(|(l, f)| l * f).sum();
        hamiltonian.push(running + work);
    }

    Ok(PhaseSolution {
        time,
        states,
        controls,
        parameters: parameters.to_vec(),
        costates,
        hamiltonian,
    })
}
