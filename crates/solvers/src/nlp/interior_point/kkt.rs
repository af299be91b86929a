use nalgebra::{DMatrix, DVector, Dyn, linalg::LU};

use super::iterate::Layout;

/// Regularization beyond which the system is declared singular.
const MAX_DELTA_W: f64 = 1e40;

/// A factored primal-dual system
///
/// ```text
/// [ W + Σ + δw I    J_zᵀ  ] [dz]   [r_z]
/// [ J_z           -δc I   ] [dy] = [r_y]
/// ```
///
/// Fixed variables get identity rows so their step is zero.
pub(super) struct Kkt {
    lu: LU<f64, Dyn, Dyn>,
    nz: usize,
    m: usize,
}

impl Kkt {
    pub(super) fn factor(
        layout: &Layout,
        hessian: &DMatrix<f64>,
        jacobian: &DMatrix<f64>,
        sigma: &[f64],
        delta_w: f64,
        delta_c: f64,
    ) -> Self {
        let n = layout.n;
        let nz = layout.nz();
        let m = layout.m;
        let free = |j: usize| !layout.fixed[j];

        let mut k = DMatrix::zeros(nz + m, nz + m);
        for i in (0..n).filter(|&i| free(i)) {
            for j in (0..n).filter(|&j| free(j)) {
                k[(i, j)] = hessian[(i, j)];
            }
        }
        for i in 0..nz {
            if free(i) {
                k[(i, i)] += sigma[i] + delta_w;
            } else {
                k[(i, i)] = 1.0;
            }
        }
        for r in 0..m {
            let row = nz + r;
            for j in (0..n).filter(|&j| free(j)) {
                let v = jacobian[(r, j)];
                k[(row, j)] = v;
                k[(j, row)] = v;
            }
            if let Some(s) = layout.slack_of[r] {
                k[(row, s)] = -1.0;
                k[(s, row)] = -1.0;
            }
            k[(row, row)] = -delta_c;
        }

        Self { lu: k.lu(), nz, m }
    }

    /// Solves for `(dz, dy)`, or `None` if the factorization is singular or
    /// produces non-finite values.
    pub(super) fn solve(&self, r_z: &[f64], r_y: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
        let rhs = DVector::from_iterator(self.nz + self.m, r_z.iter().chain(r_y).copied());
        let sol = self.lu.solve(&rhs)?;
        if sol.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let dz = sol.rows(0, self.nz).iter().copied().collect();
        let dy = sol.rows(self.nz, self.m).iter().copied().collect();
        Some((dz, dy))
    }
}

/// Tracks the Hessian regularization between iterations.
///
/// Each iteration first tries `δw = 0`. On failure the first positive value
/// is a third of the last successful one (or `1e-4` if none), and later
/// increases multiply by 8 (or 100 when no history exists).
#[derive(Debug, Default)]
pub(super) struct Regularization {
    last: f64,
}

impl Regularization {
    /// Next `δw` after `current` failed, or `None` once the limit is passed.
    pub(super) fn increase(&self, current: f64) -> Option<f64> {
        let next = if current == 0.0 {
            if self.last == 0.0 {
                1e-4
            } else {
                (self.last / 3.0).max(1e-20)
            }
        } else if self.last == 0.0 {
            current * 100.0
        } else {
            current * 8.0
        };
        (next <= MAX_DELTA_W).then_some(next)
    }

    /// Records the `δw` that produced an accepted direction.
    pub(super) fn record(&mut self, used: f64) {
        if used > 0.0 {
            self.last = used;
        }
    }
}
