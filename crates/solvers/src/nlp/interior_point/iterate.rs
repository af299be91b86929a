use nalgebra::DMatrix;

/// Relative push of the starting point away from a single bound.
const PUSH_ABS: f64 = 1e-2;

/// Largest push as a fraction of the distance between two bounds.
const PUSH_FRAC: f64 = 1e-2;

/// Bound multipliers are kept within this factor of `μ / distance`.
const KAPPA_SIGMA: f64 = 1e10;

/// How the scaled problem is laid out over the primal vector `z = (x, s)`.
///
/// Equality rows read `g̃(x) - rhs = 0`. Every other row gets a slack `s`
/// with `g̃(x) - s = 0` and the row bounds moved onto the slack. Variables
/// with equal bounds are held fixed and carry no barrier terms.
pub(super) struct Layout {
    pub(super) n: usize,
    pub(super) m: usize,
    pub(super) slack_of: Vec<Option<usize>>,
    pub(super) rhs: Vec<f64>,
    pub(super) lower: Vec<f64>,
    pub(super) upper: Vec<f64>,
    pub(super) fixed: Vec<bool>,
}

impl Layout {
    /// Builds the layout, or explains why the bounds are inconsistent.
    pub(super) fn new(
        x_lower: &[f64],
        x_upper: &[f64],
        g_lower: &[f64],
        g_upper: &[f64],
    ) -> Result<Self, String> {
        let n = x_lower.len();
        let m = g_lower.len();

        let mut lower = x_lower.to_vec();
        let mut upper = x_upper.to_vec();
        let mut fixed = Vec::with_capacity(n + m);

        for (j, (&lo, &hi)) in x_lower.iter().zip(x_upper).enumerate() {
            if !(lo <= hi) || lo == f64::INFINITY || hi == f64::NEG_INFINITY {
                return Err(format!("variable {j} has bounds [{lo}, {hi}]"));
            }
            fixed.push(lo == hi);
        }

        let mut slack_of = Vec::with_capacity(m);
        let mut rhs = vec![0.0; m];
        for (i, (&lo, &hi)) in g_lower.iter().zip(g_upper).enumerate() {
            if !(lo <= hi) || lo == f64::INFINITY || hi == f64::NEG_INFINITY {
                return Err(format!("constraint {i} has bounds [{lo}, {hi}]"));
            }
            if lo == hi {
                rhs[i] = lo;
                slack_of.push(None);
            } else {
                slack_of.push(Some(lower.len()));
                lower.push(lo);
                upper.push(hi);
                fixed.push(false);
            }
        }

        Ok(Self {
            n,
            m,
            slack_of,
            rhs,
            lower,
            upper,
            fixed,
        })
    }

    /// Widens every finite bound of a non-fixed entry by `factor` times its
    /// magnitude (at least `factor`).
    ///
    /// An equality that pins a variable onto one of its bounds otherwise
    /// leaves the barrier problem without a strict interior.
    pub(super) fn relaxed(mut self, factor: f64) -> Self {
        for i in (0..self.nz()).filter(|&i| !self.fixed[i]) {
            let lo = self.lower[i];
            if lo.is_finite() {
                self.lower[i] = lo - factor * lo.abs().max(1.0);
            }
            let hi = self.upper[i];
            if hi.is_finite() {
                self.upper[i] = hi + factor * hi.abs().max(1.0);
            }
        }
        self
    }

    /// Length of the primal vector, slacks included.
    pub(super) fn nz(&self) -> usize {
        self.lower.len()
    }

    pub(super) fn has_lower(&self, i: usize) -> bool {
        !self.fixed[i] && self.lower[i].is_finite()
    }

    pub(super) fn has_upper(&self, i: usize) -> bool {
        !self.fixed[i] && self.upper[i].is_finite()
    }

    /// Moves `value` strictly inside the bounds of entry `i`.
    pub(super) fn push_inside(&self, i: usize, value: f64) -> f64 {
        let (lo, hi) = (self.lower[i], self.upper[i]);
        if self.fixed[i] {
            return lo;
        }
        let gap = hi - lo;
        let mut value = value;
        if lo.is_finite() {
            let push = (PUSH_ABS * lo.abs().max(1.0)).min(PUSH_FRAC * gap);
            value = value.max(lo + push);
        }
        if hi.is_finite() {
            let push = (PUSH_ABS * hi.abs().max(1.0)).min(PUSH_FRAC * gap);
            value = value.min(hi - push);
        }
        value
    }

    /// Writes the equality residual `c(z)` given scaled constraint values.
    pub(super) fn residual(&self, z: &[f64], g: &[f64], c: &mut [f64]) {
        for (i, ci) in c.iter_mut().enumerate() {
            *ci = match self.slack_of[i] {
                Some(k) => g[i] - z[k],
                None => g[i] - self.rhs[i],
            };
        }
    }

    /// Returns `J_z dz` where `J_z = [J̃, -I_slack]`.
    pub(super) fn jacobian_times(&self, jacobian: &DMatrix<f64>, dz: &[f64]) -> Vec<f64> {
        (0..self.m)
            .map(|i| {
                let row: f64 = (0..self.n)
                    .filter(|&j| !self.fixed[j])
                    .map(|j| jacobian[(i, j)] * dz[j])
                    .sum();
                match self.slack_of[i] {
                    Some(k) => row - dz[k],
                    None => row,
                }
            })
            .collect()
    }

    /// Returns `J_zᵀ y`.
    pub(super) fn jacobian_transpose_times(&self, jacobian: &DMatrix<f64>, y: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.nz()];
        for j in 0..self.n {
            out[j] = (0..self.m).map(|i| jacobian[(i, j)] * y[i]).sum();
        }
        for (i, slack) in self.slack_of.iter().enumerate() {
            if let Some(k) = slack {
                out[*k] = -y[i];
            }
        }
        out
    }

    /// Log-barrier value, or infinity outside the bounds.
    pub(super) fn barrier(&self, z: &[f64], mu: f64) -> f64 {
        let mut total = 0.0;
        for i in 0..self.nz() {
            if self.has_lower(i) {
                let d = z[i] - self.lower[i];
                if d <= 0.0 {
                    return f64::INFINITY;
                }
                total -= mu * d.ln();
            }
            if self.has_upper(i) {
                let d = self.upper[i] - z[i];
                if d <= 0.0 {
                    return f64::INFINITY;
                }
                total -= mu * d.ln();
            }
        }
        total
    }

    /// Largest step in `[0, 1]` keeping `z + α dz` a fraction `τ` inside
    /// the bounds.
    pub(super) fn max_step(&self, z: &[f64], dz: &[f64], tau: f64) -> f64 {
        let mut alpha = 1.0_f64;
        for i in 0..self.nz() {
            if self.has_lower(i) && dz[i] < 0.0 {
                alpha = alpha.min(-tau * (z[i] - self.lower[i]) / dz[i]);
            }
            if self.has_upper(i) && dz[i] > 0.0 {
                alpha = alpha.min(tau * (self.upper[i] - z[i]) / dz[i]);
            }
        }
        alpha
    }
}

/// The primal-dual iterate.
#[derive(Clone)]
pub(super) struct Iterate {
    pub(super) z: Vec<f64>,
    pub(super) y: Vec<f64>,
    pub(super) zl: Vec<f64>,
    pub(super) zu: Vec<f64>,
}

/// Changes to the bound multipliers implied by a primal step.
pub(super) struct BoundStep {
    pub(super) dzl: Vec<f64>,
    pub(super) dzu: Vec<f64>,
}

impl Iterate {
    /// Starts from `x` and scaled constraint values `g`, with zero constraint
    /// multipliers and unit bound multipliers.
    pub(super) fn start(layout: &Layout, x: &[f64], g: &[f64]) -> Self {
        let mut z: Vec<f64> = x.to_vec();
        z.resize(layout.nz(), 0.0);
        for (i, slack) in layout.slack_of.iter().enumerate() {
            if let Some(k) = slack {
                z[*k] = layout.push_inside(*k, g[i]);
            }
        }

        let nz = layout.nz();
        let unit_if = |present: bool| if present { 1.0 } else { 0.0 };
        Self {
            z,
            y: vec![0.0; layout.m],
            zl: (0..nz).map(|i| unit_if(layout.has_lower(i))).collect(),
            zu: (0..nz).map(|i| unit_if(layout.has_upper(i))).collect(),
        }
    }

    /// Barrier Hessian diagonal `Σ = Z_L / (z - l) + Z_U / (u - z)`.
    pub(super) fn sigma(&self, layout: &Layout) -> Vec<f64> {
        (0..layout.nz())
            .map(|i| {
                let mut s = 0.0;
                if layout.has_lower(i) {
                    s += self.zl[i] / (self.z[i] - layout.lower[i]);
                }
                if layout.has_upper(i) {
                    s += self.zu[i] / (layout.upper[i] - self.z[i]);
                }
                s
            })
            .collect()
    }

    /// Gradient of the log-barrier term.
    pub(super) fn barrier_gradient(&self, layout: &Layout, mu: f64) -> Vec<f64> {
        (0..layout.nz())
            .map(|i| {
                let mut g = 0.0;
                if layout.has_lower(i) {
                    g -= mu / (self.z[i] - layout.lower[i]);
                }
                if layout.has_upper(i) {
                    g += mu / (layout.upper[i] - self.z[i]);
                }
                g
            })
            .collect()
    }

    /// Lagrangian gradient `∇f̃ + J_zᵀy - z_L + z_U`, zero on fixed entries.
    pub(super) fn dual_residual(
        &self,
        layout: &Layout,
        gradient: &[f64],
        jacobian: &DMatrix<f64>,
    ) -> Vec<f64> {
        let mut r = layout.jacobian_transpose_times(jacobian, &self.y);
        for (i, ri) in r.iter_mut().enumerate() {
            if layout.fixed[i] {
                *ri = 0.0;
                continue;
            }
            if i < layout.n {
                *ri += gradient[i];
            }
            *ri += self.zu[i] - self.zl[i];
        }
        r
    }

    /// Largest deviation of the bound complementarity products from `mu`.
    pub(super) fn complementarity(&self, layout: &Layout, mu: f64) -> f64 {
        let mut worst = 0.0_f64;
        for i in 0..layout.nz() {
            if layout.has_lower(i) {
                worst = worst.max(((self.z[i] - layout.lower[i]) * self.zl[i] - mu).abs());
            }
            if layout.has_upper(i) {
                worst = worst.max(((layout.upper[i] - self.z[i]) * self.zu[i] - mu).abs());
            }
        }
        worst
    }

    /// Bound multiplier steps for the primal direction `dz`.
    pub(super) fn bound_step(&self, layout: &Layout, dz: &[f64], mu: f64) -> BoundStep {
        let nz = layout.nz();
        let mut dzl = vec![0.0; nz];
        let mut dzu = vec![0.0; nz];
        for i in 0..nz {
            if layout.has_lower(i) {
                let d = self.z[i] - layout.lower[i];
                dzl[i] = mu / d - self.zl[i] - self.zl[i] / d * dz[i];
            }
            if layout.has_upper(i) {
                let d = layout.upper[i] - self.z[i];
                dzu[i] = mu / d - self.zu[i] + self.zu[i] / d * dz[i];
            }
        }
        BoundStep { dzl, dzu }
    }

    /// Largest dual step keeping the bound multipliers a fraction `τ` positive.
    pub(super) fn max_dual_step(&self, step: &BoundStep, tau: f64) -> f64 {
        let mut alpha = 1.0_f64;
        let pairs = self
            .zl
            .iter()
            .zip(&step.dzl)
            .chain(self.zu.iter().zip(&step.dzu));
        for (v, dv) in pairs {
            if *dv < 0.0 && *v > 0.0 {
                alpha = alpha.min(-tau * v / dv);
            }
        }
        alpha
    }

    /// Applies a bound multiplier step and keeps each multiplier within
    /// `[μ / (κ d), κ μ / d]` of its bound distance `d`.
    pub(super) fn apply_bound_step(&mut self, layout: &Layout, step: &BoundStep, alpha: f64, mu: f64) {
        for i in 0..layout.nz() {
            if layout.has_lower(i) {
                let d = self.z[i] - layout.lower[i];
                let v = self.zl[i] + alpha * step.dzl[i];
                self.zl[i] = v.clamp(mu / (KAPPA_SIGMA * d), KAPPA_SIGMA * mu / d);
            }
            if layout.has_upper(i) {
                let d = layout.upper[i] - self.z[i];
                let v = self.zu[i] + alpha * step.dzu[i];
                self.zu[i] = v.clamp(mu / (KAPPA_SIGMA * d), KAPPA_SIGMA * mu / d);
            }
        }
    }

    /// One-norms of `y`, `z_L` and `z_U` combined.
    pub(super) fn multiplier_norms(&self) -> (f64, f64) {
        let y: f64 = self.y.iter().map(|v| v.abs()).sum();
        let bounds: f64 = self.zl.iter().chain(&self.zu).map(|v| v.abs()).sum();
        (y, bounds)
    }
}
