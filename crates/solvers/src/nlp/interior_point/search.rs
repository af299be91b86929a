use nalgebra::DMatrix;
use tracing::{debug, trace};
use vela_core::{NlpProblem, Observer};

use super::{
    Action, Config, Error, Event, Solution, Status,
    evaluator::Evaluator,
    filter::{Filter, GAMMA_PHI, GAMMA_THETA, within},
    iterate::{Iterate, Layout},
    kkt::{Kkt, Regularization},
};

const INITIAL_MU: f64 = 0.1;
const KAPPA_EPSILON: f64 = 10.0;
const KAPPA_MU: f64 = 0.2;
const THETA_MU: f64 = 1.5;
const TAU_MIN: f64 = 0.99;
const ERROR_SCALE_MAX: f64 = 100.0;
const BOUND_RELAX: f64 = 1e-8;
const MAX_BACKTRACKS: usize = 40;
const CURVATURE_FLOOR: f64 = 1e-10;

const ETA_PHI: f64 = 1e-8;
const DELTA: f64 = 1.0;
const S_THETA: f64 = 1.1;
const S_PHI: f64 = 2.3;
const GAMMA_ALPHA: f64 = 0.05;
const THETA_MAX_FACTOR: f64 = 1e4;
const THETA_MIN_FACTOR: f64 = 1e-4;
const MAX_SOC: usize = 4;
const KAPPA_SOC: f64 = 0.99;
const KAPPA_SOFT: f64 = 1e-4;

// Limits on the unscaled violations, checked alongside the tolerance.
const DUAL_INF_TOL: f64 = 1.0;
const CONSTR_VIOL_TOL: f64 = 1e-4;
const COMPL_INF_TOL: f64 = 1e-4;

/// Function values and first derivatives at the current iterate.
struct Point {
    objective: f64,
    g: Vec<f64>,
    c: Vec<f64>,
    gradient: Vec<f64>,
    jacobian: DMatrix<f64>,
}

/// Optimality measures at the current iterate.
struct Measures {
    primal: f64,
    dual: f64,
    complementarity: f64,
    error: f64,
}

/// A trial point with its filter coordinates.
struct Candidate {
    z: Vec<f64>,
    objective: f64,
    g: Vec<f64>,
    c: Vec<f64>,
    theta: f64,
    phi: f64,
}

/// An accepted primal step.
struct Step {
    z: Vec<f64>,
    objective: f64,
    g: Vec<f64>,
    alpha: f64,
}

impl Step {
    fn from_candidate(candidate: Candidate, alpha: f64) -> Self {
        Self {
            z: candidate.z,
            objective: candidate.objective,
            g: candidate.g,
            alpha,
        }
    }
}

pub(super) fn search<P, Obs>(
    problem: &P,
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, Error<P::Error>>
where
    P: NlpProblem,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let n = problem.num_variables();
    let m = problem.num_constraints();

    let mut x_lower = vec![f64::NEG_INFINITY; n];
    let mut x_upper = vec![f64::INFINITY; n];
    problem.variable_bounds(&mut x_lower, &mut x_upper);
    let mut g_lower = vec![f64::NEG_INFINITY; m];
    let mut g_upper = vec![f64::INFINITY; m];
    problem.constraint_bounds(&mut g_lower, &mut g_upper);

    let mut x = vec![0.0; n];
    problem.initial_point(&mut x);
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFinite {
            quantity: "initial point",
            iter: 0,
        });
    }

    if config.max_iters() == 0 {
        let mut g = vec![0.0; m];
        let objective = problem.evaluate(&x, &mut g).map_err(Error::Problem)?;
        return Ok(Solution {
            status: Status::MaxIters,
            x,
            objective,
            constraints: g,
            multipliers: vec![0.0; m],
            bound_multipliers: vec![0.0; n],
            iters: 0,
        });
    }

    // Variables are pushed inside their bounds before scaling is resolved.
    let x_layout = Layout::new(&x_lower, &x_upper, &[], &[])
        .map_err(Error::invalid)?
        .relaxed(BOUND_RELAX);
    for (j, xj) in x.iter_mut().enumerate() {
        *xj = x_layout.push_inside(j, *xj);
    }

    let evaluator = Evaluator::new(problem, config.scaling(), &x)?;
    for (i, scale) in evaluator.constraint_scales().iter().enumerate() {
        g_lower[i] *= scale;
        g_upper[i] *= scale;
    }
    let layout = Layout::new(&x_lower, &x_upper, &g_lower, &g_upper)
        .map_err(Error::invalid)?
        .relaxed(BOUND_RELAX);

    let mut g = vec![0.0; m];
    let objective = evaluator.values(&x, &mut g)?;
    if !objective.is_finite() || g.iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFinite {
            quantity: "function values",
            iter: 0,
        });
    }

    let mut iterate = Iterate::start(&layout, &x, &g);
    let mut point = evaluate_point(&evaluator, &layout, &iterate.z, objective, g, 0)?;

    let theta_start = l1_norm(&point.c).max(1.0);
    let theta_max = THETA_MAX_FACTOR * theta_start;
    let theta_min = THETA_MIN_FACTOR * theta_start;

    let mut mu = INITIAL_MU;
    let mu_min = config.tolerance() / 10.0;
    let mut filter = Filter::default();
    let mut regularization = Regularization::default();
    let mut force_mu_decrease = false;
    let mut last_alpha = 0.0;
    let mut last_delta_w = 0.0;

    let finish = |status: Status, iterate: &Iterate, point: &Point, iters: usize| {
        into_solution(status, &layout, &evaluator, iterate, point, iters)
    };

    let mut iter = 0;
    loop {
        let measures = measure(&layout, &iterate, &point, 0.0);

        let event = Event {
            iter,
            objective: point.objective / evaluator.objective_scale(),
            primal_infeasibility: measures.primal,
            dual_infeasibility: measures.dual,
            mu,
            alpha: last_alpha,
            regularization: last_delta_w,
            x: &iterate.z[..n],
        };
        debug!(
            iter,
            objective = event.objective,
            inf_pr = measures.primal,
            inf_du = measures.dual,
            mu,
            alpha = last_alpha,
            delta_w = last_delta_w,
            "interior point iteration"
        );
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(finish(Status::StoppedByObserver, &iterate, &point, iter));
        }

        if measures.error <= config.tolerance()
            && within_unscaled_limits(&evaluator, &point, &measures)
        {
            return Ok(finish(Status::Converged, &iterate, &point, iter));
        }
        if iter >= config.max_iters() {
            return Ok(finish(Status::MaxIters, &iterate, &point, iter));
        }

        let mut forced = std::mem::take(&mut force_mu_decrease);
        while mu > mu_min
            && (forced || measure(&layout, &iterate, &point, mu).error <= KAPPA_EPSILON * mu)
        {
            mu = mu_min.max((KAPPA_MU * mu).min(mu.powf(THETA_MU)));
            forced = false;
            filter.clear();
            trace!(mu, "barrier parameter decreased");
        }
        let tau = TAU_MIN.max(1.0 - mu);

        let mut hessian = DMatrix::zeros(n, n);
        evaluator.hessian(&iterate.z[..n], &iterate.y, &mut hessian)?;
        if hessian.iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFinite {
                quantity: "Hessian",
                iter,
            });
        }

        let sigma = iterate.sigma(&layout);
        let mut phi_gradient = iterate.barrier_gradient(&layout, mu);
        for (j, gj) in point.gradient.iter().enumerate() {
            phi_gradient[j] += gj;
        }

        let jty = layout.jacobian_transpose_times(&point.jacobian, &iterate.y);
        let r_z: Vec<f64> = (0..layout.nz())
            .map(|i| {
                if layout.fixed[i] {
                    0.0
                } else {
                    -(phi_gradient[i] + jty[i])
                }
            })
            .collect();
        let r_y: Vec<f64> = point.c.iter().map(|ci| -ci).collect();

        let mut delta_w = 0.0;
        let mut delta_c = 0.0;
        let (kkt, dz, dy, tiny) = loop {
            let kkt = Kkt::factor(
                &layout,
                &hessian,
                &point.jacobian,
                &sigma,
                delta_w,
                delta_c,
            );

            let Some((dz, dy)) = kkt.solve(&r_z, &r_y) else {
                if delta_c == 0.0 {
                    delta_c = 1e-8 * mu.powf(0.25);
                }
                delta_w = regularization
                    .increase(delta_w)
                    .ok_or(Error::Singular { iter })?;
                continue;
            };

            if is_tiny(&iterate.z, &dz) {
                break (kkt, dz, dy, true);
            }

            let dz_norm: f64 = dz.iter().map(|v| v * v).sum();
            let curvature = quadratic_form(&layout, &hessian, &sigma, &dz) + delta_w * dz_norm;
            if curvature < CURVATURE_FLOOR * dz_norm {
                delta_w = regularization
                    .increase(delta_w)
                    .ok_or(Error::Singular { iter })?;
                continue;
            }

            break (kkt, dz, dy, false);
        };
        regularization.record(delta_w);

        let alpha_max = layout.max_step(&iterate.z, &dz, tau);
        let search = LineSearch {
            z: &iterate.z,
            dz: &dz,
            c: &point.c,
            alpha_max,
            tau,
            mu,
            theta: l1_norm(&point.c),
            phi: point.objective + layout.barrier(&iterate.z, mu),
            slope: dot(&phi_gradient, &dz),
            theta_min,
            theta_max,
        };

        // A step at the roundoff level is taken whole and `μ` moves on.
        let (step, soft) = if tiny {
            force_mu_decrease = true;
            let candidate = search.trial(&evaluator, &layout, &dz, alpha_max)?;
            (Step::from_candidate(candidate, alpha_max), false)
        } else {
            let accepted = search.run(&evaluator, &layout, &mut filter, |c_soc| {
                let rhs: Vec<f64> = c_soc.iter().map(|c| -c).collect();
                kkt.solve(&r_z, &rhs).map(|(dz_soc, _)| dz_soc)
            })?;
            match accepted {
                Some(step) => (step, false),
                None => {
                    let candidate = search.trial(&evaluator, &layout, &dz, alpha_max)?;
                    (Step::from_candidate(candidate, alpha_max), true)
                }
            }
        };

        let bound_step = iterate.bound_step(&layout, &dz, mu);
        let alpha_dual = iterate.max_dual_step(&bound_step, tau);
        let mut next = iterate.clone();
        for (y, d) in next.y.iter_mut().zip(&dy) {
            *y += step.alpha * d;
        }
        next.z = step.z;
        next.apply_bound_step(&layout, &bound_step, alpha_dual, mu);

        // Without a filter step, accept the full step only if it reduces the
        // barrier problem's optimality error.
        if soft && !(step.objective.is_finite() && step.g.iter().all(|v| v.is_finite())) {
            debug!(iter, "line search failed");
            return Ok(finish(Status::Failed, &iterate, &point, iter));
        }
        let next_point = evaluate_point(
            &evaluator,
            &layout,
            &next.z,
            step.objective,
            step.g,
            iter + 1,
        )?;
        if soft {
            let before = measure(&layout, &iterate, &point, mu).error;
            let after = measure(&layout, &next, &next_point, mu).error;
            let improved = after <= (1.0 - KAPPA_SOFT) * before;
            if !improved {
                debug!(iter, "line search failed");
                return Ok(finish(Status::Failed, &iterate, &point, iter));
            }
            trace!(iter, "soft restoration step accepted");
        }

        iter += 1;
        iterate = next;
        point = next_point;
        last_alpha = step.alpha;
        last_delta_w = delta_w;
    }
}

/// Backtracking filter line search on the barrier objective `φ` and the
/// constraint violation `θ = ‖c‖₁`.
///
/// A trial is accepted when it sufficiently reduces `θ` or `φ` and is not
/// blocked by the filter. Near feasibility, directions that promise enough
/// decrease in `φ` must instead satisfy an Armijo condition on `φ` alone.
/// When the first trial increases `θ`, up to four second-order corrections
/// are tried before backtracking.
struct LineSearch<'a> {
    z: &'a [f64],
    dz: &'a [f64],
    c: &'a [f64],
    alpha_max: f64,
    tau: f64,
    mu: f64,
    theta: f64,
    phi: f64,
    slope: f64,
    theta_min: f64,
    theta_max: f64,
}

impl LineSearch<'_> {
    fn run<P, S>(
        &self,
        evaluator: &Evaluator<'_, P>,
        layout: &Layout,
        filter: &mut Filter,
        mut correction: S,
    ) -> Result<Option<Step>, Error<P::Error>>
    where
        P: NlpProblem,
        S: FnMut(&[f64]) -> Option<Vec<f64>>,
    {
        let alpha_min = self.alpha_min();
        let mut alpha = self.alpha_max;
        for trial in 0..MAX_BACKTRACKS {
            if alpha < alpha_min {
                break;
            }

            let candidate = self.trial(evaluator, layout, self.dz, alpha)?;
            if let Some(armijo) = self.acceptable(&candidate, alpha, filter) {
                return Ok(Some(self.accept(candidate, alpha, armijo, filter)));
            }

            if trial == 0 && candidate.theta >= self.theta {
                let mut trial_theta = candidate.theta;
                let mut theta_old = f64::INFINITY;
                let mut c_soc: Vec<f64> = self
                    .c
                    .iter()
                    .zip(&candidate.c)
                    .map(|(c, ct)| alpha * c + ct)
                    .collect();
                for _ in 0..MAX_SOC {
                    if trial_theta > KAPPA_SOC * theta_old {
                        break;
                    }
                    theta_old = trial_theta;
                    let Some(dz_soc) = correction(&c_soc) else {
                        break;
                    };
                    let alpha_soc = layout.max_step(self.z, &dz_soc, self.tau);
                    let soc = self.trial(evaluator, layout, &dz_soc, alpha_soc)?;
                    if let Some(armijo) = self.acceptable(&soc, alpha_soc, filter) {
                        trace!(alpha, "second-order correction accepted");
                        return Ok(Some(self.accept(soc, alpha, armijo, filter)));
                    }
                    trial_theta = soc.theta;
                    c_soc = c_soc
                        .iter()
                        .zip(&soc.c)
                        .map(|(cs, ct)| alpha_soc * cs + ct)
                        .collect();
                }
            }

            alpha *= 0.5;
        }

        Ok(None)
    }

    /// Evaluates `z + α d`.
    fn trial<P: NlpProblem>(
        &self,
        evaluator: &Evaluator<'_, P>,
        layout: &Layout,
        d: &[f64],
        alpha: f64,
    ) -> Result<Candidate, Error<P::Error>> {
        let z: Vec<f64> = self.z.iter().zip(d).map(|(zi, di)| zi + alpha * di).collect();
        let mut g = vec![0.0; layout.m];
        let objective = evaluator.values(&z[..layout.n], &mut g)?;
        let mut c = vec![0.0; layout.m];
        layout.residual(&z, &g, &mut c);

        let (theta, phi) = if objective.is_finite() && g.iter().all(|v| v.is_finite()) {
            (l1_norm(&c), objective + layout.barrier(&z, self.mu))
        } else {
            (f64::INFINITY, f64::INFINITY)
        };
        Ok(Candidate {
            z,
            objective,
            g,
            c,
            theta,
            phi,
        })
    }

    /// Whether the step promises enough decrease in `φ` to be judged on `φ`
    /// alone.
    fn switching(&self, alpha: f64) -> bool {
        self.slope < 0.0
            && self.theta <= self.theta_min
            && alpha * (-self.slope).powf(S_PHI) > DELTA * self.theta.powf(S_THETA)
    }

    /// Returns `Some(armijo)` if the candidate is acceptable, where `armijo`
    /// tells whether it was accepted on the Armijo condition.
    fn acceptable(&self, candidate: &Candidate, alpha: f64, filter: &Filter) -> Option<bool> {
        let (theta, phi) = (candidate.theta, candidate.phi);
        if !theta.is_finite() || !phi.is_finite() || theta > self.theta_max {
            return None;
        }

        let armijo = self.switching(alpha);
        let decreased = if armijo {
            within(phi, self.phi + ETA_PHI * alpha * self.slope, self.phi)
        } else {
            within(theta, (1.0 - GAMMA_THETA) * self.theta, self.theta)
                || within(phi, self.phi - GAMMA_PHI * self.theta, self.phi)
        };
        (decreased && filter.accepts(theta, phi)).then_some(armijo)
    }

    fn accept(&self, candidate: Candidate, alpha: f64, armijo: bool, filter: &mut Filter) -> Step {
        if !armijo {
            filter.add(self.theta, self.phi);
        }
        Step::from_candidate(candidate, alpha)
    }

    /// Step length below which the search gives up.
    fn alpha_min(&self) -> f64 {
        let mut alpha = GAMMA_THETA;
        if self.slope < 0.0 {
            alpha = alpha.min(GAMMA_PHI * self.theta / -self.slope);
            if self.theta <= self.theta_min {
                alpha = alpha.min(DELTA * self.theta.powf(S_THETA) / (-self.slope).powf(S_PHI));
            }
        }
        GAMMA_ALPHA * alpha
    }
}

/// Completes a [`Point`] at an accepted iterate.
fn evaluate_point<P: NlpProblem>(
    evaluator: &Evaluator<'_, P>,
    layout: &Layout,
    z: &[f64],
    objective: f64,
    g: Vec<f64>,
    iter: usize,
) -> Result<Point, Error<P::Error>> {
    if !objective.is_finite() || g.iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFinite {
            quantity: "function values",
            iter,
        });
    }

    let mut c = vec![0.0; layout.m];
    layout.residual(z, &g, &mut c);

    let mut gradient = vec![0.0; layout.n];
    let mut jacobian = DMatrix::zeros(layout.m, layout.n);
    evaluator.first_derivatives(&z[..layout.n], &mut gradient, &mut jacobian)?;
    if gradient.iter().chain(jacobian.iter()).any(|v| !v.is_finite()) {
        return Err(Error::NonFinite {
            quantity: "first derivatives",
            iter,
        });
    }

    Ok(Point {
        objective,
        g,
        c,
        gradient,
        jacobian,
    })
}

/// Scaled optimality error for barrier parameter `mu`.
fn measure(layout: &Layout, iterate: &Iterate, point: &Point, mu: f64) -> Measures {
    let dual = iterate
        .dual_residual(layout, &point.gradient, &point.jacobian)
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let primal = point.c.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let complementarity = iterate.complementarity(layout, mu);

    let nz = layout.nz();
    let (y_norm, bound_norm) = iterate.multiplier_norms();
    let s_d = ERROR_SCALE_MAX
        .max((y_norm + bound_norm) / (layout.m + 2 * nz).max(1) as f64)
        / ERROR_SCALE_MAX;
    let s_c = ERROR_SCALE_MAX.max(bound_norm / (2 * nz).max(1) as f64) / ERROR_SCALE_MAX;

    Measures {
        primal,
        dual,
        complementarity,
        error: (dual / s_d).max(primal).max(complementarity / s_c),
    }
}

/// Whether the violations in the problem's own units are also small.
///
/// Large multipliers inflate the error scaling, so the scaled error alone
/// can fall below the tolerance far from a solution.
fn within_unscaled_limits<P: NlpProblem>(
    evaluator: &Evaluator<'_, P>,
    point: &Point,
    measures: &Measures,
) -> bool {
    let sf = evaluator.objective_scale();
    let primal = point
        .c
        .iter()
        .zip(evaluator.constraint_scales())
        .fold(0.0_f64, |acc, (c, s)| acc.max((c / s).abs()));
    measures.dual / sf <= DUAL_INF_TOL
        && primal <= CONSTR_VIOL_TOL
        && measures.complementarity / sf <= COMPL_INF_TOL
}

fn is_tiny(z: &[f64], dz: &[f64]) -> bool {
    z.iter()
        .zip(dz)
        .all(|(zi, di)| di.abs() <= 10.0 * f64::EPSILON * (1.0 + zi.abs()))
}

/// `dzᵀ (W + Σ) dz` over free entries.
fn quadratic_form(layout: &Layout, hessian: &DMatrix<f64>, sigma: &[f64], dz: &[f64]) -> f64 {
    let n = layout.n;
    let mut total = 0.0;
    for i in (0..n).filter(|&i| !layout.fixed[i]) {
        for j in (0..n).filter(|&j| !layout.fixed[j]) {
            total += dz[i] * hessian[(i, j)] * dz[j];
        }
    }
    for i in (0..layout.nz()).filter(|&i| !layout.fixed[i]) {
        total += sigma[i] * dz[i] * dz[i];
    }
    total
}

fn l1_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x.abs()).sum()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Converts the scaled iterate back into the problem's units.
fn into_solution<P: NlpProblem>(
    status: Status,
    layout: &Layout,
    evaluator: &Evaluator<'_, P>,
    iterate: &Iterate,
    point: &Point,
    iters: usize,
) -> Solution {
    let n = layout.n;
    let sf = evaluator.objective_scale();
    let scales = evaluator.constraint_scales();

    let jty = layout.jacobian_transpose_times(&point.jacobian, &iterate.y);
    let bound_multipliers = (0..n)
        .map(|j| {
            if layout.fixed[j] {
                -(point.gradient[j] + jty[j]) / sf
            } else {
                (iterate.zu[j] - iterate.zl[j]) / sf
            }
        })
        .collect();

    Solution {
        status,
        x: iterate.z[..n].to_vec(),
        objective: point.objective / sf,
        constraints: point.g.iter().zip(scales).map(|(g, s)| g / s).collect(),
        multipliers: iterate
            .y
            .iter()
            .zip(scales)
            .map(|(y, s)| y * s / sf)
            .collect(),
        bound_multipliers,
        iters,
    }
}
