use nalgebra::DMatrix;
use vela_core::NlpProblem;

use crate::fd;

use super::{Error, Scaling};

/// Gradient norm that automatic scaling aims for.
const TARGET_GRADIENT: f64 = 100.0;

/// Smallest factor automatic scaling will apply.
const MIN_SCALE: f64 = 1e-8;

/// Evaluates a problem in scaled form and supplies derivatives.
///
/// Derivatives come from the problem's hooks when present. Otherwise first
/// derivatives use central differences of the flat functions, and the
/// Hessian differences either the first-derivative hook or the scalar
/// Lagrangian.
pub(super) struct Evaluator<'p, P> {
    problem: &'p P,
    objective_scale: f64,
    constraint_scales: Vec<f64>,
    has_first_derivatives: bool,
}

impl<'p, P: NlpProblem> Evaluator<'p, P> {
    /// Tries the derivative hooks at `x` and resolves the scaling factors.
    pub(super) fn new(problem: &'p P, scaling: &Scaling, x: &[f64]) -> Result<Self, Error<P::Error>> {
        let n = problem.num_variables();
        let m = problem.num_constraints();

        let mut gradient = vec![0.0; n];
        let mut jacobian = DMatrix::zeros(m, n);
        let provided = problem.first_derivatives(x, &mut gradient, &mut jacobian);

        let mut evaluator = Self {
            problem,
            objective_scale: 1.0,
            constraint_scales: vec![1.0; m],
            has_first_derivatives: provided.is_some(),
        };

        match scaling {
            Scaling::None => {}
            Scaling::Explicit {
                objective,
                constraints,
            } => {
                if constraints.len() != m {
                    return Err(Error::invalid(format!(
                        "{} constraint scaling factors given for {m} constraints",
                        constraints.len()
                    )));
                }
                evaluator.objective_scale = *objective;
                evaluator.constraint_scales.clone_from(constraints);
            }
            Scaling::Automatic => {
                match provided {
                    Some(result) => result.map_err(Error::Problem)?,
                    None => evaluator.raw_first_derivatives(x, &mut gradient, &mut jacobian)?,
                }
                evaluator.objective_scale = gradient_scale(gradient.iter());
                for (i, scale) in evaluator.constraint_scales.iter_mut().enumerate() {
                    *scale = gradient_scale(jacobian.row(i).iter());
                }
            }
        }

        Ok(evaluator)
    }

    pub(super) fn objective_scale(&self) -> f64 {
        self.objective_scale
    }

    pub(super) fn constraint_scales(&self) -> &[f64] {
        &self.constraint_scales
    }

    /// Returns the scaled objective and writes scaled constraints into `g`.
    pub(super) fn values(&self, x: &[f64], g: &mut [f64]) -> Result<f64, Error<P::Error>> {
        let f = self.problem.evaluate(x, g).map_err(Error::Problem)?;
        for (gi, scale) in g.iter_mut().zip(&self.constraint_scales) {
            *gi *= scale;
        }
        Ok(f * self.objective_scale)
    }

    /// Writes the scaled objective gradient and constraint Jacobian.
    pub(super) fn first_derivatives(
        &self,
        x: &[f64],
        gradient: &mut [f64],
        jacobian: &mut DMatrix<f64>,
    ) -> Result<(), Error<P::Error>> {
        self.raw_first_derivatives(x, gradient, jacobian)?;
        for gj in gradient.iter_mut() {
            *gj *= self.objective_scale;
        }
        for (i, scale) in self.constraint_scales.iter().enumerate() {
            jacobian.row_mut(i).scale_mut(*scale);
        }
        Ok(())
    }

    /// Writes the Hessian of the scaled Lagrangian `f̃ + yᵀg̃`.
    pub(super) fn hessian(
        &self,
        x: &[f64],
        y: &[f64],
        hessian: &mut DMatrix<f64>,
    ) -> Result<(), Error<P::Error>> {
        let lambda: Vec<f64> = y
            .iter()
            .zip(&self.constraint_scales)
            .map(|(yi, scale)| yi * scale)
            .collect();
        let sigma = self.objective_scale;

        if let Some(result) = self.problem.hessian(x, sigma, &lambda, hessian) {
            return result.map_err(Error::Problem);
        }

        let n = x.len();
        let m = lambda.len();
        let mut point = x.to_vec();

        if self.has_first_derivatives {
            let mut gradient = vec![0.0; n];
            let mut jacobian = DMatrix::zeros(m, n);
            fd::jacobian(
                &mut point,
                |x: &[f64], out: &mut [f64]| {
                    self.problem
                        .first_derivatives(x, &mut gradient, &mut jacobian)
                        .unwrap_or(Ok(()))?;
                    for (j, oj) in out.iter_mut().enumerate() {
                        *oj = sigma * gradient[j]
                            + (0..m).map(|i| jacobian[(i, j)] * lambda[i]).sum::<f64>();
                    }
                    Ok(())
                },
                hessian,
            )
            .map_err(Error::Problem)?;
            symmetrize(hessian);
        } else {
            let mut g = vec![0.0; m];
            fd::hessian(
                &mut point,
                |x: &[f64]| {
                    let f = self.problem.evaluate(x, &mut g)?;
                    Ok(sigma * f + g.iter().zip(&lambda).map(|(gi, li)| gi * li).sum::<f64>())
                },
                hessian,
            )
            .map_err(Error::Problem)?;
        }
        Ok(())
    }

    /// Unscaled first derivatives from the hook or central differences.
    fn raw_first_derivatives(
        &self,
        x: &[f64],
        gradient: &mut [f64],
        jacobian: &mut DMatrix<f64>,
    ) -> Result<(), Error<P::Error>> {
        if let Some(result) = self.problem.first_derivatives(x, gradient, jacobian) {
            return result.map_err(Error::Problem);
        }

        let mut point = x.to_vec();
        fd::gradient(&mut point, |x: &[f64]| self.problem.objective(x), gradient)
            .map_err(Error::Problem)?;
        if jacobian.nrows() > 0 {
            fd::jacobian(
                &mut point,
                |x: &[f64], g: &mut [f64]| self.problem.constraints(x, g),
                jacobian,
            )
            .map_err(Error::Problem)?;
        }
        Ok(())
    }
}

fn gradient_scale<'a>(entries: impl Iterator<Item = &'a f64>) -> f64 {
    let norm = entries.fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if norm.is_finite() && norm > TARGET_GRADIENT {
        (TARGET_GRADIENT / norm).max(MIN_SCALE)
    } else {
        1.0
    }
}

fn symmetrize(matrix: &mut DMatrix<f64>) {
    let n = matrix.nrows();
    for i in 0..n {
        for j in 0..i {
            let mean = 0.5 * (matrix[(i, j)] + matrix[(j, i)]);
            matrix[(i, j)] = mean;
            matrix[(j, i)] = mean;
        }
    }
}
