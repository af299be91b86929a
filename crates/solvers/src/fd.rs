//! Central finite differences shared by the transcription and the NLP engine.
//!
//! All helpers perturb `x` in place and restore every entry before returning,
//! including on error.

use nalgebra::DMatrix;

/// Step for first derivatives: `cbrt(eps) * max(1, |x|)`.
pub(crate) fn first_step(x: f64) -> f64 {
    f64::EPSILON.cbrt() * x.abs().max(1.0)
}

/// Step for second derivatives: `eps^(1/4) * max(1, |x|)`.
pub(crate) fn second_step(x: f64) -> f64 {
    f64::EPSILON.powf(0.25) * x.abs().max(1.0)
}

/// Writes the gradient of a scalar function into `gradient`.
pub(crate) fn gradient<E, F>(x: &mut [f64], mut f: F, gradient: &mut [f64]) -> Result<(), E>
where
    F: FnMut(&[f64]) -> Result<f64, E>,
{
    for j in 0..x.len() {
        let xj = x[j];
        let h = first_step(xj);

        x[j] = xj + h;
        let plus = f(x);
        x[j] = xj - h;
        let minus = f(x);
        x[j] = xj;

        gradient[j] = (plus? - minus?) / (2.0 * h);
    }
    Ok(())
}

/// Writes the Jacobian of a vector function into `jacobian`.
///
/// `f` writes its output into the provided slice, which has
/// `jacobian.nrows()` entries.
pub(crate) fn jacobian<E, F>(x: &mut [f64], mut f: F, jacobian: &mut DMatrix<f64>) -> Result<(), E>
where
    F: FnMut(&[f64], &mut [f64]) -> Result<(), E>,
{
    let rows = jacobian.nrows();
    let mut plus = vec![0.0; rows];
    let mut minus = vec![0.0; rows];

    for j in 0..x.len() {
        let xj = x[j];
        let h = first_step(xj);

        x[j] = xj + h;
        let forward = f(x, &mut plus);
        x[j] = xj - h;
        let backward = f(x, &mut minus);
        x[j] = xj;
        forward?;
        backward?;

        for i in 0..rows {
            jacobian[(i, j)] = (plus[i] - minus[i]) / (2.0 * h);
        }
    }
    Ok(())
}

/// Writes the symmetric Hessian of a scalar function into `hessian`.
///
/// Diagonal entries use the three-point rule and off-diagonal entries the
/// four-point rule, so each entry costs at most four evaluations.
pub(crate) fn hessian<E, F>(x: &mut [f64], mut f: F, hessian: &mut DMatrix<f64>) -> Result<(), E>
where
    F: FnMut(&[f64]) -> Result<f64, E>,
{
    let n = x.len();
    let center = f(x)?;
    let steps: Vec<f64> = x.iter().map(|&xi| second_step(xi)).collect();

    for i in 0..n {
        let xi = x[i];
        let hi = steps[i];

        x[i] = xi + hi;
        let plus = f(x);
        x[i] = xi - hi;
        let minus = f(x);
        x[i] = xi;
        hessian[(i, i)] = (plus? - 2.0 * center + minus?) / (hi * hi);

        for j in 0..i {
            let xj = x[j];
            let hj = steps[j];
            let mut corner = |si: f64, sj: f64| {
                x[i] = xi + si * hi;
                x[j] = xj + sj * hj;
                let value = f(x);
                x[i] = xi;
                x[j] = xj;
                value
            };

            let pp = corner(1.0, 1.0)?;
            let pm = corner(1.0, -1.0)?;
            let mp = corner(-1.0, 1.0)?;
            let mm = corner(-1.0, -1.0)?;

            let value = (pp - pm - mp + mm) / (4.0 * hi * hj);
            hessian[(i, j)] = value;
            hessian[(j, i)] = value;
        }
    }
    Ok(())
}
