use nalgebra::DMatrix;

/// A smooth nonlinear program handed to an NLP engine.
///
/// ```text
/// minimize    f(x)
/// subject to  g_l <= g(x) <= g_u
///             x_l <= x <= x_u
/// ```
///
/// Infinite bounds leave a side free and equal bounds express equalities.
///
/// Derivative hooks are optional. An engine asks for them first and falls
/// back to its own numerical differentiation when a hook returns `None`.
pub trait NlpProblem {
    type Error: std::error::Error + Send + Sync + 'static;

    fn num_variables(&self) -> usize;

    fn num_constraints(&self) -> usize;

    /// Writes variable bounds into slices of length `num_variables`.
    fn variable_bounds(&self, lower: &mut [f64], upper: &mut [f64]);

    /// Writes constraint bounds into slices of length `num_constraints`.
    fn constraint_bounds(&self, lower: &mut [f64], upper: &mut [f64]);

    /// Writes the starting point.
    fn initial_point(&self, x: &mut [f64]);

    /// Evaluates the objective.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the objective cannot be evaluated at `x`.
    fn objective(&self, x: &[f64]) -> Result<f64, Self::Error>;

    /// Evaluates the constraint functions into `g`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the constraints cannot be evaluated at `x`.
    fn constraints(&self, x: &[f64], g: &mut [f64]) -> Result<(), Self::Error>;

    /// Evaluates constraints into `g` and returns the objective.
    ///
    /// Override when the two share work.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if either evaluation fails.
    fn evaluate(&self, x: &[f64], g: &mut [f64]) -> Result<f64, Self::Error> {
        self.constraints(x, g)?;
        self.objective(x)
    }

    /// Writes the objective gradient and the dense constraint Jacobian
    /// (`num_constraints × num_variables`).
    ///
    /// Returns `None` if the problem does not supply first derivatives.
    fn first_derivatives(
        &self,
        x: &[f64],
        gradient: &mut [f64],
        jacobian: &mut DMatrix<f64>,
    ) -> Option<Result<(), Self::Error>> {
        let _ = (x, gradient, jacobian);
        None
    }

    /// Writes the Hessian of `obj_factor * f(x) + lambda^T g(x)`.
    ///
    /// Returns `None` if the problem does not supply second derivatives.
    fn hessian(
        &self,
        x: &[f64],
        obj_factor: f64,
        lambda: &[f64],
        hessian: &mut DMatrix<f64>,
    ) -> Option<Result<(), Self::Error>> {
        let _ = (x, obj_factor, lambda, hessian);
        None
    }
}
