use std::str::FromStr;

use thiserror::Error;

/// How objective and constraint functions are scaled before solving.
///
/// Scaling changes only the internal problem. Reported objectives,
/// constraints and multipliers are always in the problem's own units.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Scaling {
    /// Scale each function so its gradient at the initial point has an
    /// infinity norm of at most 100.
    #[default]
    Automatic,

    /// Solve the problem as posed.
    None,

    /// Use the given positive factors.
    Explicit {
        objective: f64,
        constraints: Vec<f64>,
    },
}

impl FromStr for Scaling {
    type Err = ConfigError;

    /// Parses `"automatic"`/`"gradient-based"` or `"none"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" | "gradient-based" => Ok(Self::Automatic),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::UnknownScaling(s.to_owned())),
        }
    }
}

/// Configuration for the interior-point solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    max_iters: usize,
    tolerance: f64,
    scaling: Scaling,
}

/// Errors that can occur when validating an interior-point config.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tolerance must be finite and positive")]
    Tolerance,

    #[error("scaling factors must be finite and positive")]
    ScalingFactor,

    #[error("unknown scaling method `{0}`")]
    UnknownScaling(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            tolerance: 1e-6,
            scaling: Scaling::Automatic,
        }
    }
}

impl Config {
    /// Creates a config with automatic scaling.
    ///
    /// A `max_iters` of zero returns the initial point without iterating.
    ///
    /// # Errors
    ///
    /// Returns an error if `tolerance` is not finite and positive.
    pub fn new(max_iters: usize, tolerance: f64) -> Result<Self, ConfigError> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(ConfigError::Tolerance);
        }

        Ok(Self {
            max_iters,
            tolerance,
            scaling: Scaling::Automatic,
        })
    }

    /// Replaces the scaling method.
    ///
    /// # Errors
    ///
    /// Returns an error if explicit factors are not finite and positive.
    pub fn with_scaling(mut self, scaling: Scaling) -> Result<Self, ConfigError> {
        if let Scaling::Explicit {
            objective,
            constraints,
        } = &scaling
        {
            let valid = |v: &f64| v.is_finite() && *v > 0.0;
            if !valid(objective) || !constraints.iter().all(valid) {
                return Err(ConfigError::ScalingFactor);
            }
        }
        self.scaling = scaling;
        Ok(self)
    }

    /// Returns the maximum number of Newton iterations.
    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Returns the convergence tolerance on the scaled optimality error.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[must_use]
    pub fn scaling(&self) -> &Scaling {
        &self.scaling
    }
}
