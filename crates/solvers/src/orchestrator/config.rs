use std::str::FromStr;

use thiserror::Error;

use crate::nlp::interior_point::{self, Scaling};

/// The NLP algorithm used to solve the transcribed problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum NlpMethod {
    /// The primal-dual interior-point method in [`interior_point`].
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "ipopt"))]
    InteriorPoint,
}

impl FromStr for NlpMethod {
    type Err = ConfigError;

    /// Parses `"interior-point"` or `"ipopt"`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interior-point" | "ipopt" => Ok(Self::InteriorPoint),
            _ => Err(ConfigError::UnknownNlpMethod(s.to_owned())),
        }
    }
}

/// How derivatives of the transcribed problem are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DerivativeMethod {
    /// The transcription differentiates each node, boundary and linkage
    /// element on its own variables and assembles the results.
    #[default]
    Automatic,

    /// The engine differentiates the whole problem numerically.
    FiniteDifference,
}

impl FromStr for DerivativeMethod {
    type Err = ConfigError;

    /// Parses `"automatic"` or `"finite-difference"`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" => Ok(Self::Automatic),
            "finite-difference" | "finite-differences" => Ok(Self::FiniteDifference),
            _ => Err(ConfigError::UnknownDerivativeMethod(s.to_owned())),
        }
    }
}

/// Settings for a solve.
///
/// With the `serde` feature the config deserializes from kebab-case keys, any
/// of which may be omitted:
///
/// ```toml
/// nlp-method = "ipopt"
/// scaling = "automatic"
/// derivative-method = "finite-difference"
/// max-iters = 500
/// tolerance = 1e-8
/// workers = 4
/// ```
///
/// Deserialized values are checked by [`Config::validate`] when the config is
/// handed to an orchestrator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Config {
    nlp_method: NlpMethod,
    scaling: Scaling,
    derivative_method: DerivativeMethod,
    max_iters: usize,
    tolerance: f64,
    workers: usize,
}

/// Errors that can occur when validating a solve config.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tolerance must be finite and positive")]
    Tolerance,

    #[error("at least one worker is required")]
    Workers,

    #[error("{actual} constraint scaling factors given for {expected} constraints")]
    ScalingLength { expected: usize, actual: usize },

    #[error("unknown NLP method `{0}`")]
    UnknownNlpMethod(String),

    #[error("unknown derivative method `{0}`")]
    UnknownDerivativeMethod(String),

    #[error(transparent)]
    Engine(#[from] interior_point::ConfigError),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nlp_method: NlpMethod::InteriorPoint,
            scaling: Scaling::Automatic,
            derivative_method: DerivativeMethod::Automatic,
            max_iters: 1000,
            tolerance: 1e-6,
            workers: 1,
        }
    }
}

impl Config {
    /// Creates a config with default methods and a single worker.
    ///
    /// A `max_iters` of zero returns the interpolated guess without
    /// iterating.
    ///
    /// # Errors
    ///
    /// Returns an error if `tolerance` is not finite and positive.
    pub fn new(max_iters: usize, tolerance: f64) -> Result<Self, ConfigError> {
        let config = Self {
            max_iters,
            tolerance,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_nlp_method(mut self, method: NlpMethod) -> Self {
        self.nlp_method = method;
        self
    }

    /// Replaces the scaling method.
    ///
    /// # Errors
    ///
    /// Returns an error if explicit factors are not finite and positive.
    pub fn with_scaling(mut self, scaling: Scaling) -> Result<Self, ConfigError> {
        self.scaling = scaling;
        self.validate()?;
        Ok(self)
    }

    #[must_use]
    pub fn with_derivative_method(mut self, method: DerivativeMethod) -> Self {
        self.derivative_method = method;
        self
    }

    /// Sets how many threads evaluate callbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if `workers` is zero.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, ConfigError> {
        self.workers = workers;
        self.validate()?;
        Ok(self)
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Workers);
        }
        self.engine_config().map(|_| ())
    }

    /// Builds the interior-point settings.
    pub(crate) fn engine_config(&self) -> Result<interior_point::Config, ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::Tolerance);
        }
        let config = interior_point::Config::new(self.max_iters, self.tolerance)?
            .with_scaling(self.scaling.clone())?;
        Ok(config)
    }

    #[must_use]
    pub fn nlp_method(&self) -> NlpMethod {
        self.nlp_method
    }

    #[must_use]
    pub fn scaling(&self) -> &Scaling {
        &self.scaling
    }

    #[must_use]
    pub fn derivative_method(&self) -> DerivativeMethod {
        self.derivative_method
    }

    #[must_use]
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }
}
