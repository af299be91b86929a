use std::fmt;

use thiserror::Error;

/// Descriptor array that a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    StateBounds,
    ControlBounds,
    EventBounds,
    PathBounds,
    ParameterBounds,
    LinkageBounds,
    GuessStates,
    GuessControls,
    GuessTime,
    GuessParameters,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StateBounds => "state bounds",
            Self::ControlBounds => "control bounds",
            Self::EventBounds => "event bounds",
            Self::PathBounds => "path constraint bounds",
            Self::ParameterBounds => "parameter bounds",
            Self::LinkageBounds => "linkage bounds",
            Self::GuessStates => "guess states",
            Self::GuessControls => "guess controls",
            Self::GuessTime => "guess time",
            Self::GuessParameters => "guess parameters",
        };
        f.write_str(name)
    }
}

/// Errors raised while building a lower/upper bound pair.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BoundsError {
    #[error("lower has {lower} entries but upper has {upper}")]
    LengthMismatch { lower: usize, upper: usize },

    #[error("bound {index} is invalid: lower {lower} is not <= upper {upper}")]
    Invalid { index: usize, lower: f64, upper: f64 },
}

/// Errors raised while populating phase and problem descriptors.
///
/// These are configuration errors: they surface as soon as the offending value
/// is assigned, never at solve time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("{field} has length {actual}, expected {expected}")]
    DimensionMismatch {
        field: Field,
        expected: usize,
        actual: usize,
    },

    #[error("node counts must not be empty")]
    EmptyNodes,

    #[error("mesh segment {segment} has zero nodes")]
    ZeroNodes { segment: usize },

    #[error("invalid guess: {reason}")]
    InvalidGuess { reason: &'static str },

    #[error("phase {phase} is missing its {missing}")]
    Incomplete { phase: usize, missing: &'static str },

    #[error("a problem needs at least one phase")]
    NoPhases,

    #[error("invalid {field}")]
    InvalidBound {
        field: Field,
        #[source]
        source: BoundsError,
    },
}

impl BoundsError {
    /// Attributes this error to a descriptor field.
    #[must_use]
    pub fn in_field(self, field: Field) -> DescriptorError {
        DescriptorError::InvalidBound {
            field,
            source: self,
        }
    }
}

impl DescriptorError {
    pub(crate) fn check_len(field: Field, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::DimensionMismatch {
                field,
                expected,
                actual,
            })
        }
    }
}
