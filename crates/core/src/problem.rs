use std::path::{Path, PathBuf};

use crate::{
    bounds::Bounds,
    error::{DescriptorError, Field},
    phase::Phase,
};

/// A complete multi-phase optimal control problem.
///
/// Construction validates that every phase is ready to transcribe: it has a
/// mesh request and a guess, and all of its arrays agree with its dimensions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Problem {
    name: String,
    output_destination: Option<PathBuf>,
    phases: Vec<Phase>,
    linkage_bounds: Bounds,
}

impl Problem {
    /// Creates a problem with no linkages.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::NoPhases`] for an empty phase list, or
    /// [`DescriptorError::Incomplete`] naming the first phase that lacks nodes
    /// or a guess.
    pub fn new(name: impl Into<String>, phases: Vec<Phase>) -> Result<Self, DescriptorError> {
        if phases.is_empty() {
            return Err(DescriptorError::NoPhases);
        }

        for (index, phase) in phases.iter().enumerate() {
            if phase.nodes().is_empty() {
                return Err(DescriptorError::Incomplete {
                    phase: index,
                    missing: "nodes",
                });
            }
            if phase.guess().is_none() {
                return Err(DescriptorError::Incomplete {
                    phase: index,
                    missing: "guess",
                });
            }
        }

        Ok(Self {
            name: name.into(),
            output_destination: None,
            phases,
            linkage_bounds: Bounds::fixed(Vec::new()),
        })
    }

    /// Declares `count` linkage residuals, each constrained to zero.
    #[must_use]
    pub fn with_linkages(mut self, count: usize) -> Self {
        self.linkage_bounds = Bounds::fixed(vec![0.0; count]);
        self
    }

    /// Replaces the linkage bounds.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if the length differs
    /// from the declared linkage count.
    pub fn set_linkage_bounds(&mut self, bounds: Bounds) -> Result<(), DescriptorError> {
        DescriptorError::check_len(Field::LinkageBounds, self.linkage_bounds.len(), bounds.len())?;
        self.linkage_bounds = bounds;
        Ok(())
    }

    /// Sets the directory that trajectory exports are written to.
    #[must_use]
    pub fn with_output_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_destination = Some(path.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn output_destination(&self) -> Option<&Path> {
        self.output_destination.as_deref()
    }

    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    #[must_use]
    pub fn num_linkages(&self) -> usize {
        self.linkage_bounds.len()
    }

    #[must_use]
    pub fn linkage_bounds(&self) -> &Bounds {
        &self.linkage_bounds
    }
}
