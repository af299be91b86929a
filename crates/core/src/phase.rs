//! Per-phase descriptors: dimensions, mesh request, bounds and guess.

mod guess;

use std::borrow::Cow;

pub use guess::{Guess, linspace};

use crate::{
    bounds::{Bounds, Interval},
    error::{DescriptorError, Field},
};

/// Counts that size every per-phase array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    pub states: usize,
    pub controls: usize,
    pub events: usize,
    pub path: usize,
    pub parameters: usize,
}

impl Dimensions {
    /// Dimensions with the given state and control counts and nothing else.
    #[must_use]
    pub fn new(states: usize, controls: usize) -> Self {
        Self {
            states,
            controls,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: usize) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: usize) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: usize) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Everything the solver needs to know about one phase.
///
/// Setters validate eagerly. A rejected assignment returns an error and
/// leaves the phase exactly as it was.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Phase {
    dimensions: Dimensions,
    nodes: Vec<usize>,
    state_bounds: Option<Bounds>,
    control_bounds: Option<Bounds>,
    event_bounds: Option<Bounds>,
    path_bounds: Option<Bounds>,
    parameter_bounds: Option<Bounds>,
    start_time: Interval,
    end_time: Interval,
    guess: Option<Guess>,
}

impl Phase {
    /// Creates a phase with unbounded limits and no mesh or guess.
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            nodes: Vec::new(),
            state_bounds: None,
            control_bounds: None,
            event_bounds: None,
            path_bounds: None,
            parameter_bounds: None,
            start_time: Interval::unbounded(),
            end_time: Interval::unbounded(),
            guess: None,
        }
    }

    /// Changes the phase dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if any explicitly set
    /// bounds or the guess disagree with the new counts.
    pub fn set_dimensions(&mut self, dimensions: Dimensions) -> Result<(), DescriptorError> {
        let check = |bounds: &Option<Bounds>, field, expected| match bounds {
            Some(b) => DescriptorError::check_len(field, expected, b.len()),
            None => Ok(()),
        };

        check(&self.state_bounds, Field::StateBounds, dimensions.states)?;
        check(&self.control_bounds, Field::ControlBounds, dimensions.controls)?;
        check(&self.event_bounds, Field::EventBounds, dimensions.events)?;
        check(&self.path_bounds, Field::PathBounds, dimensions.path)?;
        check(
            &self.parameter_bounds,
            Field::ParameterBounds,
            dimensions.parameters,
        )?;
        if let Some(guess) = &self.guess {
            check_guess(guess, &dimensions)?;
        }

        self.dimensions = dimensions;
        Ok(())
    }

    /// Sets the node count of each mesh segment.
    ///
    /// Each entry is one segment of an equal-width split of the phase, solved
    /// together with the others in a single pass. `vec![10, 50]` is a 10-node
    /// segment followed by a 50-node segment, not a refinement sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::EmptyNodes`] for an empty sequence and
    /// [`DescriptorError::ZeroNodes`] if any segment asks for zero nodes.
    pub fn set_nodes(&mut self, nodes: Vec<usize>) -> Result<(), DescriptorError> {
        if nodes.is_empty() {
            return Err(DescriptorError::EmptyNodes);
        }
        if let Some(segment) = nodes.iter().position(|&n| n == 0) {
            return Err(DescriptorError::ZeroNodes { segment });
        }
        self.nodes = nodes;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if the length differs
    /// from the state count.
    pub fn set_state_bounds(&mut self, bounds: Bounds) -> Result<(), DescriptorError> {
        DescriptorError::check_len(Field::StateBounds, self.dimensions.states, bounds.len())?;
        self.state_bounds = Some(bounds);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if the length differs
    /// from the control count.
    pub fn set_control_bounds(&mut self, bounds: Bounds) -> Result<(), DescriptorError> {
        DescriptorError::check_len(Field::ControlBounds, self.dimensions.controls, bounds.len())?;
        self.control_bounds = Some(bounds);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if the length differs
    /// from the event count.
    pub fn set_event_bounds(&mut self, bounds: Bounds) -> Result<(), DescriptorError> {
        DescriptorError::check_len(Field::EventBounds, self.dimensions.events, bounds.len())?;
        self.event_bounds = Some(bounds);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if the length differs
    /// from the path constraint count.
    pub fn set_path_bounds(&mut self, bounds: Bounds) -> Result<(), DescriptorError> {
        DescriptorError::check_len(Field::PathBounds, self.dimensions.path, bounds.len())?;
        self.path_bounds = Some(bounds);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if the length differs
    /// from the parameter count.
    pub fn set_parameter_bounds(&mut self, bounds: Bounds) -> Result<(), DescriptorError> {
        DescriptorError::check_len(
            Field::ParameterBounds,
            self.dimensions.parameters,
            bounds.len(),
        )?;
        self.parameter_bounds = Some(bounds);
        Ok(())
    }

    pub fn set_start_time(&mut self, interval: Interval) {
        self.start_time = interval;
    }

    pub fn set_end_time(&mut self, interval: Interval) {
        self.end_time = interval;
    }

    /// Sets the initial guess.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if the guess rows or
    /// parameter count disagree with the phase dimensions.
    pub fn set_guess(&mut self, guess: Guess) -> Result<(), DescriptorError> {
        check_guess(&guess, &self.dimensions)?;
        self.guess = Some(guess);
        Ok(())
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Requested nodes per mesh segment. Empty until [`Phase::set_nodes`].
    #[must_use]
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    #[must_use]
    pub fn state_bounds(&self) -> Cow<'_, Bounds> {
        bounds_or_free(self.state_bounds.as_ref(), self.dimensions.states)
    }

    #[must_use]
    pub fn control_bounds(&self) -> Cow<'_, Bounds> {
        bounds_or_free(self.control_bounds.as_ref(), self.dimensions.controls)
    }

    #[must_use]
    pub fn event_bounds(&self) -> Cow<'_, Bounds> {
        bounds_or_free(self.event_bounds.as_ref(), self.dimensions.events)
    }

    #[must_use]
    pub fn path_bounds(&self) -> Cow<'_, Bounds> {
        bounds_or_free(self.path_bounds.as_ref(), self.dimensions.path)
    }

    #[must_use]
    pub fn parameter_bounds(&self) -> Cow<'_, Bounds> {
        bounds_or_free(self.parameter_bounds.as_ref(), self.dimensions.parameters)
    }

    #[must_use]
    pub fn start_time(&self) -> Interval {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> Interval {
        self.end_time
    }

    #[must_use]
    pub fn guess(&self) -> Option<&Guess> {
        self.guess.as_ref()
    }
}

fn bounds_or_free(bounds: Option<&Bounds>, len: usize) -> Cow<'_, Bounds> {
    match bounds {
        Some(b) => Cow::Borrowed(b),
        None => Cow::Owned(Bounds::unbounded(len)),
    }
}

fn check_guess(guess: &Guess, dimensions: &Dimensions) -> Result<(), DescriptorError> {
    DescriptorError::check_len(Field::GuessStates, dimensions.states, guess.states().nrows())?;
    DescriptorError::check_len(
        Field::GuessControls,
        dimensions.controls,
        guess.controls().nrows(),
    )?;
    DescriptorError::check_len(
        Field::GuessParameters,
        dimensions.parameters,
        guess.parameters().len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::DMatrix;

    fn double_integrator() -> Phase {
        Phase::new(Dimensions::new(2, 1).with_events(4))
    }

    #[test]
    fn wrong_length_bounds_leave_phase_untouched() {
        let mut phase = double_integrator();
        let good = Bounds::uniform(2, -10.0, 10.0).expect("valid bounds");
        phase.set_state_bounds(good.clone()).expect("matching length");

        let bad = Bounds::uniform(3, -1.0, 1.0).expect("valid bounds");
        let err = phase.set_state_bounds(bad).unwrap_err();

        assert_eq!(
            err,
            DescriptorError::DimensionMismatch {
                field: Field::StateBounds,
                expected: 2,
                actual: 3,
            }
        );
        assert_eq!(*phase.state_bounds(), good);
    }

    #[test]
    fn dimension_change_must_agree_with_set_arrays() {
        let mut phase = double_integrator();
        phase
            .set_event_bounds(Bounds::fixed(vec![0.0; 4]))
            .expect("matching length");

        let err = phase
            .set_dimensions(Dimensions::new(2, 1).with_events(5))
            .unwrap_err();

        assert!(matches!(
            err,
            DescriptorError::DimensionMismatch {
                field: Field::EventBounds,
                expected: 5,
                actual: 4,
            }
        ));
        assert_eq!(phase.dimensions().events, 4);
    }

    #[test]
    fn unset_bounds_follow_dimensions() {
        let mut phase = double_integrator();
        phase
            .set_dimensions(Dimensions::new(3, 2))
            .expect("nothing explicit yet");

        let states = phase.state_bounds();
        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|(lo, hi)| lo.is_infinite() && hi.is_infinite()));
        assert!(phase.event_bounds().is_empty());
    }

    #[test]
    fn node_sequences_are_validated() {
        let mut phase = double_integrator();
        assert_eq!(phase.set_nodes(vec![]), Err(DescriptorError::EmptyNodes));
        assert_eq!(
            phase.set_nodes(vec![4, 0, 4]),
            Err(DescriptorError::ZeroNodes { segment: 1 })
        );
        assert!(phase.nodes().is_empty());

        phase.set_nodes(vec![1]).expect("one node is allowed");
        assert_eq!(phase.nodes(), &[1]);
    }

    #[test]
    fn guess_rows_must_match() {
        let mut phase = double_integrator();
        let guess = Guess::new(vec![0.0, 1.0], DMatrix::zeros(3, 2), DMatrix::zeros(1, 2))
            .expect("valid guess");

        let err = phase.set_guess(guess).unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::DimensionMismatch {
                field: Field::GuessStates,
                ..
            }
        ));
        assert!(phase.guess().is_none());
    }
}
