use nalgebra::DMatrix;

use crate::error::{DescriptorError, Field};

/// An initial guess for one phase.
///
/// Columns of `states` and `controls` correspond to entries of `time`. The
/// guess grid is independent of the collocation grid: the solver interpolates
/// it linearly onto the nodes and holds the end values beyond either end.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Guess {
    time: Vec<f64>,
    states: DMatrix<f64>,
    controls: DMatrix<f64>,
    parameters: Vec<f64>,
}

impl Guess {
    /// Creates a guess from a time grid and matching trajectories.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::DimensionMismatch`] if a matrix has a column
    /// count different from the time grid length, or
    /// [`DescriptorError::InvalidGuess`] if the grid is empty, non-finite,
    /// decreasing, or spans zero time with more than one point.
    pub fn new(
        time: Vec<f64>,
        states: DMatrix<f64>,
        controls: DMatrix<f64>,
    ) -> Result<Self, DescriptorError> {
        if time.is_empty() {
            return Err(DescriptorError::InvalidGuess {
                reason: "time grid is empty",
            });
        }
        if time.iter().any(|t| !t.is_finite()) {
            return Err(DescriptorError::InvalidGuess {
                reason: "time grid contains non-finite values",
            });
        }
        if time.windows(2).any(|w| w[1] < w[0]) {
            return Err(DescriptorError::InvalidGuess {
                reason: "time grid is decreasing",
            });
        }
        if time.len() > 1 && time[time.len() - 1] <= time[0] {
            return Err(DescriptorError::InvalidGuess {
                reason: "time grid spans zero duration",
            });
        }

        DescriptorError::check_len(Field::GuessStates, time.len(), states.ncols())?;
        DescriptorError::check_len(Field::GuessControls, time.len(), controls.ncols())?;

        Ok(Self {
            time,
            states,
            controls,
            parameters: Vec::new(),
        })
    }

    /// Builds a guess that moves linearly between two endpoints over `points`
    /// samples.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Guess::new`], or if the
    /// start and end vectors differ in length.
    pub fn linear(
        time: [f64; 2],
        states: [&[f64]; 2],
        controls: [&[f64]; 2],
        points: usize,
    ) -> Result<Self, DescriptorError> {
        DescriptorError::check_len(Field::GuessStates, states[0].len(), states[1].len())?;
        DescriptorError::check_len(Field::GuessControls, controls[0].len(), controls[1].len())?;

        let points = points.max(2);
        let grid = linspace(time[0], time[1], points);
        let blend = |pair: [&[f64]; 2]| {
            DMatrix::from_fn(pair[0].len(), points, |row, col| {
                let frac = col as f64 / (points - 1) as f64;
                pair[0][row] + (pair[1][row] - pair[0][row]) * frac
            })
        };

        Self::new(grid, blend(states), blend(controls))
    }

    /// Sets the static parameter guess.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<f64>) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// States, one row per state and one column per time point.
    #[must_use]
    pub fn states(&self) -> &DMatrix<f64> {
        &self.states
    }

    /// Controls, one row per control and one column per time point.
    #[must_use]
    pub fn controls(&self) -> &DMatrix<f64> {
        &self.controls
    }

    #[must_use]
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// Number of time points in the guess.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Returns `count` evenly spaced values from `start` to `end` inclusive.
///
/// A count of one yields `[start]`.
#[must_use]
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}
