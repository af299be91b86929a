use crate::error::BoundsError;

/// Element-wise lower and upper limits for a vector of quantities.
///
/// Infinite entries leave that side unbounded. An entry with `lower == upper`
/// pins the quantity to a single value, which is how boundary conditions are
/// written as events.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Creates bounds from matching lower and upper vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the vectors differ in length or any `lower > upper`
    /// (NaN entries are rejected the same way).
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, BoundsError> {
        if lower.len() != upper.len() {
            return Err(BoundsError::LengthMismatch {
                lower: lower.len(),
                upper: upper.len(),
            });
        }

        for (index, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            if !(lo <= hi) {
                return Err(BoundsError::Invalid {
                    index,
                    lower: lo,
                    upper: hi,
                });
            }
        }

        Ok(Self { lower, upper })
    }

    /// Creates `len` unbounded entries.
    #[must_use]
    pub fn unbounded(len: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; len],
            upper: vec![f64::INFINITY; len],
        }
    }

    /// Creates bounds that pin every entry to the given value.
    #[must_use]
    pub fn fixed(values: Vec<f64>) -> Self {
        Self {
            lower: values.clone(),
            upper: values,
        }
    }

    /// Creates `len` entries sharing the same interval.
    ///
    /// # Errors
    ///
    /// Returns an error if `lower > upper`.
    pub fn uniform(len: usize, lower: f64, upper: f64) -> Result<Self, BoundsError> {
        Self::new(vec![lower; len], vec![upper; len])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Iterates over `(lower, upper)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lower.iter().copied().zip(self.upper.iter().copied())
    }
}

/// A closed interval for a scalar such as a phase start or end time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    /// Creates an interval.
    ///
    /// # Errors
    ///
    /// Returns an error if `lower > upper` or either end is NaN.
    pub fn new(lower: f64, upper: f64) -> Result<Self, BoundsError> {
        if lower <= upper {
            Ok(Self { lower, upper })
        } else {
            Err(BoundsError::Invalid {
                index: 0,
                lower,
                upper,
            })
        }
    }

    /// An interval containing a single value.
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Returns `value` clamped into the interval.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.lower).min(self.upper)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn rejects_mismatched_lengths() {
        let err = Bounds::new(vec![0.0, 1.0], vec![2.0]).unwrap_err();
        assert_eq!(err, BoundsError::LengthMismatch { lower: 2, upper: 1 });
    }

    #[test]
    fn rejects_inverted_and_nan_entries() {
        assert!(matches!(
            Bounds::new(vec![0.0, 3.0], vec![1.0, 2.0]),
            Err(BoundsError::Invalid { index: 1, .. })
        ));
        assert!(matches!(
            Bounds::new(vec![f64::NAN], vec![1.0]),
            Err(BoundsError::Invalid { index: 0, .. })
        ));
    }

    #[test]
    fn fixed_bounds_are_equalities() {
        let bounds = Bounds::fixed(vec![0.0, 1.0, -1.0]);
        assert_eq!(bounds.len(), 3);
        assert!(bounds.iter().all(|(lo, hi)| lo == hi));
    }

    #[test]
    fn interval_clamps() {
        let interval = Interval::new(0.0, 50.0).expect("valid interval");
        assert_relative_eq!(interval.clamp(75.0), 50.0);
        assert_relative_eq!(interval.clamp(-1.0), 0.0);
        assert_relative_eq!(Interval::unbounded().clamp(3.5), 3.5);
        assert!(Interval::new(1.0, 0.0).is_err());
    }
}
