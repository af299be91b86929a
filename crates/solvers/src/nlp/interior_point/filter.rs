/// Margin applied to the constraint violation of a filter entry.
pub(super) const GAMMA_THETA: f64 = 1e-5;

/// Margin applied to the barrier objective of a filter entry.
pub(super) const GAMMA_PHI: f64 = 1e-8;

/// Returns whether `lhs <= rhs` once roundoff in `base` is allowed for.
pub(super) fn within(lhs: f64, rhs: f64, base: f64) -> bool {
    lhs - rhs <= 10.0 * f64::EPSILON * base.abs().max(1.0)
}

/// Pairs of (constraint violation, barrier objective) a trial point must
/// improve on in at least one coordinate.
///
/// Entries are stored with their margins already applied, and an entry
/// dominated by a newer one is dropped.
#[derive(Debug, Default)]
pub(super) struct Filter {
    entries: Vec<(f64, f64)>,
}

impl Filter {
    /// Returns whether `(theta, phi)` is not blocked by any entry.
    pub(super) fn accepts(&self, theta: f64, phi: f64) -> bool {
        self.entries
            .iter()
            .all(|&(t, p)| theta < t || within(phi, p, p))
    }

    /// Blocks the region around `(theta, phi)`.
    pub(super) fn add(&mut self, theta: f64, phi: f64) {
        let entry = ((1.0 - GAMMA_THETA) * theta, phi - GAMMA_PHI * theta);
        self.entries.retain(|&(t, p)| t < entry.0 || p < entry.1);
        self.entries.push(entry);
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_points_worse_in_both_measures() {
        let mut filter = Filter::default();
        assert!(filter.accepts(1.0, 1.0));

        filter.add(1.0, 1.0);
        assert!(!filter.accepts(1.0, 1.0));
        assert!(!filter.accepts(2.0, 3.0));
        assert!(filter.accepts(0.5, 3.0));
        assert!(filter.accepts(2.0, 0.5));
    }

    #[test]
    fn newer_entries_replace_dominated_ones() {
        let mut filter = Filter::default();
        filter.add(2.0, 2.0);
        filter.add(1.0, 1.0);
        assert_eq!(filter.entries.len(), 1);

        filter.add(3.0, 0.0);
        assert_eq!(filter.entries.len(), 2);

        filter.clear();
        assert!(filter.accepts(10.0, 10.0));
    }

    #[test]
    fn comparisons_tolerate_roundoff() {
        let phi = 12.5;
        assert!(within(phi + 4.0 * f64::EPSILON * phi, phi, phi));
        assert!(!within(phi + 1e-9, phi, phi));
        assert!(within(1e-300, 0.0, 0.0));
    }
}
