use vela_core::{Dimensions, Phase};

use crate::collocation::Mesh;

/// Where one phase's variables and constraint rows live in the NLP.
///
/// Variables are laid out node by node as `[states, controls]`, followed by
/// the static parameters and then `t0`, `tf`. Rows hold the collocation
/// defects, the knot continuity conditions, the path constraints, the events
/// and finally the duration row `tf - t0 >= 0`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PhaseLayout {
    mesh: Mesh,
    dims: Dimensions,
    var_offset: usize,
    row_offset: usize,
}

impl PhaseLayout {
    pub(crate) fn new(phase: &Phase, var_offset: usize, row_offset: usize) -> Self {
        Self {
            mesh: Mesh::new(phase.nodes()),
            dims: phase.dimensions(),
            var_offset,
            row_offset,
        }
    }

    pub(crate) fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub(crate) fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub(crate) fn num_nodes(&self) -> usize {
        self.mesh.num_nodes()
    }

    fn stride(&self) -> usize {
        self.dims.states + self.dims.controls
    }

    /// First state variable of node `k`.
    pub(crate) fn state(&self, k: usize) -> usize {
        self.var_offset + k * self.stride()
    }

    /// First control variable of node `k`.
    pub(crate) fn control(&self, k: usize) -> usize {
        self.state(k) + self.dims.states
    }

    /// First static parameter.
    pub(crate) fn parameters(&self) -> usize {
        self.var_offset + self.num_nodes() * self.stride()
    }

    pub(crate) fn t0(&self) -> usize {
        self.parameters() + self.dims.parameters
    }

    pub(crate) fn tf(&self) -> usize {
        self.t0() + 1
    }

    pub(crate) fn num_variables(&self) -> usize {
        self.num_nodes() * self.stride() + self.dims.parameters + 2
    }

    /// First defect row of node `k`.
    pub(crate) fn defect(&self, k: usize) -> usize {
        self.row_offset + k * self.dims.states
    }

    /// First continuity row joining segment `s - 1` to segment `s`.
    pub(crate) fn continuity(&self, s: usize) -> usize {
        debug_assert!(s >= 1);
        self.row_offset + (self.num_nodes() + s - 1) * self.dims.states
    }

    /// First path row of node `k`.
    pub(crate) fn path(&self, k: usize) -> usize {
        let segments = self.mesh.segments().len();
        self.row_offset
            + (self.num_nodes() + segments - 1) * self.dims.states
            + k * self.dims.path
    }

    pub(crate) fn events(&self) -> usize {
        self.path(self.num_nodes())
    }

    pub(crate) fn duration(&self) -> usize {
        self.events() + self.dims.events
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.duration() + 1 - self.row_offset
    }

    /// Variables describing the phase ends, in the order
    /// `[x(t0), x(tf), parameters, t0, tf]`.
    pub(crate) fn boundary_variables(&self) -> Vec<usize> {
        let ns = self.dims.states;
        let last = self.num_nodes() - 1;
        (self.state(0)..self.state(0) + ns)
            .chain(self.state(last)..self.state(last) + ns)
            .chain(self.parameters()..self.parameters() + self.dims.parameters)
            .chain([self.t0(), self.tf()])
            .collect()
    }
}

/// Maps a normalized phase time onto `[t0, tf]`.
pub(crate) fn time_at(fraction: f64, t0: f64, tf: f64) -> f64 {
    t0 + (tf - t0) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> PhaseLayout {
        let mut phase = Phase::new(
            Dimensions::new(2, 1)
                .with_path(1)
                .with_events(3)
                .with_parameters(1),
        );
        phase.set_nodes(vec![3, 4]).expect("valid nodes");
        PhaseLayout::new(&phase, 5, 7)
    }

    #[test]
    fn variables_are_packed_by_node() {
        let layout = layout();
        assert_eq!(layout.num_nodes(), 7);
        assert_eq!(layout.state(0), 5);
        assert_eq!(layout.control(0), 7);
        assert_eq!(layout.state(1), 8);
        assert_eq!(layout.parameters(), 5 + 21);
        assert_eq!(layout.t0(), 27);
        assert_eq!(layout.tf(), 28);
        assert_eq!(layout.num_variables(), 24);
    }

    #[test]
    fn rows_follow_defects() {
        let layout = layout();
        assert_eq!(layout.defect(0), 7);
        assert_eq!(layout.defect(6), 7 + 12);
        assert_eq!(layout.continuity(1), 7 + 14);
        assert_eq!(layout.path(0), 7 + 16);
        assert_eq!(layout.events(), 7 + 23);
        assert_eq!(layout.duration(), 7 + 26);
        assert_eq!(layout.num_rows(), 27);
    }

    #[test]
    fn boundary_variables_cover_both_ends() {
        let layout = layout();
        assert_eq!(
            layout.boundary_variables(),
            vec![5, 6, 23, 24, 26, 27, 28]
        );
    }
}
