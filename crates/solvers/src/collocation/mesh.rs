use super::Lgl;

/// One mesh segment: an LGL rule mapped onto a slice of the phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    rule: Lgl,
    first_node: usize,
    start: f64,
    end: f64,
}

impl Segment {
    #[must_use]
    pub fn rule(&self) -> &Lgl {
        &self.rule
    }

    /// Index of this segment's first node in the phase node list.
    #[must_use]
    pub fn first_node(&self) -> usize {
        self.first_node
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rule.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rule.is_empty()
    }

    /// Normalized phase time in `[0, 1]` of the segment's `a`th node.
    #[must_use]
    pub fn fraction(&self, a: usize) -> f64 {
        let tau = self.rule.nodes()[a];
        if a == 0 {
            self.start
        } else if a + 1 == self.rule.len() {
            self.end
        } else {
            self.start + 0.5 * (tau + 1.0) * (self.end - self.start)
        }
    }

    /// Ratio between the segment's normalized width and the `[-1, 1]` span.
    ///
    /// Multiplying by the phase duration gives `dt/dτ` on this segment.
    #[must_use]
    pub fn half_width(&self) -> f64 {
        0.5 * (self.end - self.start)
    }
}

/// The collocation grid of one phase.
///
/// Segments split `[0, 1]` into equal pieces. Each segment owns its nodes, so
/// the node shared by neighbouring segments appears twice in the node list.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    segments: Vec<Segment>,
    num_nodes: usize,
}

impl Mesh {
    /// Builds a mesh with one segment per requested node count.
    #[must_use]
    pub fn new(counts: &[usize]) -> Self {
        let total = counts.len();
        let mut segments = Vec::with_capacity(total);
        let mut first_node = 0;

        for (s, &count) in counts.iter().enumerate() {
            let rule = Lgl::new(count);
            let len = rule.len();
            segments.push(Segment {
                rule,
                first_node,
                start: s as f64 / total as f64,
                end: if s + 1 == total {
                    1.0
                } else {
                    (s + 1) as f64 / total as f64
                },
            });
            first_node += len;
        }

        Self {
            segments,
            num_nodes: first_node,
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total node count, knot duplicates included.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Normalized times of every node, in node-list order.
    #[must_use]
    pub fn fractions(&self) -> Vec<f64> {
        self.segments
            .iter()
            .flat_map(|seg| (0..seg.len()).map(move |a| seg.fraction(a)))
            .collect()
    }

    /// Maps each node to its segment and local index.
    pub fn nodes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.segments
            .iter()
            .enumerate()
            .flat_map(|(s, seg)| (0..seg.len()).map(move |a| (s, a)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn segments_partition_the_unit_interval() {
        let mesh = Mesh::new(&[3, 1, 4]);
        assert_eq!(mesh.num_nodes(), 3 + 2 + 4);

        let fractions = mesh.fractions();
        assert_eq!(fractions[0], 0.0);
        assert_relative_eq!(fractions[1], 1.0 / 6.0, epsilon = 1e-15);
        assert_relative_eq!(fractions[2], 1.0 / 3.0);
        assert_relative_eq!(fractions[3], 1.0 / 3.0);
        assert_relative_eq!(fractions[4], 2.0 / 3.0);
        assert_eq!(fractions[8], 1.0);

        assert!(fractions.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(mesh.segments()[2].first_node(), 5);
    }

    #[test]
    fn each_count_is_one_equal_width_segment() {
        let mesh = Mesh::new(&[10, 50]);
        assert_eq!(mesh.segments().len(), 2);
        assert_eq!(mesh.num_nodes(), 60);

        let [first, second] = mesh.segments() else {
            panic!("two segments");
        };
        assert_relative_eq!(first.half_width(), 0.25);
        assert_relative_eq!(second.half_width(), 0.25);
        assert_eq!(first.len(), 10);
        assert_eq!(second.first_node(), 10);
        assert_eq!(second.fraction(0), 0.5);
    }

    #[test]
    fn node_map_follows_segments() {
        let mesh = Mesh::new(&[2, 3]);
        let nodes: Vec<_> = mesh.nodes().collect();
        assert_eq!(nodes, vec![(0, 0), (0, 1), (1, 0), (1, 1), (1, 2)]);
    }
}
