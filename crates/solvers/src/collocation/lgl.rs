use nalgebra::DMatrix;

const MAX_NEWTON_ITERS: usize = 100;

/// A Legendre–Gauss–Lobatto quadrature and differentiation rule on `[-1, 1]`.
///
/// Nodes are in ascending order and always include both ends of the
/// interval. With `N` nodes the quadrature is exact for polynomials of degree
/// `2N - 3` and the differentiation matrix is exact for degree `N - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lgl {
    nodes: Vec<f64>,
    weights: Vec<f64>,
    differentiation: DMatrix<f64>,
}

impl Lgl {
    /// Builds the rule with `count` nodes.
    ///
    /// Counts below two are raised to two, the trapezoid rule.
    #[must_use]
    pub fn new(count: usize) -> Self {
        let count = count.max(2);
        let n = count - 1;

        // Newton iteration on (1 - x^2) P'_n(x) starting from the
        // Chebyshev–Gauss–Lobatto points, written in descending order.
        let mut x: Vec<f64> = (0..count)
            .map(|i| (std::f64::consts::PI * i as f64 / n as f64).cos())
            .collect();
        let mut p_n = vec![0.0; count];

        for _ in 0..MAX_NEWTON_ITERS {
            let mut max_change = 0.0_f64;
            for (xi, pi) in x.iter_mut().zip(&mut p_n) {
                let (p, p_prev) = legendre_pair(n, *xi);
                let next = *xi - (*xi * p - p_prev) / (count as f64 * p);
                max_change = max_change.max((next - *xi).abs());
                *xi = next;
                *pi = p;
            }
            if max_change <= 2.0 * f64::EPSILON {
                break;
            }
        }

        x.reverse();
        for i in 0..count / 2 {
            let half = 0.5 * (x[count - 1 - i] - x[i]);
            x[i] = -half;
            x[count - 1 - i] = half;
        }
        if count % 2 == 1 {
            x[n / 2] = 0.0;
        }

        let p_n: Vec<f64> = x.iter().map(|&xi| legendre_pair(n, xi).0).collect();
        let weights = p_n
            .iter()
            .map(|p| 2.0 / ((n * count) as f64 * p * p))
            .collect();

        let corner = (n * (n + 1)) as f64 / 4.0;
        let differentiation = DMatrix::from_fn(count, count, |i, j| {
            if i != j {
                p_n[i] / (p_n[j] * (x[i] - x[j]))
            } else if i == 0 {
                -corner
            } else if i == n {
                corner
            } else {
                0.0
            }
        });

        Self {
            nodes: x,
            weights,
            differentiation,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node locations in `[-1, 1]`, ascending.
    #[must_use]
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Quadrature weights, summing to two.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Differentiation matrix `D` with `p'(τ_a) = Σ_b D_ab p(τ_b)`.
    #[must_use]
    pub fn differentiation(&self) -> &DMatrix<f64> {
        &self.differentiation
    }
}

/// Returns `(P_n(x), P_{n-1}(x))` by the three-term recurrence.
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    let mut prev = 1.0;
    let mut curr = x;
    for k in 2..=n {
        let k = k as f64;
        let next = ((2.0 * k - 1.0) * x * curr - (k - 1.0) * prev) / k;
        prev = curr;
        curr = next;
    }
    (curr, prev)
}
