//! Gauss-Legendre quadrature.
//!
//! Nodes and weights are computed with the Golub-Welsch algorithm: the nodes
//! are the eigenvalues of the symmetric Jacobi matrix of the Legendre
//! recurrence, polished with a few Newton steps on `P_n`. An `n`-point rule
//! integrates polynomials of degree `2n - 1` exactly.

use nalgebra::{DMatrix, SymmetricEigen};

use crate::error::{MathError, MathResult};

/// Maximum number of points accepted by [`GaussLegendre::new`].
pub const MAX_POINTS: usize = 256;

/// Gauss-Legendre rule on the reference interval `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Builds an `points`-point rule.
    ///
    /// # Errors
    ///
    /// Returns an error if `points` is zero or larger than [`MAX_POINTS`].
    pub fn new(points: usize) -> MathResult<Self> {
        if points == 0 || points > MAX_POINTS {
            return Err(MathError::invalid_input(format!(
                "Gauss-Legendre rule needs 1..={MAX_POINTS} points, got {points}"
            )));
        }

        let mut jacobi = DMatrix::zeros(points, points);
        for k in 1..points {
            let kf = k as f64;
            let beta = kf / (4.0 * kf * kf - 1.0).sqrt();
            jacobi[(k - 1, k)] = beta;
            jacobi[(k, k - 1)] = beta;
        }

        let eigen = SymmetricEigen::new(jacobi);
        let mut pairs: Vec<(f64, f64)> = eigen
            .eigenvalues
            .iter()
            .copied()
            .map(|x| polish_node(x, points))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let (nodes, weights) = pairs.into_iter().unzip();
        Ok(Self { nodes, weights })
    }

    /// Number of points in the rule.
    #[must_use]
    pub fn points(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes on `[-1, 1]`, ascending.
    #[must_use]
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Weights matching [`Self::nodes`].
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Integrates `f` over `[a, b]`.
    pub fn integrate<F>(&self, f: F, a: f64, b: f64) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        let sum: f64 = self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| w * f(mid + half * x))
            .sum();
        half * sum
    }

    /// Nodes and weights mapped onto `[0, 1]`.
    pub fn unit_interval(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| (0.5 * (x + 1.0), 0.5 * w))
    }
}

/// Legendre polynomial `P_n(x)` and its derivative by the three-term
/// recurrence.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p_prev = 1.0;
    let mut p = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let p_next = ((2.0 * kf - 1.0) * x * p - (kf - 1.0) * p_prev) / kf;
        p_prev = p;
        p = p_next;
    }
    let dp = n as f64 * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}

/// Refines an eigenvalue estimate with Newton steps on `P_n` and returns the
/// node with its weight `2 / ((1 - x²) P_n'(x)²)`.
fn polish_node(x0: f64, n: usize) -> (f64, f64) {
    let mut x = x0;
    for _ in 0..3 {
        let (p, dp) = legendre(n, x);
        if dp == 0.0 || !dp.is_finite() {
            break;
        }
        let step = p / dp;
        x -= step;
        if step.abs() < 1e-16 {
            break;
        }
    }
    let (_, dp) = legendre(n, x);
    (x, 2.0 / ((1.0 - x * x) * dp * dp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum_to_two() {
        for n in [1, 2, 5, 16, 40] {
            let rule = GaussLegendre::new(n).unwrap();
            let total: f64 = rule.weights().iter().sum();
            assert_relative_eq!(total, 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_known_three_point_rule() {
        let rule = GaussLegendre::new(3).unwrap();
        let r = (0.6_f64).sqrt();

        assert_relative_eq!(rule.nodes()[0], -r, epsilon = 1e-14);
        assert_relative_eq!(rule.nodes()[1], 0.0, epsilon = 1e-14);
        assert_relative_eq!(rule.nodes()[2], r, epsilon = 1e-14);
        assert_relative_eq!(rule.weights()[0], 5.0 / 9.0, epsilon = 1e-14);
        assert_relative_eq!(rule.weights()[1], 8.0 / 9.0, epsilon = 1e-14);
    }

    #[test]
    fn test_polynomial_exactness() {
        // 6 points are exact up to degree 11
        let rule = GaussLegendre::new(6).unwrap();
        for degree in 0..=11 {
            let integral = rule.integrate(|x| x.powi(degree), 0.0, 1.0);
            assert_relative_eq!(integral, 1.0 / (degree as f64 + 1.0), epsilon = 1e-13);
        }
    }

    #[test]
    fn test_exponential_integral() {
        let rule = GaussLegendre::new(24).unwrap();
        let integral = rule.integrate(|x| (3.0 * x).exp(), 0.0, 1.0);

        assert_relative_eq!(integral, (3.0_f64.exp() - 1.0) / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_interval_mapping() {
        let rule = GaussLegendre::new(4).unwrap();
        let integral: f64 = rule.unit_interval().map(|(x, w)| w * x * x).sum();

        assert_relative_eq!(integral, 1.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_invalid_point_count() {
        assert!(GaussLegendre::new(0).is_err());
        assert!(GaussLegendre::new(MAX_POINTS + 1).is_err());
    }
}
