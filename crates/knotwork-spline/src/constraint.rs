//! Linear equality constraints and their two dual forms.
//!
//! A [`NodeWeightConstraint`] states `Σ wₖ·y(xₖ) = v` over global ordinates.
//! Projecting it onto a segment gives the equivalent
//! [`BasisFunctionConstraint`] `Σ aᵢ·cᵢ = v` on the basis coefficients, with
//! `aᵢ = Σₖ wₖ·φᵢ(localₖ)` where `φᵢ` is the (shaped) basis function `i`.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, SplineError, SplineResult};
use crate::segment::Segment;

/// Where a candidate knot falls relative to a constraint's ordinate span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnotPosition {
    /// The knot is at or left of every ordinate; the constraint belongs to
    /// the right child of a split.
    LeftOfConstraint,
    /// The knot is at or right of every ordinate; the constraint belongs to
    /// the left child of a split.
    RightOfConstraint,
    /// The ordinates straddle the knot.
    BreaksConstraint,
}

/// Weighted sum of interpolant values at global ordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeWeightConstraint {
    ordinates: Vec<f64>,
    weights: Vec<f64>,
    value: f64,
}

impl NodeWeightConstraint {
    /// Creates a constraint `Σ weights[k]·y(ordinates[k]) = value`.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::InvalidInput`] for empty or mismatched arrays
    /// and for non-finite entries.
    pub fn new(ordinates: Vec<f64>, weights: Vec<f64>, value: f64) -> SplineResult<Self> {
        if ordinates.is_empty() {
            return Err(SplineError::invalid_input("constraint has no ordinates"));
        }
        if ordinates.len() != weights.len() {
            return Err(SplineError::invalid_input(format!(
                "constraint has {} ordinates but {} weights",
                ordinates.len(),
                weights.len()
            )));
        }
        ensure_finite("constraint ordinates", &ordinates)?;
        ensure_finite("constraint weights", &weights)?;
        ensure_finite("constraint value", &[value])?;

        Ok(Self {
            ordinates,
            weights,
            value,
        })
    }

    /// Single-node constraint `y(x) = value`.
    pub fn node(x: f64, value: f64) -> SplineResult<Self> {
        Self::new(vec![x], vec![1.0], value)
    }

    /// Global ordinates.
    #[must_use]
    pub fn ordinates(&self) -> &[f64] {
        &self.ordinates
    }

    /// Weights parallel to the ordinates.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Target value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Smallest and largest ordinate.
    #[must_use]
    pub fn span(&self) -> (f64, f64) {
        self.ordinates
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            })
    }

    /// Classifies a candidate knot against the ordinate span.
    #[must_use]
    pub fn knot_position(&self, knot: f64) -> KnotPosition {
        let (lo, hi) = self.span();
        if knot <= lo {
            KnotPosition::LeftOfConstraint
        } else if knot >= hi {
            KnotPosition::RightOfConstraint
        } else {
            KnotPosition::BreaksConstraint
        }
    }

    /// Projects onto the basis coefficients of `segment`.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::OutOfRange`] if an ordinate lies outside the
    /// segment.
    pub fn project(&self, segment: &Segment) -> SplineResult<BasisFunctionConstraint> {
        let mut coeff_weights = vec![0.0; segment.num_basis()];

        for (&x, &w) in self.ordinates.iter().zip(&self.weights) {
            let local = segment.to_local(x)?;
            for (acc, phi) in coeff_weights.iter_mut().zip(segment.basis_row(local, 0)) {
                *acc += w * phi;
            }
        }

        BasisFunctionConstraint::new(coeff_weights, self.value)
    }

    /// `Σ wₖ·y(xₖ)` on a calibrated segment.
    pub fn evaluate_on(&self, segment: &Segment) -> SplineResult<f64> {
        self.ordinates
            .iter()
            .zip(&self.weights)
            .try_fold(0.0, |acc, (&x, &w)| -> SplineResult<f64> {
                Ok(acc + w * segment.value_at(x)?)
            })
    }
}

/// Linear constraint on basis coefficients, `Σ aᵢ·cᵢ = v`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisFunctionConstraint {
    coeff_weights: Vec<f64>,
    value: f64,
}

impl BasisFunctionConstraint {
    /// Creates a coefficient-space constraint.
    pub fn new(coeff_weights: Vec<f64>, value: f64) -> SplineResult<Self> {
        if coeff_weights.is_empty() {
            return Err(SplineError::invalid_input("constraint has no coefficient weights"));
        }
        ensure_finite("coefficient weights", &coeff_weights)?;
        ensure_finite("constraint value", &[value])?;
        Ok(Self {
            coeff_weights,
            value,
        })
    }

    /// Coefficient weights `aᵢ`.
    #[must_use]
    pub fn coeff_weights(&self) -> &[f64] {
        &self.coeff_weights
    }

    /// Target value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// `Σ aᵢ·cᵢ` for the given coefficients.
    pub fn evaluate(&self, coefficients: &[f64]) -> SplineResult<f64> {
        if coefficients.len() != self.coeff_weights.len() {
            return Err(SplineError::invalid_input(format!(
                "expected {} coefficients, got {}",
                self.coeff_weights.len(),
                coefficients.len()
            )));
        }
        Ok(self
            .coeff_weights
            .iter()
            .zip(coefficients)
            .map(|(a, c)| a * c)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisFunctionSet;
    use approx::assert_relative_eq;

    fn cubic_segment(left: f64, right: f64) -> Segment {
        Segment::new(left, right, BasisFunctionSet::polynomial(4).unwrap(), 1, 2).unwrap()
    }

    #[test]
    fn test_validation() {
        assert!(NodeWeightConstraint::new(vec![], vec![], 1.0).is_err());
        assert!(NodeWeightConstraint::new(vec![0.1, 0.2], vec![1.0], 1.0).is_err());
        assert!(NodeWeightConstraint::new(vec![f64::NAN], vec![1.0], 1.0).is_err());
        assert!(NodeWeightConstraint::new(vec![0.1], vec![1.0], f64::INFINITY).is_err());
        assert!(BasisFunctionConstraint::new(vec![], 1.0).is_err());
    }

    #[test]
    fn test_knot_position() {
        let c = NodeWeightConstraint::new(vec![1.0, 2.0, 1.5], vec![1.0, -1.0, 0.5], 0.0).unwrap();

        assert_eq!(c.span(), (1.0, 2.0));
        assert_eq!(c.knot_position(0.5), KnotPosition::LeftOfConstraint);
        assert_eq!(c.knot_position(1.0), KnotPosition::LeftOfConstraint);
        assert_eq!(c.knot_position(2.0), KnotPosition::RightOfConstraint);
        assert_eq!(c.knot_position(3.0), KnotPosition::RightOfConstraint);
        assert_eq!(c.knot_position(1.2), KnotPosition::BreaksConstraint);
    }

    #[test]
    fn test_projection_on_polynomial_segment() {
        // [0, 2] maps 0.5 and 1.0 to local 0.25 and 0.5
        let segment = cubic_segment(0.0, 2.0);
        let c = NodeWeightConstraint::new(vec![0.5, 1.0], vec![2.0, -1.0], 3.0).unwrap();

        let projected = c.project(&segment).unwrap();

        let expected = [
            2.0 - 1.0,
            2.0 * 0.25 - 0.5,
            2.0 * 0.0625 - 0.25,
            2.0 * 0.015625 - 0.125,
        ];
        for (a, e) in projected.coeff_weights().iter().zip(expected) {
            assert_relative_eq!(*a, e, epsilon = 1e-15);
        }
        assert_eq!(projected.value(), 3.0);
    }

    #[test]
    fn test_projection_rejects_foreign_ordinates() {
        let segment = cubic_segment(0.0, 1.0);
        let c = NodeWeightConstraint::node(1.5, 1.0).unwrap();

        assert!(matches!(
            c.project(&segment),
            Err(SplineError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_basis_constraint_evaluate() {
        let c = BasisFunctionConstraint::new(vec![1.0, 2.0, 3.0], 0.0).unwrap();

        assert_relative_eq!(c.evaluate(&[1.0, 1.0, 1.0]).unwrap(), 6.0);
        assert!(c.evaluate(&[1.0]).is_err());
    }
}
