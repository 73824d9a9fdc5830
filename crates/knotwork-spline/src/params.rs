//! Calibration parameters for a single segment.
//!
//! [`CalibrationParams`] carries everything a segment is calibrated against,
//! in global coordinates: solo nodes (the first and last are the edge values,
//! interior ones become single-node constraints), optional edge derivatives
//! and node weight constraints. [`CalibrationParams::split`] hands the inputs
//! to the two children of a knot insertion.

use tracing::{debug, warn};

use crate::constraint::{KnotPosition, NodeWeightConstraint};
use crate::error::{ensure_finite, SplineError, SplineResult};

/// Relative tolerance used when matching node ordinates to segment edges.
pub(crate) const EDGE_TOLERANCE: f64 = 1e-12;

/// Calibration inputs in global coordinates.
///
/// Derivatives are global: the derivative of order `j` is stored at index
/// `j - 1`.
///
/// # Example
///
/// ```rust
/// use knotwork_spline::params::CalibrationParams;
///
/// let params = CalibrationParams::new(vec![1.0, 1.5], vec![25.0, 16.0])
///     .unwrap()
///     .with_left_derivatives(vec![-18.0])
///     .unwrap();
/// assert_eq!(params.left_derivatives(), &[-18.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationParams {
    ordinates: Vec<f64>,
    values: Vec<f64>,
    left_derivatives: Vec<f64>,
    right_derivatives: Vec<f64>,
    constraints: Vec<NodeWeightConstraint>,
}

impl CalibrationParams {
    /// Creates parameters from solo nodes.
    ///
    /// # Errors
    ///
    /// Fails unless there are at least two nodes, the arrays match in length,
    /// all entries are finite and the ordinates strictly increase.
    pub fn new(ordinates: Vec<f64>, values: Vec<f64>) -> SplineResult<Self> {
        if ordinates.len() < 2 {
            return Err(SplineError::invalid_input(format!(
                "calibration needs at least 2 solo nodes, got {}",
                ordinates.len()
            )));
        }
        if ordinates.len() != values.len() {
            return Err(SplineError::invalid_input(format!(
                "{} ordinates but {} values",
                ordinates.len(),
                values.len()
            )));
        }
        ensure_finite("ordinates", &ordinates)?;
        ensure_finite("values", &values)?;
        if let Some(i) = ordinates.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SplineError::invalid_input(format!(
                "ordinates must be strictly increasing: {} >= {} at index {}",
                ordinates[i],
                ordinates[i + 1],
                i + 1
            )));
        }

        Ok(Self {
            ordinates,
            values,
            left_derivatives: Vec::new(),
            right_derivatives: Vec::new(),
            constraints: Vec::new(),
        })
    }

    /// Sets the left-edge derivatives (orders `1..=len`).
    pub fn with_left_derivatives(mut self, derivatives: Vec<f64>) -> SplineResult<Self> {
        ensure_finite("left derivatives", &derivatives)?;
        self.left_derivatives = derivatives;
        Ok(self)
    }

    /// Sets the right-edge derivatives (orders `1..=len`).
    pub fn with_right_derivatives(mut self, derivatives: Vec<f64>) -> SplineResult<Self> {
        ensure_finite("right derivatives", &derivatives)?;
        self.right_derivatives = derivatives;
        Ok(self)
    }

    /// Adds a node weight constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: NodeWeightConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Solo-node ordinates.
    #[must_use]
    pub fn ordinates(&self) -> &[f64] {
        &self.ordinates
    }

    /// Solo-node values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Left-edge derivatives.
    #[must_use]
    pub fn left_derivatives(&self) -> &[f64] {
        &self.left_derivatives
    }

    /// Right-edge derivatives.
    #[must_use]
    pub fn right_derivatives(&self) -> &[f64] {
        &self.right_derivatives
    }

    /// Node weight constraints.
    #[must_use]
    pub fn constraints(&self) -> &[NodeWeightConstraint] {
        &self.constraints
    }

    /// First solo-node ordinate.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.ordinates[0]
    }

    /// Last solo-node ordinate.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.ordinates[self.ordinates.len() - 1]
    }

    /// Value at the first solo node.
    #[must_use]
    pub fn left_value(&self) -> f64 {
        self.values[0]
    }

    /// Value at the last solo node.
    #[must_use]
    pub fn right_value(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Interior solo nodes as single-node constraints.
    pub fn interior_node_constraints(&self) -> SplineResult<Vec<NodeWeightConstraint>> {
        let last = self.ordinates.len() - 1;
        (1..last)
            .map(|i| NodeWeightConstraint::node(self.ordinates[i], self.values[i]))
            .collect()
    }

    /// Checks the parameters against a segment domain and continuity order.
    ///
    /// Exactly `continuity` left derivatives are required. Right derivatives
    /// are either absent or of the same length.
    pub fn validate_for(&self, left: f64, right: f64, continuity: usize) -> SplineResult<()> {
        let tol = EDGE_TOLERANCE * (right - left);
        if (self.left() - left).abs() > tol || (self.right() - right).abs() > tol {
            return Err(SplineError::invalid_input(format!(
                "solo nodes span [{}, {}] but segment is [{left}, {right}]",
                self.left(),
                self.right()
            )));
        }
        // left derivatives are mandatory up to Ck, right ones optional
        let left_ok = self.left_derivatives.len() == continuity;
        let right_ok = self.right_derivatives.is_empty() || self.right_derivatives.len() == continuity;
        for (name, derivs, ok) in [
            ("left", &self.left_derivatives, left_ok),
            ("right", &self.right_derivatives, right_ok),
        ] {
            if !ok {
                return Err(SplineError::invalid_input(format!(
                    "{name} derivatives have length {} but continuity order is {continuity}",
                    derivs.len()
                )));
            }
        }
        for constraint in &self.constraints {
            let (lo, hi) = constraint.span();
            if lo < left - tol || hi > right + tol {
                return Err(SplineError::out_of_range(
                    if lo < left - tol { lo } else { hi },
                    left,
                    right,
                ));
            }
        }
        Ok(())
    }

    /// Returns true if any constraint straddles `knot`.
    #[must_use]
    pub fn breaks_any_constraint(&self, knot: f64) -> bool {
        self.constraints
            .iter()
            .any(|c| c.knot_position(knot) == KnotPosition::BreaksConstraint)
    }

    /// Partitions the parameters across an internal knot.
    ///
    /// The knot node `(knot_x, knot_y)` is placed in both halves, replacing a
    /// solo node or constraint already sitting on the knot. The left half keeps the
    /// original left derivatives and takes `derivs_at_knot` as its right
    /// derivatives; the right half takes `derivs_at_knot` as its left
    /// derivatives and keeps the original right derivatives.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::InvalidInput`] if the knot is not strictly
    /// inside the node span, or if a constraint straddles the knot.
    pub fn split(
        &self,
        knot_x: f64,
        knot_y: f64,
        derivs_at_knot: &[f64],
    ) -> SplineResult<(Self, Self)> {
        ensure_finite("knot", &[knot_x, knot_y])?;
        ensure_finite("knot derivatives", derivs_at_knot)?;
        if knot_x <= self.left() || knot_x >= self.right() {
            return Err(SplineError::invalid_input(format!(
                "knot {knot_x} is not inside ({}, {})",
                self.left(),
                self.right()
            )));
        }

        let (left_constraints, right_constraints) =
            partition_constraints(&self.constraints, knot_x)?;

        let mut left_nodes: Vec<(f64, f64)> = self
            .ordinates
            .iter()
            .zip(&self.values)
            .filter(|(x, _)| **x < knot_x)
            .map(|(x, y)| (*x, *y))
            .collect();
        left_nodes.push((knot_x, knot_y));

        let mut right_nodes = vec![(knot_x, knot_y)];
        right_nodes.extend(
            self.ordinates
                .iter()
                .zip(&self.values)
                .filter(|(x, _)| **x > knot_x)
                .map(|(x, y)| (*x, *y)),
        );

        let (lx, ly): (Vec<f64>, Vec<f64>) = left_nodes.into_iter().unzip();
        let (rx, ry): (Vec<f64>, Vec<f64>) = right_nodes.into_iter().unzip();

        let left = Self {
            left_derivatives: self.left_derivatives.clone(),
            right_derivatives: derivs_at_knot.to_vec(),
            constraints: left_constraints,
            ..Self::new(lx, ly)?
        };
        let right = Self {
            left_derivatives: derivs_at_knot.to_vec(),
            right_derivatives: self.right_derivatives.clone(),
            constraints: right_constraints,
            ..Self::new(rx, ry)?
        };

        Ok((left, right))
    }
}

/// Assigns each constraint to the left or right side of `knot`.
///
/// A constraint whose ordinates all sit on the knot is dropped; the knot
/// node pins that value in both children.
pub(crate) fn partition_constraints(
    constraints: &[NodeWeightConstraint],
    knot: f64,
) -> SplineResult<(Vec<NodeWeightConstraint>, Vec<NodeWeightConstraint>)> {
    let mut left = Vec::new();
    let mut right = Vec::new();

    for (i, constraint) in constraints.iter().enumerate() {
        if constraint.span() == (knot, knot) {
            debug!(knot, index = i, "constraint on the knot superseded by the knot node");
            continue;
        }
        match constraint.knot_position(knot) {
            KnotPosition::RightOfConstraint => left.push(constraint.clone()),
            KnotPosition::LeftOfConstraint => right.push(constraint.clone()),
            KnotPosition::BreaksConstraint => {
                let (lo, hi) = constraint.span();
                warn!(knot, lo, hi, index = i, "split rejected: constraint straddles knot");
                return Err(SplineError::invalid_input(format!(
                    "constraint {i} spans [{lo}, {hi}] and is broken by knot {knot}"
                )));
            }
        }
    }

    Ok((left, right))
}
