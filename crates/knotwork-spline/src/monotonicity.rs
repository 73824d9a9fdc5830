//! Monotonicity classification of calibrated segments.

use serde::{Deserialize, Serialize};

use knotwork_math::solvers::{scan_roots, SolverConfig};

use crate::error::{SplineError, SplineResult};
use crate::segment::Segment;

/// Grid intervals scanned for sign changes of the first derivative.
const SCAN_SAMPLES: usize = 64;

/// Stationary points this close to an edge (in local units) are ignored.
const EDGE_MARGIN: f64 = 1e-9;

/// Shape of a segment's interpolant between its edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonotoneType {
    /// No interior stationary point.
    Monotonic,
    /// One interior stationary point with positive curvature.
    Minimum,
    /// One interior stationary point with negative curvature.
    Maximum,
    /// One interior stationary point with vanishing curvature.
    Inflection,
    /// More than one interior stationary point.
    NonMonotonic,
}

impl MonotoneType {
    /// True for [`MonotoneType::Monotonic`] and [`MonotoneType::Inflection`].
    #[must_use]
    pub fn is_monotone(&self) -> bool {
        matches!(self, Self::Monotonic | Self::Inflection)
    }
}

impl std::fmt::Display for MonotoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Monotonic => "monotonic",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Inflection => "inflection",
            Self::NonMonotonic => "non-monotonic",
        };
        write!(f, "{name}")
    }
}

impl Segment {
    /// Global ordinates of the interior stationary points, ascending.
    ///
    /// Found by scanning the first derivative on a uniform grid and refining
    /// each sign change with Brent's method. Stationary points where the
    /// derivative touches zero between grid nodes without changing sign are
    /// not reported.
    pub fn stationary_points(&self) -> SplineResult<Vec<f64>> {
        Ok(self
            .local_stationary_points()?
            .into_iter()
            .map(|u| self.left() + u * self.width())
            .collect())
    }

    /// Classifies the interpolant by its interior stationary points.
    pub fn monotone_type(&self) -> SplineResult<MonotoneType> {
        let roots = self.local_stationary_points()?;
        match roots.as_slice() {
            [] => Ok(MonotoneType::Monotonic),
            [u] => {
                let curvature = self.local_derivative(*u, 2)?;
                let scale = self.curvature_scale()?;
                Ok(if curvature > scale {
                    MonotoneType::Minimum
                } else if curvature < -scale {
                    MonotoneType::Maximum
                } else {
                    MonotoneType::Inflection
                })
            }
            _ => Ok(MonotoneType::NonMonotonic),
        }
    }

    fn local_stationary_points(&self) -> SplineResult<Vec<f64>> {
        let coefficients = self.coefficients().ok_or_else(|| {
            SplineError::not_calibrated("monotonicity needs a calibrated segment")
        })?;
        let slope = |u: f64| -> f64 {
            self.basis_row(u, 1)
                .iter()
                .zip(coefficients)
                .map(|(phi, c)| phi * c)
                .sum()
        };

        // A flat interpolant vanishes everywhere on the grid
        let step = 1.0 / SCAN_SAMPLES as f64;
        let largest = (0..=SCAN_SAMPLES)
            .map(|k| slope(k as f64 * step).abs())
            .fold(0.0, f64::max);
        if largest <= self.curvature_scale()? {
            return Ok(Vec::new());
        }

        let roots = scan_roots(slope, 0.0, 1.0, SCAN_SAMPLES, &SolverConfig::default())?;
        Ok(roots
            .into_iter()
            .filter(|u| *u > EDGE_MARGIN && *u < 1.0 - EDGE_MARGIN)
            .collect())
    }

    fn curvature_scale(&self) -> SplineResult<f64> {
        let coefficients = self.coefficients().ok_or_else(|| {
            SplineError::not_calibrated("monotonicity needs a calibrated segment")
        })?;
        let largest = coefficients.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        Ok(1e-12 * (1.0 + largest))
    }
}
