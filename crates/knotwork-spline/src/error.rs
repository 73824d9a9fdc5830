//! Error types for segment calibration.
//!
//! Every failure of calibration, evaluation or sensitivity computation is
//! reported through [`SplineError`]. A failed calibration never mutates the
//! segment it was called on.

use knotwork_math::MathError;
use thiserror::Error;

/// A specialized Result type for spline operations.
pub type SplineResult<T> = Result<T, SplineError>;

/// Error types for spline operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    /// Non-finite values, mismatched array lengths or inconsistent parameters.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },

    /// The basis is too small to host the requested calibration rows.
    #[error("Insufficient basis count: {required} calibration rows need at least {required} basis functions, got {available}")]
    InsufficientBasisCount {
        /// Rows demanded by edges, constraints and derivatives.
        required: usize,
        /// Number of basis functions in the segment.
        available: usize,
    },

    /// Both solver strategies failed on the design matrix.
    #[error("Singular design system: {reason}")]
    SingularSystem {
        /// Description of the failure.
        reason: String,
    },

    /// A derivative order above the continuity order was requested at an edge.
    #[error("Derivative of order {order} at edge {x:.6} exceeds continuity order {continuity}")]
    DiscontinuousDerivativeRequest {
        /// Requested derivative order.
        order: usize,
        /// Segment continuity order.
        continuity: usize,
        /// Edge ordinate.
        x: f64,
    },

    /// Query point outside the segment domain.
    #[error("Ordinate {x:.6} out of segment range [{left:.6}, {right:.6}]")]
    OutOfRange {
        /// The query point.
        x: f64,
        /// Left edge of the segment.
        left: f64,
        /// Right edge of the segment.
        right: f64,
    },

    /// The segment has no committed calibration (or it has been invalidated).
    #[error("Segment not calibrated: {reason}")]
    NotCalibrated {
        /// What was missing.
        reason: String,
    },

    /// Underlying numerical error.
    #[error("Math error: {0}")]
    Math(MathError),
}

impl SplineError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates an insufficient basis count error.
    #[must_use]
    pub fn insufficient_basis(required: usize, available: usize) -> Self {
        Self::InsufficientBasisCount {
            required,
            available,
        }
    }

    /// Creates a singular system error.
    #[must_use]
    pub fn singular(reason: impl Into<String>) -> Self {
        Self::SingularSystem {
            reason: reason.into(),
        }
    }

    /// Creates an out of range error.
    #[must_use]
    pub fn out_of_range(x: f64, left: f64, right: f64) -> Self {
        Self::OutOfRange { x, left, right }
    }

    /// Creates a not calibrated error.
    #[must_use]
    pub fn not_calibrated(reason: impl Into<String>) -> Self {
        Self::NotCalibrated {
            reason: reason.into(),
        }
    }
}

impl From<MathError> for SplineError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::SingularMatrix => Self::singular("design matrix is not invertible"),
            other => Self::Math(other),
        }
    }
}

/// Fails with [`SplineError::InvalidInput`] unless every value is finite.
pub(crate) fn ensure_finite(what: &str, values: &[f64]) -> SplineResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(SplineError::invalid_input(format!(
            "{what}[{i}] is not finite: {}",
            values[i]
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SplineError::insufficient_basis(5, 4);
        let msg = format!("{}", err);
        assert!(msg.contains("5 calibration rows"));
        assert!(msg.contains("got 4"));
    }

    #[test]
    fn test_singular_matrix_maps_to_singular_system() {
        let err: SplineError = MathError::SingularMatrix.into();
        assert!(matches!(err, SplineError::SingularSystem { .. }));

        let err: SplineError = MathError::invalid_input("bad").into();
        assert!(matches!(err, SplineError::Math(_)));
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("values", &[1.0, 2.0]).is_ok());

        let err = ensure_finite("values", &[1.0, f64::NAN]).unwrap_err();
        assert!(err.to_string().contains("values[1]"));
    }
}
