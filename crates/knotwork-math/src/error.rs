//! Numerical failures raised by the solvers and quadrature rules.

use thiserror::Error;

/// Result alias for the numerical kernels.
pub type MathResult<T> = Result<T, MathError>;

/// Failure of a numerical kernel.
///
/// Segment-level code converts these into its own error type; a singular
/// matrix in particular surfaces as a singular calibration system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    /// An iteration ran out of steps before meeting its tolerance.
    #[error("no convergence within {iterations} iterations, |f| = {residual:.2e}")]
    ConvergenceFailed {
        /// Steps taken.
        iterations: u32,
        /// Last absolute function value.
        residual: f64,
    },

    /// The endpoints do not bracket a sign change.
    #[error("[{a}, {b}] does not bracket a root: f(a) = {fa:.2e}, f(b) = {fb:.2e}")]
    InvalidBracket {
        /// Lower end of the bracket.
        a: f64,
        /// Upper end of the bracket.
        b: f64,
        /// `f(a)`.
        fa: f64,
        /// `f(b)`.
        fb: f64,
    },

    /// No strategy could invert the matrix.
    #[error("matrix is singular")]
    SingularMatrix,

    /// Operand shapes do not line up.
    #[error("shape mismatch: {rows1}x{cols1} against {rows2}x{cols2}")]
    DimensionMismatch {
        /// Rows of the left operand.
        rows1: usize,
        /// Columns of the left operand.
        cols1: usize,
        /// Rows of the right operand.
        rows2: usize,
        /// Columns of the right operand.
        cols2: usize,
    },

    /// An argument was rejected before any work was done.
    #[error("invalid argument: {reason}")]
    InvalidInput {
        /// What was wrong.
        reason: String,
    },
}

impl MathError {
    /// Builds [`MathError::ConvergenceFailed`].
    #[must_use]
    pub fn convergence_failed(iterations: u32, residual: f64) -> Self {
        Self::ConvergenceFailed {
            iterations,
            residual,
        }
    }

    /// Builds [`MathError::InvalidInput`].
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Builds [`MathError::DimensionMismatch`] from two `(rows, cols)` shapes.
    #[must_use]
    pub fn dimension_mismatch(lhs: (usize, usize), rhs: (usize, usize)) -> Self {
        Self::DimensionMismatch {
            rows1: lhs.0,
            cols1: lhs.1,
            rows2: rhs.0,
            cols2: rhs.1,
        }
    }
}
