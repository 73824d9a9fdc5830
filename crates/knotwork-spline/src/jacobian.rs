//! Analytic sensitivities of calibrated segments.
//!
//! The inverse of a segment's design matrix maps perturbations of the
//! calibration right-hand side to perturbations of the basis coefficients.
//! Chaining it with the basis evaluation vector at a point yields the
//! sensitivity of the value (or of a derivative) to every calibration input.
//!
//! Derivative inputs are in the segment's local units; the sensitivity to a
//! global derivative of order `j` is the local one multiplied by
//! `width^j`.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use knotwork_math::MathError;

use crate::error::{SplineError, SplineResult};

/// Calibration input behind one row of the design system (and one column
/// of a [`Jacobian`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JacobianInput {
    /// Value at the left edge.
    LeftValue,
    /// Value at the right edge.
    RightValue,
    /// Target value of the constraint with this index.
    Constraint(usize),
    /// Left-edge derivative of this order (local units).
    LeftDerivative(usize),
    /// Right-edge derivative of this order (local units).
    RightDerivative(usize),
    /// Roughness-penalty row for this basis index (zero target).
    Roughness(usize),
}

impl std::fmt::Display for JacobianInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeftValue => write!(f, "left value"),
            Self::RightValue => write!(f, "right value"),
            Self::Constraint(i) => write!(f, "constraint {i}"),
            Self::LeftDerivative(j) => write!(f, "left derivative {j}"),
            Self::RightDerivative(j) => write!(f, "right derivative {j}"),
            Self::Roughness(i) => write!(f, "roughness {i}"),
        }
    }
}

/// Immutable sensitivity matrix: rows are outputs, columns are labelled
/// calibration inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    matrix: DMatrix<f64>,
    inputs: Vec<JacobianInput>,
}

impl Jacobian {
    /// Builds a Jacobian from a fully populated matrix.
    ///
    /// # Errors
    ///
    /// Fails if the column count differs from the number of input labels or
    /// if any entry is not finite.
    pub fn new(matrix: DMatrix<f64>, inputs: Vec<JacobianInput>) -> SplineResult<Self> {
        if matrix.ncols() != inputs.len() {
            return Err(MathError::dimension_mismatch(
                (matrix.nrows(), matrix.ncols()),
                (inputs.len(), 1),
            )
            .into());
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(SplineError::invalid_input("Jacobian has non-finite entries"));
        }
        Ok(Self { matrix, inputs })
    }

    /// The underlying matrix.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Column labels.
    #[must_use]
    pub fn inputs(&self) -> &[JacobianInput] {
        &self.inputs
    }

    /// Number of outputs.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of inputs.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Entry `(output, input)`.
    #[must_use]
    pub fn get(&self, output: usize, input: usize) -> Option<f64> {
        self.matrix.get((output, input)).copied()
    }

    /// Sensitivities of every output to one input.
    #[must_use]
    pub fn column(&self, input: JacobianInput) -> Option<DVector<f64>> {
        let j = self.inputs.iter().position(|i| *i == input)?;
        Some(self.matrix.column(j).into_owned())
    }

    /// Sensitivities of one output to every input.
    #[must_use]
    pub fn row(&self, output: usize) -> Option<Vec<f64>> {
        (output < self.rows()).then(|| self.matrix.row(output).iter().copied().collect())
    }

    /// Composes `self ∘ inner`: `self` is taken with respect to the outputs
    /// of `inner`, and the result is labelled with `inner`'s inputs.
    pub fn chain(&self, inner: &Jacobian) -> SplineResult<Jacobian> {
        if self.cols() != inner.rows() {
            return Err(MathError::dimension_mismatch(
                (self.rows(), self.cols()),
                (inner.rows(), inner.cols()),
            )
            .into());
        }
        Jacobian::new(&self.matrix * &inner.matrix, inner.inputs.clone())
    }
}

/// Chain-rule propagation from coefficient sensitivities to output
/// sensitivities.
#[derive(Debug, Clone, Copy, Default)]
pub struct JacobianPropagator;

impl JacobianPropagator {
    /// `∂V/∂inputⱼ = Σᵢ (∂V/∂cᵢ)·(∂cᵢ/∂inputⱼ)`.
    ///
    /// `output_sensitivity` holds `∂V/∂cᵢ`; `coefficients` is the
    /// coefficient Jacobian (one row per coefficient).
    pub fn propagate(output_sensitivity: &[f64], coefficients: &Jacobian) -> SplineResult<Jacobian> {
        if output_sensitivity.len() != coefficients.rows() {
            return Err(MathError::dimension_mismatch(
                (1, output_sensitivity.len()),
                (coefficients.rows(), coefficients.cols()),
            )
            .into());
        }
        let row = DMatrix::from_row_slice(1, output_sensitivity.len(), output_sensitivity);
        Jacobian::new(row * &coefficients.matrix, coefficients.inputs.clone())
    }

    /// Propagates several output sensitivity rows at once.
    pub fn propagate_many(
        output_sensitivities: &[Vec<f64>],
        coefficients: &Jacobian,
    ) -> SplineResult<Jacobian> {
        let n = coefficients.rows();
        if let Some(bad) = output_sensitivities.iter().find(|r| r.len() != n) {
            return Err(MathError::dimension_mismatch(
                (output_sensitivities.len(), bad.len()),
                (coefficients.rows(), coefficients.cols()),
            )
            .into());
        }
        let rows = DMatrix::from_fn(output_sensitivities.len(), n, |i, j| {
            output_sensitivities[i][j]
        });
        Jacobian::new(rows * &coefficients.matrix, coefficients.inputs.clone())
    }
}
