//! Linear algebra utilities.
//!
//! This module provides the dense square solver used by segment calibration.
//! Every strategy returns both the solution vector and the inverse of the
//! system matrix, since the inverse doubles as the coefficient-sensitivity
//! matrix of the calibration.
//!
//! # Strategies
//!
//! | Strategy | Method | Role |
//! |----------|--------|------|
//! | [`SolveStrategy::Inversion`] | LU-based inverse, then `x = A⁻¹ b` | Primary |
//! | [`SolveStrategy::GaussianElimination`] | Gauss-Jordan with partial pivoting on `[A | I | b]` | Fallback |

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

/// Default relative pivot tolerance for Gaussian elimination.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-14;

/// Default relative residual tolerance `|Ax - b|∞ / max(1, |b|∞)`.
pub const DEFAULT_RESIDUAL_TOLERANCE: f64 = 1e-8;

/// Configuration for the dense linear solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveConfig {
    /// Pivots smaller than this (relative to the largest matrix entry) are
    /// treated as zero.
    pub pivot_tolerance: f64,
    /// Maximum accepted relative residual of a solution.
    pub residual_tolerance: f64,
    /// Strategy tried first.
    pub primary: SolveStrategy,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            residual_tolerance: DEFAULT_RESIDUAL_TOLERANCE,
            primary: SolveStrategy::Inversion,
        }
    }
}

impl SolveConfig {
    /// Creates a new solve configuration.
    #[must_use]
    pub fn new(pivot_tolerance: f64, residual_tolerance: f64) -> Self {
        Self {
            pivot_tolerance,
            residual_tolerance,
            ..Self::default()
        }
    }

    /// Sets the pivot tolerance.
    #[must_use]
    pub fn with_pivot_tolerance(mut self, tolerance: f64) -> Self {
        self.pivot_tolerance = tolerance;
        self
    }

    /// Sets the residual tolerance.
    #[must_use]
    pub fn with_residual_tolerance(mut self, tolerance: f64) -> Self {
        self.residual_tolerance = tolerance;
        self
    }

    /// Sets the strategy tried first; the other one becomes the fallback.
    #[must_use]
    pub fn with_primary(mut self, strategy: SolveStrategy) -> Self {
        self.primary = strategy;
        self
    }
}

/// Strategy used to solve a dense square system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStrategy {
    /// Direct matrix inversion (LU based).
    Inversion,
    /// Gauss-Jordan elimination with partial pivoting.
    GaussianElimination,
}

impl SolveStrategy {
    /// Returns the other strategy.
    #[must_use]
    pub fn fallback(self) -> Self {
        match self {
            Self::Inversion => Self::GaussianElimination,
            Self::GaussianElimination => Self::Inversion,
        }
    }
}

impl std::fmt::Display for SolveStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inversion => write!(f, "inversion"),
            Self::GaussianElimination => write!(f, "gaussian elimination"),
        }
    }
}

/// Solution of a square linear system together with the inverse matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSolution {
    /// Solution vector `x` of `A x = b`.
    pub solution: DVector<f64>,
    /// Inverse `A⁻¹` of the system matrix.
    pub inverse: DMatrix<f64>,
    /// Strategy that produced the solution.
    pub strategy: SolveStrategy,
}

/// Dense square solver with a primary and a fallback strategy.
///
/// # Example
///
/// ```rust
/// use knotwork_math::linear_algebra::{LinearSystemSolver, SolveStrategy};
/// use nalgebra::{DMatrix, DVector};
///
/// let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
/// let b = DVector::from_vec(vec![5.0, 5.0]);
///
/// let result = LinearSystemSolver::default().solve(&a, &b).unwrap();
/// assert!((result.solution[0] - 2.0).abs() < 1e-12);
/// assert_eq!(result.strategy, SolveStrategy::Inversion);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearSystemSolver {
    config: SolveConfig,
}

impl LinearSystemSolver {
    /// Creates a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolveConfig) -> Self {
        Self { config }
    }

    /// Returns the solver configuration.
    #[must_use]
    pub fn config(&self) -> &SolveConfig {
        &self.config
    }

    /// Solves `A x = b`, trying the primary strategy first and the fallback
    /// strategy on failure.
    ///
    /// Returns [`MathError::SingularMatrix`] when both strategies fail.
    pub fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<LinearSolution> {
        check_square_system(a, b)?;

        let primary = self.config.primary;
        match self.solve_with(primary, a, b) {
            Ok(solution) => Ok(solution),
            Err(primary_err) => {
                let fallback = primary.fallback();
                log::warn!(
                    "{} failed on {}x{} system ({}), retrying with {}",
                    primary,
                    a.nrows(),
                    a.ncols(),
                    primary_err,
                    fallback
                );
                self.solve_with(fallback, a, b).map_err(|fallback_err| {
                    log::warn!("{} failed as well: {}", fallback, fallback_err);
                    MathError::SingularMatrix
                })
            }
        }
    }

    /// Solves `A x = b` with a single strategy, without fallback.
    pub fn solve_with(
        &self,
        strategy: SolveStrategy,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
    ) -> MathResult<LinearSolution> {
        check_square_system(a, b)?;

        let (solution, inverse) = match strategy {
            SolveStrategy::Inversion => {
                let inverse = a.clone().try_inverse().ok_or(MathError::SingularMatrix)?;
                let solution = &inverse * b;
                (solution, inverse)
            }
            SolveStrategy::GaussianElimination => {
                gauss_jordan(a, b, self.config.pivot_tolerance)?
            }
        };

        if !all_finite(solution.iter()) || !all_finite(inverse.iter()) {
            return Err(MathError::SingularMatrix);
        }

        let residual = relative_residual(a, &solution, b);
        if residual > self.config.residual_tolerance {
            return Err(MathError::invalid_input(format!(
                "relative residual {residual:.2e} exceeds tolerance {:.2e}",
                self.config.residual_tolerance
            )));
        }

        Ok(LinearSolution {
            solution,
            inverse,
            strategy,
        })
    }
}

/// Gauss-Jordan elimination with partial pivoting.
///
/// Reduces the augmented matrix `[A | I | b]` to `[I | A⁻¹ | x]` and returns
/// `(x, A⁻¹)`. Pivots below `pivot_tolerance` times the largest absolute
/// entry of `A` are reported as [`MathError::SingularMatrix`].
pub fn gauss_jordan(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    pivot_tolerance: f64,
) -> MathResult<(DVector<f64>, DMatrix<f64>)> {
    check_square_system(a, b)?;

    let n = a.nrows();
    if n == 0 {
        return Ok((DVector::zeros(0), DMatrix::zeros(0, 0)));
    }

    let width = 2 * n + 1;
    let mut aug = DMatrix::zeros(n, width);
    for i in 0..n {
        for j in 0..n {
            aug[(i, j)] = a[(i, j)];
        }
        aug[(i, n + i)] = 1.0;
        aug[(i, 2 * n)] = b[i];
    }

    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return Err(MathError::SingularMatrix);
    }
    let threshold = pivot_tolerance * scale;

    for k in 0..n {
        // Partial pivoting: largest magnitude in column k at or below row k
        let mut pivot_row = k;
        let mut pivot_abs = aug[(k, k)].abs();
        for i in k + 1..n {
            let candidate = aug[(i, k)].abs();
            if candidate > pivot_abs {
                pivot_abs = candidate;
                pivot_row = i;
            }
        }

        if pivot_abs <= threshold {
            return Err(MathError::SingularMatrix);
        }
        if pivot_row != k {
            aug.swap_rows(k, pivot_row);
        }

        let pivot = aug[(k, k)];
        for j in 0..width {
            aug[(k, j)] /= pivot;
        }

        for i in 0..n {
            if i == k {
                continue;
            }
            let factor = aug[(i, k)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..width {
                aug[(i, j)] -= factor * aug[(k, j)];
            }
        }
    }

    let inverse = aug.view((0, n), (n, n)).into_owned();
    let solution = DVector::from_iterator(n, (0..n).map(|i| aug[(i, 2 * n)]));

    Ok((solution, inverse))
}

/// Solves a linear system `Ax = b` with the default solver.
pub fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    LinearSystemSolver::default()
        .solve(a, b)
        .map(|result| result.solution)
}

/// Relative residual `|Ax - b|∞ / max(1, |b|∞)`.
fn relative_residual(a: &DMatrix<f64>, x: &DVector<f64>, b: &DVector<f64>) -> f64 {
    let r = a * x - b;
    let r_norm = r.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let b_norm = b.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    r_norm / b_norm.max(1.0)
}

fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|v| v.is_finite())
}

fn check_square_system(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<()> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(MathError::invalid_input("Matrix must be square"));
    }
    if n != b.len() {
        return Err(MathError::dimension_mismatch((n, n), (b.len(), 1)));
    }
    Ok(())
}
