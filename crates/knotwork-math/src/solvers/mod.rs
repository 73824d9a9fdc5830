//! Bracketed root finding.
//!
//! [`brent`] refines a single sign change; [`scan_roots`] walks a uniform grid
//! and hands every sign change it meets to [`brent`]. Monotonicity
//! classification of a segment runs [`scan_roots`] on its first derivative.

mod brent;

pub use brent::brent;

use crate::error::{MathError, MathResult};

/// Residual below which a root is accepted.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Step limit for a single bracket.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Stopping rules shared by the root finders.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Accept a point once `|f(x)|` falls below this.
    pub tolerance: f64,
    /// Give up after this many steps.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE, DEFAULT_MAX_ITERATIONS)
    }
}

impl SolverConfig {
    /// Stopping rules with an explicit residual and step limit.
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Replaces the residual tolerance.
    #[must_use]
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self { tolerance, ..self }
    }

    /// Replaces the step limit.
    #[must_use]
    pub fn with_max_iterations(self, max_iterations: u32) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }
}

/// A located root.
#[derive(Debug, Clone, Copy)]
pub struct SolverResult {
    /// Abscissa of the root.
    pub root: f64,
    /// Steps taken to reach it.
    pub iterations: u32,
    /// `f(root)`.
    pub residual: f64,
}

/// Finds the roots of `f` on `[a, b]` that show up as sign changes on a
/// uniform grid of `samples` intervals.
///
/// Grid points where `f` vanishes exactly are reported as roots directly.
/// Roots of even multiplicity that do not change sign between grid points
/// are not detected. Roots are returned in ascending order.
///
/// # Example
///
/// ```rust
/// use knotwork_math::solvers::{scan_roots, SolverConfig};
///
/// let roots = scan_roots(|x: f64| (x - 0.25) * (x - 0.6), 0.0, 1.0, 16, &SolverConfig::default()).unwrap();
/// assert_eq!(roots.len(), 2);
/// ```
pub fn scan_roots<F>(
    f: F,
    a: f64,
    b: f64,
    samples: usize,
    config: &SolverConfig,
) -> MathResult<Vec<f64>>
where
    F: Fn(f64) -> f64,
{
    if !(a < b) || !a.is_finite() || !b.is_finite() {
        return Err(MathError::invalid_input(format!(
            "scan interval [{a}, {b}] is empty or not finite"
        )));
    }
    if samples == 0 {
        return Err(MathError::invalid_input("scan needs at least one interval"));
    }

    let step = (b - a) / samples as f64;
    let mut roots: Vec<f64> = Vec::new();
    let mut x_prev = a;
    let mut f_prev = f(a);
    if f_prev == 0.0 {
        roots.push(a);
    }

    for k in 1..=samples {
        let x = if k == samples { b } else { a + step * k as f64 };
        let fx = f(x);

        if fx == 0.0 {
            roots.push(x);
        } else if f_prev != 0.0 && f_prev * fx < 0.0 {
            let result = brent(&f, x_prev, x, config)?;
            roots.push(result.root);
        }

        x_prev = x;
        f_prev = fx;
    }

    Ok(roots)
}
