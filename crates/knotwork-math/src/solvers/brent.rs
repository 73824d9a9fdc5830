//! Brent's root-finding algorithm.

use crate::error::{MathError, MathResult};
use crate::solvers::{SolverConfig, SolverResult};

/// Brent's root-finding algorithm.
///
/// Keeps a sign-changing bracket `[b, c]` and steps by inverse quadratic
/// interpolation or secant when the step stays well inside the bracket,
/// bisecting otherwise. Used to pin down the stationary points of calibrated
/// segments, where only a bracket is known.
///
/// Stops when `|f(b)|` drops below the configured tolerance or the bracket
/// shrinks to machine precision. An endpoint where `f` vanishes is returned
/// directly.
///
/// # Arguments
///
/// * `f` - The function for which to find a root
/// * `lower` - Lower bound of the bracket
/// * `upper` - Upper bound of the bracket
/// * `config` - Solver configuration
///
/// # Returns
///
/// The root and iteration statistics, or an error if the bracket is invalid.
///
/// # Example
///
/// ```rust
/// use knotwork_math::solvers::{brent, SolverConfig};
///
/// // Stationary point of x^3 - 3x on [0.5, 2]: derivative 3x^2 - 3
/// let df = |x: f64| 3.0 * x * x - 3.0;
///
/// let result = brent(df, 0.5, 2.0, &SolverConfig::default()).unwrap();
/// assert!((result.root - 1.0).abs() < 1e-10);
/// ```
pub fn brent<F>(f: F, lower: f64, upper: f64, config: &SolverConfig) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = (lower, upper);
    let (mut fa, mut fb) = (f(a), f(b));

    for (x, fx) in [(a, fa), (b, fb)] {
        if fx == 0.0 {
            return Ok(SolverResult {
                root: x,
                iterations: 0,
                residual: 0.0,
            });
        }
    }
    if fa * fb > 0.0 {
        return Err(MathError::InvalidBracket { a, b, fa, fb });
    }

    // b is the best estimate, c the contrapoint keeping the sign change
    let (mut c, mut fc) = (a, fa);
    let mut step = b - a;
    let mut previous_step = step;

    for iteration in 0..config.max_iterations {
        if fb * fc > 0.0 {
            c = a;
            fc = fa;
            step = b - a;
            previous_step = step;
        }
        if fc.abs() < fb.abs() {
            a = b;
            fa = fb;
            b = c;
            fb = fc;
            c = a;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs().max(1.0);
        let half = 0.5 * (c - b);
        if fb.abs() < config.tolerance || half.abs() <= tol {
            return Ok(SolverResult {
                root: b,
                iterations: iteration,
                residual: fb,
            });
        }

        if previous_step.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // secant
                (2.0 * half * s, 1.0 - s)
            } else {
                // inverse quadratic interpolation
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * half * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }

            let limit = (3.0 * half * q - (tol * q).abs()).min((previous_step * q).abs());
            if 2.0 * p < limit {
                previous_step = step;
                step = p / q;
            } else {
                step = half;
                previous_step = half;
            }
        } else {
            step = half;
            previous_step = half;
        }

        a = b;
        fa = fb;
        b += if step.abs() > tol {
            step
        } else {
            tol.copysign(half)
        };
        fb = f(b);
    }

    Err(MathError::convergence_failed(
        config.max_iterations,
        fb.abs(),
    ))
}
