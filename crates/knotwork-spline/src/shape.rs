//! Shape controllers.
//!
//! A shape controller `S(x)` multiplies the basis combination of a segment,
//! `y(x) = S(x) Σ cᵢ Bᵢ(x)`, to dampen or enhance the local shape. The
//! calibration rows are built from the shaped functions `S·Bᵢ`, so edge
//! values and continuity derivatives are still reproduced exactly.

use serde::{Deserialize, Serialize};

use crate::basis::falling_factorial;
use crate::error::{SplineError, SplineResult};

/// Univariate multiplier on local `x ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeController {
    /// `1 / (1 + λx)`.
    RationalLinear {
        /// Shape parameter λ (`λ > -1`).
        lambda: f64,
    },
    /// `1 / (1 + λx(1-x))`.
    RationalQuadratic {
        /// Shape parameter λ (`λ > -4`).
        lambda: f64,
    },
    /// `e^(-λx)`.
    Exponential {
        /// Shape parameter λ.
        lambda: f64,
    },
}

impl ShapeController {
    /// Creates a rational linear controller.
    pub fn rational_linear(lambda: f64) -> SplineResult<Self> {
        Self::RationalLinear { lambda }.validated()
    }

    /// Creates a rational quadratic controller.
    pub fn rational_quadratic(lambda: f64) -> SplineResult<Self> {
        Self::RationalQuadratic { lambda }.validated()
    }

    /// Creates an exponential controller.
    pub fn exponential(lambda: f64) -> SplineResult<Self> {
        Self::Exponential { lambda }.validated()
    }

    /// Checks that the controller stays finite and positive on `[0, 1]`.
    pub fn validated(self) -> SplineResult<Self> {
        let (lambda, lower) = match self {
            Self::RationalLinear { lambda } => (lambda, -1.0),
            Self::RationalQuadratic { lambda } => (lambda, -4.0),
            Self::Exponential { lambda } => (lambda, f64::NEG_INFINITY),
        };
        if !lambda.is_finite() || lambda <= lower {
            return Err(SplineError::invalid_input(format!(
                "shape parameter {lambda} makes {self:?} singular on [0, 1]"
            )));
        }
        Ok(self)
    }

    /// Value of the controller at local `x`.
    #[must_use]
    pub fn value(&self, x: f64) -> f64 {
        self.derivatives(x, 0)[0]
    }

    /// Derivatives of orders `0..=max_order` at local `x`.
    #[must_use]
    pub fn derivatives(&self, x: f64, max_order: usize) -> Vec<f64> {
        match *self {
            Self::RationalLinear { lambda } => {
                let q = 1.0 + lambda * x;
                (0..=max_order)
                    .map(|m| {
                        let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
                        sign * falling_factorial(m, m) * lambda.powi(m as i32)
                            / q.powi(m as i32 + 1)
                    })
                    .collect()
            }
            Self::RationalQuadratic { lambda } => {
                // S·q = 1 with q = 1 + λx - λx²; differentiate with Leibniz
                let q = 1.0 + lambda * x * (1.0 - x);
                let dq = lambda * (1.0 - 2.0 * x);
                let d2q = -2.0 * lambda;
                let mut out: Vec<f64> = Vec::with_capacity(max_order + 1);
                for m in 0..=max_order {
                    let value = match m {
                        0 => 1.0 / q,
                        1 => -(out[0] * dq) / q,
                        _ => {
                            let mf = m as f64;
                            -(mf * out[m - 1] * dq + 0.5 * mf * (mf - 1.0) * out[m - 2] * d2q) / q
                        }
                    };
                    out.push(value);
                }
                out
            }
            Self::Exponential { lambda } => {
                let e = (-lambda * x).exp();
                (0..=max_order)
                    .map(|m| (-lambda).powi(m as i32) * e)
                    .collect()
            }
        }
    }
}
