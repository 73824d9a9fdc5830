//! Basis function sets.
//!
//! A segment represents its interpolant as a linear combination of
//! elementary functions on the local coordinate `x ∈ [0, 1]`. This module
//! provides the families used for curve construction; each family is
//! validated when the set is built and can be differentiated to any order.
//!
//! | Family | Functions | Count |
//! |--------|-----------|-------|
//! | Polynomial | `x^i` | `n` |
//! | Bernstein | `C(n-1,i) x^i (1-x)^(n-1-i)` | `n` |
//! | Exponential tension | `1, x, e^(τx), e^(-τx)` | 4 |
//! | Hyperbolic tension | `1, x, cosh(τx), sinh(τx)` | 4 |
//! | Kaklis-Pandelis | `1-x, x, x(1-x)^m, x^m(1-x)` | 4 |

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use knotwork_math::quadrature::GaussLegendre;

use crate::error::{SplineError, SplineResult};

/// Fewest Gauss-Legendre points used for roughness integrals.
const MIN_QUADRATURE_POINTS: usize = 24;

/// Basis family selection with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum BasisFamily {
    /// Monomials `x^i`, `i = 0..num_basis`.
    Polynomial {
        /// Number of basis functions.
        num_basis: usize,
    },
    /// Bernstein polynomials of degree `num_basis - 1`.
    Bernstein {
        /// Number of basis functions.
        num_basis: usize,
    },
    /// `{1, x, e^(τx), e^(-τx)}`.
    ExponentialTension {
        /// Tension parameter τ.
        tension: f64,
    },
    /// `{1, x, cosh(τx), sinh(τx)}`.
    HyperbolicTension {
        /// Tension parameter τ.
        tension: f64,
    },
    /// `{1-x, x, x(1-x)^m, x^m(1-x)}`.
    KaklisPandelis {
        /// Polynomial degree `m` of the shape terms.
        degree: usize,
    },
}

impl Default for BasisFamily {
    fn default() -> Self {
        Self::Polynomial { num_basis: 4 }
    }
}

impl BasisFamily {
    /// Number of functions this family produces.
    #[must_use]
    pub fn num_basis(&self) -> usize {
        match self {
            Self::Polynomial { num_basis } | Self::Bernstein { num_basis } => *num_basis,
            Self::ExponentialTension { .. }
            | Self::HyperbolicTension { .. }
            | Self::KaklisPandelis { .. } => 4,
        }
    }

    /// Short family name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Polynomial { .. } => "polynomial",
            Self::Bernstein { .. } => "bernstein",
            Self::ExponentialTension { .. } => "exponential_tension",
            Self::HyperbolicTension { .. } => "hyperbolic_tension",
            Self::KaklisPandelis { .. } => "kaklis_pandelis",
        }
    }

    fn validate(&self) -> SplineResult<()> {
        match *self {
            Self::Polynomial { num_basis } | Self::Bernstein { num_basis } => {
                if num_basis == 0 {
                    return Err(SplineError::invalid_input(format!(
                        "{} basis needs at least one function",
                        self.name()
                    )));
                }
            }
            Self::ExponentialTension { tension } | Self::HyperbolicTension { tension } => {
                if !tension.is_finite() || tension <= 0.0 {
                    return Err(SplineError::invalid_input(format!(
                        "{} basis needs a finite positive tension, got {tension}",
                        self.name()
                    )));
                }
            }
            Self::KaklisPandelis { degree } => {
                if degree < 2 {
                    return Err(SplineError::invalid_input(format!(
                        "Kaklis-Pandelis degree must be at least 2, got {degree}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A validated, ordered set of basis functions on `[0, 1]`.
///
/// # Example
///
/// ```rust
/// use knotwork_spline::basis::BasisFunctionSet;
///
/// let basis = BasisFunctionSet::polynomial(4).unwrap();
/// assert_eq!(basis.evaluate_all(0.5, 0), vec![1.0, 0.5, 0.25, 0.125]);
/// assert_eq!(basis.evaluate_all(0.5, 2), vec![0.0, 0.0, 2.0, 3.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BasisFamily", into = "BasisFamily")]
pub struct BasisFunctionSet {
    family: BasisFamily,
}

impl TryFrom<BasisFamily> for BasisFunctionSet {
    type Error = SplineError;

    fn try_from(family: BasisFamily) -> SplineResult<Self> {
        Self::new(family)
    }
}

impl From<BasisFunctionSet> for BasisFamily {
    fn from(set: BasisFunctionSet) -> Self {
        set.family
    }
}

impl BasisFunctionSet {
    /// Builds the set for a family, rejecting degenerate parameters.
    pub fn new(family: BasisFamily) -> SplineResult<Self> {
        family.validate()?;
        Ok(Self { family })
    }

    /// Monomial basis with `num_basis` functions.
    pub fn polynomial(num_basis: usize) -> SplineResult<Self> {
        Self::new(BasisFamily::Polynomial { num_basis })
    }

    /// Bernstein basis of degree `num_basis - 1`.
    pub fn bernstein(num_basis: usize) -> SplineResult<Self> {
        Self::new(BasisFamily::Bernstein { num_basis })
    }

    /// Exponential tension basis.
    pub fn exponential_tension(tension: f64) -> SplineResult<Self> {
        Self::new(BasisFamily::ExponentialTension { tension })
    }

    /// Hyperbolic tension basis.
    pub fn hyperbolic_tension(tension: f64) -> SplineResult<Self> {
        Self::new(BasisFamily::HyperbolicTension { tension })
    }

    /// Kaklis-Pandelis basis of the given shape degree.
    pub fn kaklis_pandelis(degree: usize) -> SplineResult<Self> {
        Self::new(BasisFamily::KaklisPandelis { degree })
    }

    /// The family and parameters of this set.
    #[must_use]
    pub fn family(&self) -> &BasisFamily {
        &self.family
    }

    /// Number of basis functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.family.num_basis()
    }

    /// Always false: construction rejects empty sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Derivative of the given order of basis function `index` at `x`.
    ///
    /// Order 0 is the function value. Returns `None` for an index outside
    /// the set.
    #[must_use]
    pub fn evaluate(&self, index: usize, x: f64, order: usize) -> Option<f64> {
        (index < self.len()).then(|| self.eval_unchecked(index, x, order))
    }

    /// Derivatives of the given order of every basis function at `x`.
    #[must_use]
    pub fn evaluate_all(&self, x: f64, order: usize) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.eval_unchecked(i, x, order))
            .collect()
    }

    /// Gram matrix `∫₀¹ Bᵢ^(p)(x)·Bⱼ^(p)(x) dx` of the order-`p` derivatives.
    ///
    /// Exact for the polynomial families.
    pub fn roughness_gram(&self, order: usize) -> SplineResult<DMatrix<f64>> {
        gram(self.len(), |x| self.evaluate_all(x, order))
    }

    fn eval_unchecked(&self, index: usize, x: f64, order: usize) -> f64 {
        match self.family {
            BasisFamily::Polynomial { .. } => monomial(index, x, order),
            BasisFamily::Bernstein { num_basis } => bernstein(index, num_basis - 1, x, order),
            BasisFamily::ExponentialTension { tension } => match index {
                0 | 1 => monomial(index, x, order),
                2 => tension.powi(order as i32) * (tension * x).exp(),
                _ => (-tension).powi(order as i32) * (-tension * x).exp(),
            },
            BasisFamily::HyperbolicTension { tension } => {
                let scale = tension.powi(order as i32);
                let even = order % 2 == 0;
                match index {
                    0 | 1 => monomial(index, x, order),
                    2 if even => scale * (tension * x).cosh(),
                    2 => scale * (tension * x).sinh(),
                    _ if even => scale * (tension * x).sinh(),
                    _ => scale * (tension * x).cosh(),
                }
            }
            BasisFamily::KaklisPandelis { degree } => kaklis_pandelis(index, degree, x, order),
        }
    }
}

/// Symmetric `n×n` matrix of `∫₀¹ fᵢ·fⱼ` where `eval(x)` returns every `fᵢ(x)`.
pub(crate) fn gram<F>(n: usize, eval: F) -> SplineResult<DMatrix<f64>>
where
    F: Fn(f64) -> Vec<f64>,
{
    let rule = GaussLegendre::new(MIN_QUADRATURE_POINTS.max(n + 1))?;
    let mut out = DMatrix::zeros(n, n);
    for (x, w) in rule.unit_interval() {
        let f = eval(x);
        for i in 0..n {
            for j in i..n {
                out[(i, j)] += w * f[i] * f[j];
            }
        }
    }
    for i in 0..n {
        for j in 0..i {
            out[(i, j)] = out[(j, i)];
        }
    }
    Ok(out)
}

/// `n (n-1) ... (n-m+1)`, zero when `m > n`.
pub(crate) fn falling_factorial(n: usize, m: usize) -> f64 {
    if m > n {
        return 0.0;
    }
    ((n - m + 1)..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Binomial coefficient `C(n, k)` as a float.
pub(crate) fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

fn monomial(power: usize, x: f64, order: usize) -> f64 {
    if order > power {
        return 0.0;
    }
    falling_factorial(power, order) * x.powi((power - order) as i32)
}

fn bernstein_value(k: isize, degree: usize, x: f64) -> f64 {
    if k < 0 || k as usize > degree {
        return 0.0;
    }
    let k = k as usize;
    binomial(degree, k) * x.powi(k as i32) * (1.0 - x).powi((degree - k) as i32)
}

fn bernstein(k: usize, degree: usize, x: f64, order: usize) -> f64 {
    if order > degree {
        return 0.0;
    }
    let lower = degree - order;
    let sum: f64 = (0..=order)
        .map(|j| {
            let sign = if (order - j) % 2 == 0 { 1.0 } else { -1.0 };
            sign * binomial(order, j) * bernstein_value(k as isize - j as isize, lower, x)
        })
        .sum();
    falling_factorial(degree, order) * sum
}

fn kaklis_pandelis(index: usize, m: usize, x: f64, order: usize) -> f64 {
    // k-th derivative of (1-x)^m
    let g = |k: usize| {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        if k > m {
            0.0
        } else {
            sign * falling_factorial(m, k) * (1.0 - x).powi((m - k) as i32)
        }
    };
    let k = order as f64;
    match index {
        0 => match order {
            0 => 1.0 - x,
            1 => -1.0,
            _ => 0.0,
        },
        1 => monomial(1, x, order),
        2 if order == 0 => x * g(0),
        2 => x * g(order) + k * g(order - 1),
        _ if order == 0 => (1.0 - x) * monomial(m, x, 0),
        _ => (1.0 - x) * monomial(m, x, order) - k * monomial(m, x, order - 1),
    }
}
