//! Serializable segment design.
//!
//! A [`SegmentConfig`] describes everything about a segment except its domain
//! and calibration data, so a curve can stamp out segments of one design
//! across its knots. Configurations round-trip through JSON.

use serde::{Deserialize, Serialize};

use knotwork_math::linear_algebra::{
    SolveConfig, DEFAULT_PIVOT_TOLERANCE, DEFAULT_RESIDUAL_TOLERANCE,
};

use crate::basis::{BasisFamily, BasisFunctionSet};
use crate::error::{SplineError, SplineResult};
use crate::segment::Segment;
use crate::shape::ShapeController;

/// One failed check on a [`SegmentConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Config field at fault.
    pub field: &'static str,
    /// Short name of the violated rule, e.g. `basis_covers_continuity`.
    pub rule: &'static str,
    /// What was wrong with the value.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            rule,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.rule, self.message)
    }
}

/// Trait for validatable configurations.
pub trait Validate {
    /// Returns every validation error, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and folds all errors into one [`SplineError::InvalidInput`].
    fn validate_or_error(&self) -> SplineResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            return Ok(());
        }
        let reason = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(SplineError::invalid_input(reason))
    }
}

fn default_continuity() -> usize {
    1
}

fn default_roughness_order() -> usize {
    2
}

fn default_pivot_tolerance() -> f64 {
    DEFAULT_PIVOT_TOLERANCE
}

fn default_residual_tolerance() -> f64 {
    DEFAULT_RESIDUAL_TOLERANCE
}

/// Design of a segment: basis, continuity, roughness penalty, shape and
/// solver tolerances.
///
/// # Example
///
/// ```rust
/// use knotwork_spline::config::SegmentConfig;
///
/// let config = SegmentConfig::from_json_str(r#"{"basis":{"family":"bernstein","num_basis":5}}"#).unwrap();
/// assert_eq!(config.continuity, 1);
///
/// let segment = config.build(0.0, 0.5).unwrap();
/// assert_eq!(segment.num_basis(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Basis family and parameters.
    #[serde(default)]
    pub basis: BasisFamily,

    /// Continuity order Ck at the segment edges.
    #[serde(default = "default_continuity")]
    pub continuity: usize,

    /// Derivative order penalized by roughness rows.
    #[serde(default = "default_roughness_order")]
    pub roughness_order: usize,

    /// Optional shape controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeController>,

    /// Relative pivot tolerance of the linear solver.
    #[serde(default = "default_pivot_tolerance")]
    pub pivot_tolerance: f64,

    /// Relative residual tolerance of the linear solver.
    #[serde(default = "default_residual_tolerance")]
    pub residual_tolerance: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            basis: BasisFamily::default(),
            continuity: default_continuity(),
            roughness_order: default_roughness_order(),
            shape: None,
            pivot_tolerance: default_pivot_tolerance(),
            residual_tolerance: default_residual_tolerance(),
        }
    }
}

impl SegmentConfig {
    /// Creates a configuration for the given basis with default settings.
    #[must_use]
    pub fn new(basis: BasisFamily) -> Self {
        Self {
            basis,
            ..Self::default()
        }
    }

    /// Sets the continuity order.
    #[must_use]
    pub fn with_continuity(mut self, continuity: usize) -> Self {
        self.continuity = continuity;
        self
    }

    /// Sets the roughness order.
    #[must_use]
    pub fn with_roughness_order(mut self, order: usize) -> Self {
        self.roughness_order = order;
        self
    }

    /// Sets the shape controller.
    #[must_use]
    pub fn with_shape(mut self, shape: ShapeController) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Sets the solver tolerances.
    #[must_use]
    pub fn with_tolerances(mut self, pivot: f64, residual: f64) -> Self {
        self.pivot_tolerance = pivot;
        self.residual_tolerance = residual;
        self
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> SplineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SplineError::invalid_input(format!("segment config: {e}")))
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> SplineResult<String> {
        serde_json::to_string(self)
            .map_err(|e| SplineError::invalid_input(format!("segment config: {e}")))
    }

    /// Builds an uncalibrated segment on `[left, right]`.
    pub fn build(&self, left: f64, right: f64) -> SplineResult<Segment> {
        self.validate_or_error()?;

        let basis = BasisFunctionSet::new(self.basis)?;
        let segment = Segment::new(left, right, basis, self.continuity, self.roughness_order)?
            .with_solver(SolveConfig::new(self.pivot_tolerance, self.residual_tolerance));

        Ok(match self.shape {
            Some(shape) => segment.with_shape(shape.validated()?),
            None => segment,
        })
    }
}

impl Validate for SegmentConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = BasisFunctionSet::new(self.basis) {
            errors.push(ValidationError::new("basis", "valid_basis", e.to_string()));
        }

        if self.basis.num_basis() < self.continuity + 2 {
            errors.push(ValidationError::new(
                "continuity",
                "basis_covers_continuity",
                format!(
                    "Continuity order {} needs at least {} basis functions, basis has {}",
                    self.continuity,
                    self.continuity + 2,
                    self.basis.num_basis()
                ),
            ));
        }

        if let Some(shape) = self.shape {
            if let Err(e) = shape.validated() {
                errors.push(ValidationError::new("shape", "valid_shape", e.to_string()));
            }
        }

        for (field, value) in [
            ("pivot_tolerance", self.pivot_tolerance),
            ("residual_tolerance", self.residual_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                errors.push(ValidationError::new(
                    field,
                    "positive_tolerance",
                    format!("tolerance must be finite and positive, got {value}"),
                ));
            }
        }

        errors
    }
}
