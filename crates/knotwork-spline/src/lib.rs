//! # Knotwork Spline
//!
//! Per-segment basis-spline calibration with analytic sensitivities.
//!
//! This crate provides:
//!
//! - **Basis Sets**: Polynomial, Bernstein, exponential and hyperbolic
//!   tension, and Kaklis-Pandelis families on the local interval `[0, 1]`
//! - **Shape Controllers**: Rational and exponential multipliers applied to
//!   the basis combination
//! - **Segments**: Calibration from edge values, edge derivatives and linear
//!   constraints, with roughness rows filling any unused degrees of freedom
//! - **Constraints**: Node weight constraints and their projection onto basis
//!   coefficients
//! - **Jacobians**: Sensitivities of coefficients, values and derivatives to
//!   every calibration input, from the inverse design matrix
//! - **Knot Insertion**: Splitting a calibrated segment and its calibration
//!   parameters at an internal knot
//!
//! ## Quick Start
//!
//! ```rust
//! use knotwork_spline::prelude::*;
//!
//! // Cubic segment on [1, 2] with C1 continuity
//! let mut segment = SegmentConfig::default().build(1.0, 2.0).unwrap();
//!
//! // Local left slope 0.5, roughness fills the last row
//! segment.calibrate(0.03, &[0.005], 0.035, &[]).unwrap();
//! assert!((segment.value_at(2.0).unwrap() - 0.035).abs() < 1e-12);
//!
//! // Sensitivity of y(1.5) to the right edge value
//! let jacobian = segment.value_jacobian(1.5).unwrap();
//! let d_right = jacobian.column(JacobianInput::RightValue).unwrap()[0];
//! assert!(d_right > 0.0 && d_right < 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]
#![allow(clippy::uninlined_format_args)]

pub mod basis;
pub mod config;
pub mod constraint;
pub mod error;
pub mod jacobian;
pub mod monotonicity;
pub mod params;
pub mod segment;
pub mod shape;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::basis::{BasisFamily, BasisFunctionSet};
    pub use crate::config::{SegmentConfig, Validate, ValidationError};
    pub use crate::constraint::{BasisFunctionConstraint, KnotPosition, NodeWeightConstraint};
    pub use crate::error::{SplineError, SplineResult};
    pub use crate::jacobian::{Jacobian, JacobianInput, JacobianPropagator};
    pub use crate::monotonicity::MonotoneType;
    pub use crate::params::CalibrationParams;
    pub use crate::segment::{DesignSystem, Segment};
    pub use crate::shape::ShapeController;
}

pub use error::{SplineError, SplineResult};
