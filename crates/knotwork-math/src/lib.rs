//! # Knotwork Math
//!
//! Numerical primitives for the Knotwork segment calibration engine.
//!
//! This crate provides:
//!
//! - **Linear Algebra**: Dense square solver returning solution and inverse,
//!   with an inversion strategy and a Gaussian-elimination fallback
//! - **Solvers**: Brent root finding and grid scanning for sign changes
//! - **Quadrature**: Gauss-Legendre rules for roughness-penalty integrals
//!
//! ## Design Philosophy
//!
//! - **Explicit failure**: Every routine reports singularity or bad input
//!   through [`MathError`], never by panicking
//! - **Determinism**: Identical inputs give bit-identical outputs

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::if_not_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::single_match_else)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::derivable_impls)]

pub mod error;
pub mod linear_algebra;
pub mod quadrature;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::{
        gauss_jordan, solve_linear_system, LinearSolution, LinearSystemSolver, SolveConfig,
        SolveStrategy,
    };
    pub use crate::quadrature::GaussLegendre;
    pub use crate::solvers::{brent, scan_roots, SolverConfig, SolverResult};
}

pub use error::{MathError, MathResult};
