//! Integration tests for segment calibration.
//!
//! These tests verify the properties every calibrated segment must satisfy:
//! - Edge values are reproduced exactly
//! - Chained segments agree in value and derivatives up to Ck at the knot
//! - Constraints hold after calibration in both dual forms
//! - The design system is always square, roughness rows fill the remainder
//! - Repeated calibration is bit-identical

use approx::assert_relative_eq;
use proptest::prelude::*;

use knotwork_math::linear_algebra::{SolveConfig, SolveStrategy};
use knotwork_spline::prelude::*;

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

fn all_families() -> Vec<BasisFamily> {
    vec![
        BasisFamily::Polynomial { num_basis: 4 },
        BasisFamily::Polynomial { num_basis: 6 },
        BasisFamily::Bernstein { num_basis: 4 },
        BasisFamily::Bernstein { num_basis: 5 },
        BasisFamily::ExponentialTension { tension: 0.5 },
        BasisFamily::ExponentialTension { tension: 3.0 },
        BasisFamily::HyperbolicTension { tension: 1.0 },
        BasisFamily::KaklisPandelis { degree: 2 },
        BasisFamily::KaklisPandelis { degree: 4 },
    ]
}

fn shapes() -> Vec<Option<ShapeController>> {
    vec![
        None,
        Some(ShapeController::rational_linear(0.7).unwrap()),
        Some(ShapeController::rational_quadratic(1.5).unwrap()),
        Some(ShapeController::exponential(-0.8).unwrap()),
    ]
}

fn segment(family: BasisFamily, shape: Option<ShapeController>, left: f64, right: f64) -> Segment {
    let config = SegmentConfig::new(family);
    let config = match shape {
        Some(shape) => config.with_shape(shape),
        None => config,
    };
    config.build(left, right).unwrap()
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn test_two_point_linear_segment() {
    let mut s = SegmentConfig::new(BasisFamily::Polynomial { num_basis: 2 })
        .with_continuity(0)
        .build(1.0, 1.5)
        .unwrap();

    s.calibrate(25.0, &[], 16.0, &[]).unwrap();

    assert_eq!(s.coefficients().unwrap(), &[25.0, -9.0]);
    assert_relative_eq!(s.value_at(1.25).unwrap(), 20.5, epsilon = 1e-12);
    assert_relative_eq!(s.derivative_at(1.25, 1).unwrap(), -18.0, epsilon = 1e-12);
}

#[test]
fn test_constraint_replaces_one_non_edge_row() {
    let plain = SegmentConfig::default().build(0.0, 1.0).unwrap();
    let constrained = plain
        .clone()
        .with_constraint(NodeWeightConstraint::new(vec![0.25], vec![1.0], 5.0).unwrap())
        .unwrap();

    let before = plain.assemble(1.0, &[0.0], 2.0, &[]).unwrap();
    let after = constrained.assemble(1.0, &[0.0], 2.0, &[]).unwrap();

    assert_eq!(before.matrix.nrows(), 4);
    assert_eq!(after.matrix.nrows(), 4);
    for row in 0..2 {
        assert_eq!(before.matrix.row(row), after.matrix.row(row));
        assert_eq!(before.rhs[row], after.rhs[row]);
        assert_eq!(before.rows[row], after.rows[row]);
    }

    assert_eq!(
        before.rows,
        vec![
            JacobianInput::LeftValue,
            JacobianInput::RightValue,
            JacobianInput::LeftDerivative(1),
            JacobianInput::Roughness(3),
        ]
    );
    assert_eq!(
        after.rows,
        vec![
            JacobianInput::LeftValue,
            JacobianInput::RightValue,
            JacobianInput::Constraint(0),
            JacobianInput::LeftDerivative(1),
        ]
    );
    assert_eq!(before.matrix.row(2), after.matrix.row(3));
    assert_eq!(after.matrix.row(2).iter().copied().collect::<Vec<_>>(), vec![1.0, 0.25, 0.0625, 0.015625]);
    assert_eq!(after.rhs[2], 5.0);
}

// =============================================================================
// PROPERTIES
// =============================================================================

#[test]
fn test_edge_reproduction_all_families_and_shapes() {
    for family in all_families() {
        for shape in shapes() {
            let mut s = segment(family, shape, 0.5, 2.0);
            s.calibrate(0.031, &[0.004], 0.047, &[]).unwrap();

            assert_relative_eq!(s.value_at(0.5).unwrap(), 0.031, epsilon = 1e-12);
            assert_relative_eq!(s.value_at(2.0).unwrap(), 0.047, epsilon = 1e-12);
            // local 0.004 over a width of 1.5
            assert_relative_eq!(
                s.derivative_at(0.5, 1).unwrap(),
                0.004 / 1.5,
                epsilon = 1e-10
            );
        }
    }
}

#[test]
fn test_continuity_across_chained_segments() {
    let knots = [0.0, 0.5, 1.0, 2.0, 5.0];
    let values = [0.02, 0.025, 0.03, 0.028, 0.035];

    for family in [
        BasisFamily::Polynomial { num_basis: 6 },
        BasisFamily::Bernstein { num_basis: 6 },
    ] {
        let config = SegmentConfig::new(family).with_continuity(2).with_roughness_order(3);
        let mut chain: Vec<Segment> = Vec::new();
        for i in 0..knots.len() - 1 {
            let mut s = config.build(knots[i], knots[i + 1]).unwrap();
            match chain.last() {
                None => s.calibrate(values[0], &[0.0, 0.0], values[1], &[]).unwrap(),
                Some(prev) => s.calibrate_chained(Some(prev), values[i + 1]).unwrap(),
            }
            chain.push(s);
        }

        for pair in chain.windows(2) {
            let knot = pair[0].right();
            for order in 0..=2 {
                let left = pair[0].derivative_at(knot, order).unwrap();
                let right = pair[1].derivative_at(knot, order).unwrap();
                assert_relative_eq!(left, right, epsilon = 1e-9, max_relative = 1e-8);
            }
            assert!(pair[1].derivative_at(knot, 3).is_err());
        }
    }
}

#[test]
fn test_constraint_duality_after_calibration() {
    let constraint =
        NodeWeightConstraint::new(vec![1.2, 1.7, 1.9], vec![0.5, -1.0, 2.0], 0.08).unwrap();

    for family in [
        BasisFamily::Polynomial { num_basis: 5 },
        BasisFamily::Bernstein { num_basis: 5 },
    ] {
        for shape in shapes() {
            let mut s = segment(family, shape, 1.0, 2.0)
                .with_constraint(constraint.clone())
                .unwrap();
            s.calibrate(0.03, &[0.0], 0.04, &[]).unwrap();

            let global = constraint.evaluate_on(&s).unwrap();
            let projected = constraint.project(&s).unwrap();
            let coefficient_space = projected.evaluate(s.coefficients().unwrap()).unwrap();

            assert_relative_eq!(global, 0.08, epsilon = 1e-10);
            assert_relative_eq!(coefficient_space, global, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_row_count_invariant() {
    let s = SegmentConfig::new(BasisFamily::Polynomial { num_basis: 6 })
        .with_continuity(1)
        .build(0.0, 1.0)
        .unwrap()
        .with_constraint(NodeWeightConstraint::node(0.3, 1.0).unwrap())
        .unwrap();

    // 2 edges + 1 constraint + 1 left derivative, 2 roughness rows
    let system = s.assemble(0.0, &[1.0], 2.0, &[]).unwrap();
    assert_eq!(system.rows.len(), 6);
    assert_eq!(system.roughness_rows(), 2);

    // one right derivative takes a roughness slot
    let system = s.assemble(0.0, &[1.0], 2.0, &[0.5]).unwrap();
    assert_eq!(system.roughness_rows(), 1);
    assert_eq!(system.rows[4], JacobianInput::RightDerivative(1));

    // exactly full
    let system = s.assemble(0.0, &[1.0], 2.0, &[0.5, 0.1]).unwrap();
    assert_eq!(system.roughness_rows(), 0);
    assert_eq!(system.matrix.shape(), (6, 6));

    // overfull
    assert!(matches!(
        s.assemble(0.0, &[1.0], 2.0, &[0.5, 0.1, 0.0]),
        Err(SplineError::InsufficientBasisCount {
            required: 7,
            available: 6
        })
    ));
}

#[test]
fn test_calibrate_params_with_interior_nodes() {
    let params = CalibrationParams::new(vec![1.0, 1.5, 2.5, 3.0], vec![0.03, 0.034, 0.039, 0.04])
        .unwrap()
        .with_left_derivatives(vec![0.01])
        .unwrap();

    let mut s = SegmentConfig::new(BasisFamily::Polynomial { num_basis: 6 })
        .build(1.0, 3.0)
        .unwrap();
    s.calibrate_params(&params).unwrap();

    for (x, y) in params.ordinates().iter().zip(params.values()) {
        assert_relative_eq!(s.value_at(*x).unwrap(), *y, epsilon = 1e-12);
    }
    assert_relative_eq!(s.derivative_at(1.0, 1).unwrap(), 0.01, epsilon = 1e-10);

    let inputs = s.coefficient_jacobian().unwrap();
    assert_eq!(inputs.inputs()[2], JacobianInput::Constraint(0));
    assert_eq!(inputs.inputs()[4], JacobianInput::LeftDerivative(1));
}

#[test]
fn test_calibrate_params_rejects_mismatched_domain() {
    let params = CalibrationParams::new(vec![1.0, 2.0], vec![0.03, 0.04]).unwrap();
    let mut s = SegmentConfig::default().build(1.0, 3.0).unwrap();

    assert!(matches!(
        s.calibrate_params(&params),
        Err(SplineError::InvalidInput { .. })
    ));
    assert!(!s.is_calibrated());
}

#[test]
fn test_calibrate_params_requires_left_derivatives() {
    let mut s = SegmentConfig::default().build(0.0, 1.0).unwrap();
    s.calibrate(1.0, &[0.4], 2.0, &[]).unwrap();
    let coefficients = s.coefficients().unwrap().to_vec();
    let jacobian = s.coefficient_jacobian().unwrap();

    let bare = CalibrationParams::new(vec![0.0, 1.0], vec![1.0, 2.0]).unwrap();
    assert!(matches!(
        s.calibrate_params(&bare),
        Err(SplineError::InvalidInput { .. })
    ));

    // previous coefficients and inverse survive the failure
    assert_eq!(s.coefficients().unwrap(), coefficients.as_slice());
    assert_eq!(s.coefficient_jacobian().unwrap(), jacobian);

    let full = bare.with_left_derivatives(vec![0.4]).unwrap();
    s.calibrate_params(&full).unwrap();
    assert_eq!(
        s.coefficient_jacobian().unwrap().inputs(),
        &[
            JacobianInput::LeftValue,
            JacobianInput::RightValue,
            JacobianInput::LeftDerivative(1),
            JacobianInput::Roughness(3),
        ]
    );
}

#[test]
fn test_failed_calibrate_params_keeps_previous_state() {
    let mut s = SegmentConfig::new(BasisFamily::Polynomial { num_basis: 4 })
        .build(0.0, 1.0)
        .unwrap();
    s.calibrate(1.0, &[0.4], 2.0, &[]).unwrap();
    let coefficients = s.coefficients().unwrap().to_vec();

    // three interior nodes plus edges and a slope overflow four basis functions
    let crowded = CalibrationParams::new(vec![0.0, 0.2, 0.5, 0.8, 1.0], vec![1.0; 5])
        .unwrap()
        .with_left_derivatives(vec![0.0])
        .unwrap();
    assert!(matches!(
        s.calibrate_params(&crowded),
        Err(SplineError::InsufficientBasisCount { .. })
    ));

    assert_eq!(s.coefficients().unwrap(), coefficients.as_slice());
    assert!(s.coefficient_jacobian().is_ok());
}

#[test]
fn test_chained_from_lower_continuity_fails_cleanly() {
    let mut c0 = SegmentConfig::new(BasisFamily::Polynomial { num_basis: 4 })
        .with_continuity(0)
        .build(0.0, 1.0)
        .unwrap();
    c0.calibrate(1.0, &[], 2.0, &[]).unwrap();

    let mut c1 = SegmentConfig::default().build(1.0, 2.0).unwrap();
    c1.calibrate(2.0, &[0.1], 3.0, &[]).unwrap();
    let coefficients = c1.coefficients().unwrap().to_vec();

    assert!(matches!(
        c1.calibrate_chained(Some(&c0), 4.0),
        Err(SplineError::DiscontinuousDerivativeRequest { .. })
    ));
    assert_eq!(c1.coefficients().unwrap(), coefficients.as_slice());
    assert!(c1.coefficient_jacobian().is_ok());
}

#[test]
fn test_solver_fallback_matches_primary() {
    // a pivot tolerance above any entry makes elimination fail, so the
    // solve falls back to inversion
    let rejecting = SolveConfig::default()
        .with_primary(SolveStrategy::GaussianElimination)
        .with_pivot_tolerance(2.0);

    for family in all_families() {
        let mut direct = segment(family, None, 0.5, 2.0);
        let mut fallback = segment(family, None, 0.5, 2.0).with_solver(rejecting);

        direct.calibrate(0.3, &[0.2], 0.9, &[]).unwrap();
        fallback.calibrate(0.3, &[0.2], 0.9, &[]).unwrap();

        for (a, b) in direct
            .coefficients()
            .unwrap()
            .iter()
            .zip(fallback.coefficients().unwrap())
        {
            assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-9);
        }
        assert_relative_eq!(fallback.value_at(2.0).unwrap(), 0.9, epsilon = 1e-10);
    }
}

#[test]
fn test_singular_design_is_reported() {
    // two conflicting node constraints at the same ordinate
    let mut s = SegmentConfig::new(BasisFamily::Polynomial { num_basis: 4 })
        .with_continuity(0)
        .build(0.0, 1.0)
        .unwrap()
        .with_constraint(NodeWeightConstraint::node(0.5, 1.0).unwrap())
        .unwrap()
        .with_constraint(NodeWeightConstraint::node(0.5, 3.0).unwrap())
        .unwrap();

    assert!(matches!(
        s.calibrate(0.0, &[], 2.0, &[]),
        Err(SplineError::SingularSystem { .. })
    ));
    assert!(!s.is_calibrated());
}

#[test]
fn test_monotonicity_of_chained_curve() {
    let mut s = SegmentConfig::default().build(0.0, 1.0).unwrap();
    s.calibrate(0.02, &[0.01], 0.03, &[]).unwrap();

    assert!(s.monotone_type().unwrap().is_monotone());
    assert!(s.roughness(2).unwrap() > -1e-15);
}

// =============================================================================
// PROPERTY-BASED TESTS
// =============================================================================

proptest! {
    #[test]
    fn prop_calibration_is_idempotent(
        y_left in -10.0f64..10.0,
        y_right in -10.0f64..10.0,
        slope in -5.0f64..5.0,
        family_index in 0usize..9,
    ) {
        let family = all_families()[family_index];
        let mut a = segment(family, None, 0.0, 1.0);
        a.calibrate(y_left, &[slope], y_right, &[]).unwrap();
        let first: Vec<u64> = a.coefficients().unwrap().iter().map(|c| c.to_bits()).collect();

        a.calibrate(y_left, &[slope], y_right, &[]).unwrap();
        let second: Vec<u64> = a.coefficients().unwrap().iter().map(|c| c.to_bits()).collect();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_edges_are_reproduced(
        left in -5.0f64..5.0,
        width in 0.1f64..10.0,
        y_left in -1.0f64..1.0,
        y_right in -1.0f64..1.0,
        slope in -1.0f64..1.0,
    ) {
        let right = left + width;
        let mut s = SegmentConfig::default().build(left, right).unwrap();
        s.calibrate(y_left, &[slope], y_right, &[]).unwrap();

        prop_assert!((s.value_at(left).unwrap() - y_left).abs() < 1e-10);
        prop_assert!((s.value_at(right).unwrap() - y_right).abs() < 1e-10);
    }
}
