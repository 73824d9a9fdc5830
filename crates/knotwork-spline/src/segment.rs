//! The calibration unit: one segment of a piecewise curve.
//!
//! A [`Segment`] owns its domain `[left, right]`, a basis set, an optional
//! shape controller and its own constraints. Calibration assembles a square
//! design system from edge values, constraints, edge derivatives and
//! roughness rows, solves it once, and commits the coefficients together with
//! the inverse design matrix. The inverse is what makes sensitivities cheap:
//! see [`Segment::value_jacobian`].
//!
//! Calibration works in local coordinates `u = (x - left) / width`.
//! Derivatives passed to [`Segment::calibrate`] are local; global derivatives
//! of order `j` relate to local ones by a factor `width^j`.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use knotwork_math::linear_algebra::{LinearSystemSolver, SolveConfig};

use crate::basis::{binomial, gram, BasisFamily, BasisFunctionSet};
use crate::constraint::NodeWeightConstraint;
use crate::error::{ensure_finite, SplineError, SplineResult};
use crate::jacobian::{Jacobian, JacobianInput, JacobianPropagator};
use crate::params::{partition_constraints, CalibrationParams, EDGE_TOLERANCE};
use crate::shape::ShapeController;

/// Square design system of one calibration.
///
/// `rows[i]` names the input behind row `i`; it is also the label of column
/// `i` of the coefficient Jacobian.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignSystem {
    /// `n×n` design matrix.
    pub matrix: DMatrix<f64>,
    /// Right-hand side.
    pub rhs: DVector<f64>,
    /// Input behind each row.
    pub rows: Vec<JacobianInput>,
}

impl DesignSystem {
    /// Number of roughness rows that filled the system.
    #[must_use]
    pub fn roughness_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r, JacobianInput::Roughness(_)))
            .count()
    }
}

#[derive(Debug, Clone)]
struct CalibrationState {
    coefficients: Vec<f64>,
    // Dropped when the constraint set changes
    inverse: Option<DMatrix<f64>>,
    inputs: Vec<JacobianInput>,
}

/// One segment of a piecewise basis-spline curve.
///
/// # Example
///
/// ```rust
/// use knotwork_spline::basis::BasisFunctionSet;
/// use knotwork_spline::segment::Segment;
///
/// let mut segment = Segment::new(1.0, 1.5, BasisFunctionSet::polynomial(2).unwrap(), 0, 2).unwrap();
/// segment.calibrate(25.0, &[], 16.0, &[]).unwrap();
///
/// assert_eq!(segment.coefficients().unwrap(), &[25.0, -9.0]);
/// assert!((segment.value_at(1.25).unwrap() - 20.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Segment {
    left: f64,
    right: f64,
    basis: BasisFunctionSet,
    shape: Option<ShapeController>,
    continuity: usize,
    roughness_order: usize,
    constraints: Vec<NodeWeightConstraint>,
    solver: LinearSystemSolver,
    state: Option<CalibrationState>,
}

impl Segment {
    /// Creates an uncalibrated segment.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::InvalidInput`] unless `left < right` are both
    /// finite, and [`SplineError::InsufficientBasisCount`] if the basis has
    /// fewer than `continuity + 2` functions.
    pub fn new(
        left: f64,
        right: f64,
        basis: BasisFunctionSet,
        continuity: usize,
        roughness_order: usize,
    ) -> SplineResult<Self> {
        ensure_finite("segment edges", &[left, right])?;
        if left >= right {
            return Err(SplineError::invalid_input(format!(
                "segment needs left < right, got [{left}, {right}]"
            )));
        }
        if basis.len() < continuity + 2 {
            return Err(SplineError::insufficient_basis(continuity + 2, basis.len()));
        }

        Ok(Self {
            left,
            right,
            basis,
            shape: None,
            continuity,
            roughness_order,
            constraints: Vec::new(),
            solver: LinearSystemSolver::default(),
            state: None,
        })
    }

    /// Attaches a shape controller. Clears any calibration.
    #[must_use]
    pub fn with_shape(mut self, shape: ShapeController) -> Self {
        self.shape = Some(shape);
        self.state = None;
        self
    }

    /// Uses a solver with the given configuration.
    #[must_use]
    pub fn with_solver(mut self, config: SolveConfig) -> Self {
        self.solver = LinearSystemSolver::new(config);
        self
    }

    /// Adds a constraint owned by this segment.
    pub fn with_constraint(mut self, constraint: NodeWeightConstraint) -> SplineResult<Self> {
        self.add_constraint(constraint)?;
        Ok(self)
    }

    /// Adds a constraint owned by this segment.
    ///
    /// Coefficients of an earlier calibration stay usable for evaluation, but
    /// its inverse no longer matches the constraint set and is dropped.
    pub fn add_constraint(&mut self, constraint: NodeWeightConstraint) -> SplineResult<()> {
        let (lo, hi) = constraint.span();
        self.to_local(lo)?;
        self.to_local(hi)?;

        self.constraints.push(constraint);
        if let Some(state) = self.state.as_mut() {
            state.inverse = None;
        }
        Ok(())
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.left
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.right
    }

    /// `right - left`.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Basis set.
    #[must_use]
    pub fn basis(&self) -> &BasisFunctionSet {
        &self.basis
    }

    /// Shape controller, if any.
    #[must_use]
    pub fn shape(&self) -> Option<&ShapeController> {
        self.shape.as_ref()
    }

    /// Continuity order Ck.
    #[must_use]
    pub fn continuity(&self) -> usize {
        self.continuity
    }

    /// Derivative order penalized by the roughness rows.
    #[must_use]
    pub fn roughness_order(&self) -> usize {
        self.roughness_order
    }

    /// Constraints owned by this segment.
    #[must_use]
    pub fn constraints(&self) -> &[NodeWeightConstraint] {
        &self.constraints
    }

    /// Number of basis functions.
    #[must_use]
    pub fn num_basis(&self) -> usize {
        self.basis.len()
    }

    /// Coefficients of the last successful calibration.
    #[must_use]
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.coefficients.as_slice())
    }

    /// True once a calibration has been committed.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.state.is_some()
    }

    /// Maps a global ordinate to `[0, 1]`.
    ///
    /// Ordinates within a relative tolerance of the edges are clamped.
    pub fn to_local(&self, x: f64) -> SplineResult<f64> {
        ensure_finite("ordinate", &[x])?;
        let tol = EDGE_TOLERANCE * self.width();
        if x < self.left - tol || x > self.right + tol {
            return Err(SplineError::out_of_range(x, self.left, self.right));
        }
        Ok(((x - self.left) / self.width()).clamp(0.0, 1.0))
    }

    /// Local derivatives of the given order of every shaped basis function
    /// `S·Bᵢ` at local `u`.
    #[must_use]
    pub fn basis_row(&self, u: f64, order: usize) -> Vec<f64> {
        let Some(shape) = self.shape else {
            return self.basis.evaluate_all(u, order);
        };

        let s = shape.derivatives(u, order);
        let mut row = vec![0.0; self.num_basis()];
        for (k, sk) in s.iter().enumerate() {
            let c = binomial(order, k) * sk;
            for (acc, b) in row.iter_mut().zip(self.basis.evaluate_all(u, order - k)) {
                *acc += c * b;
            }
        }
        row
    }

    /// Builds the design system for the given edge data.
    ///
    /// Row order: left and right edge values, this segment's constraints,
    /// left derivatives of orders `1..=Ck`, the supplied right derivatives,
    /// then roughness rows until the system is square. Derivatives are
    /// local; only the first Ck left derivatives are used.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::InvalidInput`] for non-finite input or fewer
    /// than Ck left derivatives, and
    /// [`SplineError::InsufficientBasisCount`] if the explicit rows outnumber
    /// the basis functions.
    pub fn assemble(
        &self,
        y_left: f64,
        left_derivs: &[f64],
        y_right: f64,
        right_derivs: &[f64],
    ) -> SplineResult<DesignSystem> {
        self.assemble_rows(
            y_left,
            self.leading_left_derivatives(left_derivs)?,
            y_right,
            right_derivs,
            &[],
        )
    }

    fn assemble_rows(
        &self,
        y_left: f64,
        left_derivs: &[f64],
        y_right: f64,
        right_derivs: &[f64],
        extra: &[NodeWeightConstraint],
    ) -> SplineResult<DesignSystem> {
        ensure_finite("edge values", &[y_left, y_right])?;
        ensure_finite("left derivatives", left_derivs)?;
        ensure_finite("right derivatives", right_derivs)?;

        let n = self.num_basis();
        let num_constraints = self.constraints.len() + extra.len();
        let required = 2 + num_constraints + left_derivs.len() + right_derivs.len();
        if required > n {
            return Err(SplineError::insufficient_basis(required, n));
        }

        let mut entries: Vec<Vec<f64>> = Vec::with_capacity(n);
        let mut rhs: Vec<f64> = Vec::with_capacity(n);
        let mut rows: Vec<JacobianInput> = Vec::with_capacity(n);

        entries.push(self.basis_row(0.0, 0));
        rhs.push(y_left);
        rows.push(JacobianInput::LeftValue);

        entries.push(self.basis_row(1.0, 0));
        rhs.push(y_right);
        rows.push(JacobianInput::RightValue);

        for (i, constraint) in self.constraints.iter().chain(extra).enumerate() {
            let projected = constraint.project(self)?;
            entries.push(projected.coeff_weights().to_vec());
            rhs.push(projected.value());
            rows.push(JacobianInput::Constraint(i));
        }

        for (j, &d) in left_derivs.iter().enumerate() {
            entries.push(self.basis_row(0.0, j + 1));
            rhs.push(d);
            rows.push(JacobianInput::LeftDerivative(j + 1));
        }

        for (j, &d) in right_derivs.iter().enumerate() {
            entries.push(self.basis_row(1.0, j + 1));
            rhs.push(d);
            rows.push(JacobianInput::RightDerivative(j + 1));
        }

        if required < n {
            let g = self.shaped_gram(self.roughness_order)?;
            for r in required..n {
                entries.push(g.row(r).iter().copied().collect());
                rhs.push(0.0);
                rows.push(JacobianInput::Roughness(r));
            }
        }

        let matrix = DMatrix::from_fn(n, n, |i, j| entries[i][j]);
        Ok(DesignSystem {
            matrix,
            rhs: DVector::from_vec(rhs),
            rows,
        })
    }

    fn shaped_gram(&self, order: usize) -> SplineResult<DMatrix<f64>> {
        match self.shape {
            None => self.basis.roughness_gram(order),
            Some(_) => gram(self.num_basis(), |u| self.basis_row(u, order)),
        }
    }

    /// Calibrates against edge values and local edge derivatives.
    ///
    /// On failure the segment keeps its previous calibration.
    ///
    /// # Errors
    ///
    /// See [`Segment::assemble`]; in addition
    /// [`SplineError::SingularSystem`] if both solver strategies fail.
    pub fn calibrate(
        &mut self,
        y_left: f64,
        left_derivs: &[f64],
        y_right: f64,
        right_derivs: &[f64],
    ) -> SplineResult<()> {
        self.calibrate_rows(
            y_left,
            self.leading_left_derivatives(left_derivs)?,
            y_right,
            right_derivs,
            &[],
        )
    }

    /// The first Ck left derivatives, or `InvalidInput` if fewer are given.
    fn leading_left_derivatives<'a>(&self, left_derivs: &'a [f64]) -> SplineResult<&'a [f64]> {
        left_derivs.get(..self.continuity).ok_or_else(|| {
            SplineError::invalid_input(format!(
                "continuity order {} needs {} left derivatives, got {}",
                self.continuity,
                self.continuity,
                left_derivs.len()
            ))
        })
    }

    fn calibrate_rows(
        &mut self,
        y_left: f64,
        left_derivs: &[f64],
        y_right: f64,
        right_derivs: &[f64],
        extra: &[NodeWeightConstraint],
    ) -> SplineResult<()> {
        let two_point = matches!(self.basis.family(), BasisFamily::Polynomial { num_basis: 2 })
            && self.shape.is_none()
            && self.constraints.is_empty()
            && extra.is_empty()
            && left_derivs.is_empty()
            && right_derivs.is_empty();

        if two_point {
            ensure_finite("edge values", &[y_left, y_right])?;
            self.state = Some(CalibrationState {
                coefficients: vec![y_left, y_right - y_left],
                inverse: Some(DMatrix::from_row_slice(2, 2, &[1.0, 0.0, -1.0, 1.0])),
                inputs: vec![JacobianInput::LeftValue, JacobianInput::RightValue],
            });
            debug!(left = self.left, right = self.right, "two-point segment calibrated");
            return Ok(());
        }

        let system = self.assemble_rows(y_left, left_derivs, y_right, right_derivs, extra)?;
        let solution = self.solver.solve(&system.matrix, &system.rhs)?;
        ensure_finite("coefficients", solution.solution.as_slice())?;

        debug!(
            left = self.left,
            right = self.right,
            basis = self.basis.family().name(),
            n = self.num_basis(),
            constraints = self.constraints.len() + extra.len(),
            left_derivatives = left_derivs.len(),
            right_derivatives = right_derivs.len(),
            roughness_rows = system.roughness_rows(),
            strategy = %solution.strategy,
            "segment calibrated"
        );

        self.state = Some(CalibrationState {
            coefficients: solution.solution.iter().copied().collect(),
            inverse: Some(solution.inverse),
            inputs: system.rows,
        });
        Ok(())
    }

    /// Calibrates from global-coordinate parameters.
    ///
    /// The first and last solo nodes give the edge values. Interior solo
    /// nodes become unit-weight constraints after this segment's own, then
    /// come the parameter constraints. Global derivatives are scaled by
    /// `width^j`. The left derivatives must cover orders `1..=Ck`; a missing
    /// right derivative array adds no rows.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::InvalidInput`] if the nodes do not span this
    /// segment or fewer than Ck left derivatives are given, otherwise the
    /// errors of [`Segment::calibrate`]. On failure the segment keeps its
    /// previous calibration.
    pub fn calibrate_params(&mut self, params: &CalibrationParams) -> SplineResult<()> {
        params.validate_for(self.left, self.right, self.continuity)?;
        let left = self.to_local_derivatives(
            self.leading_left_derivatives(params.left_derivatives())?,
        );

        let mut extra = params.interior_node_constraints()?;
        extra.extend(params.constraints().iter().cloned());

        let right = self.to_local_derivatives(params.right_derivatives());

        self.calibrate_rows(
            params.left_value(),
            &left,
            params.right_value(),
            &right,
            &extra,
        )
    }

    /// Calibrates with the left edge value and derivatives taken from the
    /// previous segment at the shared knot.
    ///
    /// Without a previous segment the left value is this segment's own
    /// current value at its left edge, and no derivative rows are used.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::InvalidInput`] if the segments do not share a
    /// knot and [`SplineError::NotCalibrated`] if the source of the left
    /// value has no calibration.
    pub fn calibrate_chained(&mut self, prev: Option<&Segment>, y_right: f64) -> SplineResult<()> {
        match prev {
            Some(prev) => {
                let tol = EDGE_TOLERANCE * self.width().max(prev.width());
                if (prev.right - self.left).abs() > tol {
                    return Err(SplineError::invalid_input(format!(
                        "previous segment ends at {} but this one starts at {}",
                        prev.right, self.left
                    )));
                }
                let y_left = prev.value_at(prev.right)?;
                let global = (1..=self.continuity)
                    .map(|j| prev.derivative_at(prev.right, j))
                    .collect::<SplineResult<Vec<f64>>>()?;
                let local = self.to_local_derivatives(&global);
                self.calibrate_rows(y_left, &local, y_right, &[], &[])
            }
            None => {
                let y_left = self.value_at(self.left)?;
                self.calibrate_rows(y_left, &[], y_right, &[], &[])
            }
        }
    }

    fn to_local_derivatives(&self, global: &[f64]) -> Vec<f64> {
        let w = self.width();
        global
            .iter()
            .enumerate()
            .map(|(j, d)| d * w.powi(j as i32 + 1))
            .collect()
    }

    fn committed(&self) -> SplineResult<&CalibrationState> {
        match &self.state {
            Some(state) => Ok(state),
            None => Err(SplineError::not_calibrated(format!(
                "segment [{}, {}] has no coefficients",
                self.left, self.right
            ))),
        }
    }

    /// Local derivative of order `order` of the interpolant at local `u`.
    pub(crate) fn local_derivative(&self, u: f64, order: usize) -> SplineResult<f64> {
        let coefficients = &self.committed()?.coefficients;
        Ok(dot(&self.basis_row(u, order), coefficients))
    }

    /// Value of the interpolant at global `x`.
    pub fn value_at(&self, x: f64) -> SplineResult<f64> {
        let u = self.to_local(x)?;
        self.local_derivative(u, 0)
    }

    /// Global derivative of the given order at `x`.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::DiscontinuousDerivativeRequest`] for an order
    /// above Ck at either edge.
    pub fn derivative_at(&self, x: f64, order: usize) -> SplineResult<f64> {
        let u = self.checked_local(x, order)?;
        Ok(self.local_derivative(u, order)? / self.width().powi(order as i32))
    }

    fn checked_local(&self, x: f64, order: usize) -> SplineResult<f64> {
        let u = self.to_local(x)?;
        if order > self.continuity && (u == 0.0 || u == 1.0) {
            return Err(SplineError::DiscontinuousDerivativeRequest {
                order,
                continuity: self.continuity,
                x,
            });
        }
        Ok(u)
    }

    fn inverse(&self) -> SplineResult<(&DMatrix<f64>, &[JacobianInput])> {
        let state = self.committed()?;
        match &state.inverse {
            Some(inverse) => Ok((inverse, &state.inputs)),
            None => Err(SplineError::not_calibrated(
                "constraints changed since the last calibration",
            )),
        }
    }

    /// `∂cᵢ/∂inputⱼ`, the inverse design matrix of the last calibration.
    pub fn coefficient_jacobian(&self) -> SplineResult<Jacobian> {
        let (inverse, inputs) = self.inverse()?;
        Jacobian::new(inverse.clone(), inputs.to_vec())
    }

    /// Sensitivity of the value at `x` to every calibration input.
    pub fn value_jacobian(&self, x: f64) -> SplineResult<Jacobian> {
        self.derivative_jacobian(x, 0)
    }

    /// Sensitivity of the global derivative of the given order at `x`.
    pub fn derivative_jacobian(&self, x: f64, order: usize) -> SplineResult<Jacobian> {
        let u = self.checked_local(x, order)?;
        let scale = self.width().powi(order as i32);
        let sensitivity: Vec<f64> = self
            .basis_row(u, order)
            .into_iter()
            .map(|phi| phi / scale)
            .collect();
        JacobianPropagator::propagate(&sensitivity, &self.coefficient_jacobian()?)
    }

    /// `∫ (y^(p)(x))² dx` over the segment, in global units.
    pub fn roughness(&self, order: usize) -> SplineResult<f64> {
        let coefficients = DVector::from_column_slice(&self.committed()?.coefficients);
        let g = self.shaped_gram(order)?;
        let local = coefficients.dot(&(&g * &coefficients));
        Ok(local * self.width().powi(1 - 2 * order as i32))
    }

    /// Splits at an internal knot into two calibrated children.
    ///
    /// The value and first Ck derivatives of this segment at the knot become
    /// the shared edge data. Parameters are split with
    /// [`CalibrationParams::split`]; this segment's own constraints go to the
    /// side they lie on.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::InvalidInput`] for a knot not strictly inside
    /// the segment or a constraint straddling it, and
    /// [`SplineError::NotCalibrated`] if the segment has no coefficients.
    pub fn split(&self, knot: f64, params: &CalibrationParams) -> SplineResult<(Segment, Segment)> {
        ensure_finite("knot", &[knot])?;
        if knot <= self.left || knot >= self.right {
            return Err(SplineError::invalid_input(format!(
                "knot {knot} is not inside ({}, {})",
                self.left, self.right
            )));
        }

        let knot_y = self.value_at(knot)?;
        let derivs = (1..=self.continuity)
            .map(|j| self.derivative_at(knot, j))
            .collect::<SplineResult<Vec<f64>>>()?;

        let (left_params, right_params) = params.split(knot, knot_y, &derivs)?;
        let (left_constraints, right_constraints) = partition_constraints(&self.constraints, knot)?;

        let mut left = Segment {
            right: knot,
            constraints: left_constraints,
            state: None,
            ..self.clone()
        };
        let mut right = Segment {
            left: knot,
            constraints: right_constraints,
            state: None,
            ..self.clone()
        };

        left.calibrate_params(&left_params)?;
        right.calibrate_params(&right_params)?;

        debug!(knot, left = self.left, right = self.right, "segment split");
        Ok((left, right))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
