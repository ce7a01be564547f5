use faer::{Mat, MatRef};
use serde::{Deserialize, Serialize};

use crate::{
    affinity::affinity,
    error::CpdError,
    matrix::{trace_product, weighted_sum_squares},
    probabilities::Probabilities,
    solver::{LinearSolver, Precision},
    transform::{Transform, TransformStep},
};

/// Default kernel bandwidth.
pub const DEFAULT_BETA: f64 = 3.0;
/// Default regularization weight.
pub const DEFAULT_LAMBDA: f64 = 3.0;
/// Default value of the scale linking flag.
pub const DEFAULT_LINKED: bool = true;

/// Parameters of the nonrigid transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonrigidParams {
    /// Regularization weight trading data fit against smoothness.
    pub lambda: f64,
    /// Bandwidth of the Gaussian affinity kernel.
    pub beta: f64,
    /// Whether the fixed and moving scalings are linked during normalization.
    pub linked: bool,
}

impl Default for NonrigidParams {
    fn default() -> Self {
        Self {
            lambda: DEFAULT_LAMBDA,
            beta: DEFAULT_BETA,
            linked: DEFAULT_LINKED,
        }
    }
}

impl NonrigidParams {
    /// Check that `beta > 0` and `lambda >= 0`.
    pub fn validate(&self) -> Result<(), CpdError> {
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(CpdError::InvalidParameter {
                name: "beta",
                value: self.beta,
                reason: "must be finite and strictly positive",
            });
        }
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(CpdError::InvalidParameter {
                name: "lambda",
                value: self.lambda,
                reason: "must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Nonrigid coherent point drift.
///
/// The moving points are deformed as `moving + G * W` where `G` is the
/// Gaussian affinity of the initial moving points and `W` the displacement
/// weights solved at every iteration. The numeric policy of the solve is
/// given by the solver type `S`.
///
/// Example:
///
/// ```
/// use kornia_cpd::{Nonrigid, Performance, Transform};
///
/// let nonrigid = Nonrigid::<Performance>::new().with_beta(2.0).with_lambda(1.0);
/// assert_eq!(nonrigid.beta(), 2.0);
/// assert!(nonrigid.linked());
/// ```
#[derive(Debug, Clone)]
pub struct Nonrigid<S: LinearSolver = Precision> {
    params: NonrigidParams,
    solver: S,
    // affinity of the initial moving points, fixed for the whole run
    g: Option<Mat<f64>>,
    w: Option<Mat<f64>>,
}

impl<S: LinearSolver + Default> Default for Nonrigid<S> {
    fn default() -> Self {
        Self::with_solver(S::default())
    }
}

impl<S: LinearSolver + Default> Nonrigid<S> {
    /// Create a nonrigid transform with default parameters.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: LinearSolver> Nonrigid<S> {
    /// Create a nonrigid transform using the given linear solve strategy.
    pub fn with_solver(solver: S) -> Self {
        Self::from_params(NonrigidParams::default(), solver)
    }

    /// Create a nonrigid transform from explicit parameters.
    pub fn from_params(params: NonrigidParams, solver: S) -> Self {
        Self {
            params,
            solver,
            g: None,
            w: None,
        }
    }

    /// Sets the kernel bandwidth. Only has an effect before `init`.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.params.beta = beta;
        self
    }

    /// Sets the regularization weight.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.params.lambda = lambda;
        self
    }

    /// Sets whether the scalings of the two point sets are linked.
    pub fn with_linked(mut self, linked: bool) -> Self {
        self.params.linked = linked;
        self
    }

    /// Sets the kernel bandwidth in place.
    pub fn set_beta(&mut self, beta: f64) -> &mut Self {
        self.params.beta = beta;
        self
    }

    /// Sets the regularization weight in place.
    pub fn set_lambda(&mut self, lambda: f64) -> &mut Self {
        self.params.lambda = lambda;
        self
    }

    /// Sets the scale linking flag in place.
    pub fn set_linked(&mut self, linked: bool) -> &mut Self {
        self.params.linked = linked;
        self
    }

    /// Kernel bandwidth.
    pub fn beta(&self) -> f64 {
        self.params.beta
    }

    /// Regularization weight.
    pub fn lambda(&self) -> f64 {
        self.params.lambda
    }

    /// Current parameters.
    pub fn params(&self) -> &NonrigidParams {
        &self.params
    }

    /// Affinity matrix computed by `init`.
    pub fn affinity_matrix(&self) -> Option<MatRef<'_, f64>> {
        self.g.as_ref().map(|g| g.as_ref())
    }

    /// Displacement weights of the last iteration.
    pub fn weights(&self) -> Option<MatRef<'_, f64>> {
        self.w.as_ref().map(|w| w.as_ref())
    }

    /// Regularization energy `(lambda / 2) * trace(W^T * G * W)`.
    pub fn regularization_energy(&self) -> f64 {
        match (&self.g, &self.w) {
            (Some(g), Some(w)) => {
                let gw = g * w;
                self.params.lambda / 2.0 * trace_product(w.as_ref(), gw.as_ref())
            }
            _ => 0.0,
        }
    }
}

fn check_dim(what: &'static str, expected: usize, actual: usize) -> Result<(), CpdError> {
    if expected != actual {
        return Err(CpdError::DimensionMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

impl<S: LinearSolver> Transform for Nonrigid<S> {
    fn validate(&self) -> Result<(), CpdError> {
        self.params.validate()
    }

    fn init(&mut self, _fixed: MatRef<'_, f64>, moving: MatRef<'_, f64>) -> Result<(), CpdError> {
        self.g = Some(affinity(moving, moving, self.params.beta)?);
        self.w = Some(Mat::zeros(moving.nrows(), moving.ncols()));
        Ok(())
    }

    fn modify_probabilities(&self, probabilities: &mut Probabilities) {
        probabilities.l += self.regularization_energy();
    }

    fn compute_one(
        &mut self,
        fixed: MatRef<'_, f64>,
        moving: MatRef<'_, f64>,
        probabilities: &Probabilities,
        sigma2: f64,
    ) -> Result<TransformStep, CpdError> {
        let g = self.g.as_ref().ok_or(CpdError::NotInitialized)?;

        let (n, cols) = (moving.nrows(), moving.ncols());
        check_dim("moving points", g.nrows(), n)?;
        check_dim("fixed point dimension", cols, fixed.ncols())?;
        check_dim("p1", n, probabilities.p1.nrows())?;
        check_dim("pt1", fixed.nrows(), probabilities.pt1.nrows())?;
        check_dim("px rows", n, probabilities.px.nrows())?;
        check_dim("px cols", cols, probabilities.px.ncols())?;

        let p1 = &probabilities.p1;
        let px = &probabilities.px;

        // (dP * G + lambda * sigma2 * I) * W = PX - dP * Y
        let dp = p1.as_ref().column_vector_as_diagonal();
        let reg = self.params.lambda * sigma2;
        let mut lhs = dp * g.as_ref();
        for i in 0..n {
            lhs.write(i, i, lhs.read(i, i) + reg);
        }
        let rhs = px.as_ref() - (dp * moving).as_ref();

        let w = self.solver.solve(lhs.as_ref(), rhs.as_ref());

        let gw = g * &w;
        let points = moving + gw.as_ref();

        let np = probabilities.np();
        let raw_sigma2 = (weighted_sum_squares(fixed, &probabilities.pt1)
            + weighted_sum_squares(points.as_ref(), p1)
            - 2.0 * trace_product(px.as_ref(), points.as_ref()))
            / (np * cols as f64);

        if raw_sigma2 < 0.0 {
            log::debug!(
                "Negative variance {} before absolute value ({} solver)",
                raw_sigma2,
                S::NAME
            );
        }

        self.w = Some(w);

        Ok(TransformStep {
            points,
            sigma2: raw_sigma2.abs(),
            raw_sigma2,
        })
    }

    fn linked(&self) -> bool {
        self.params.linked
    }
}
