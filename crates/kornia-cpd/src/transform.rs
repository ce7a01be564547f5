use faer::{Mat, MatRef};

use crate::{error::CpdError, probabilities::Probabilities};

/// Output of a single maximization step.
#[derive(Debug, Clone)]
pub struct TransformStep {
    /// Updated moving points with shape (N, D).
    pub points: Mat<f64>,
    /// Re-estimated noise variance, always non-negative.
    pub sigma2: f64,
    /// Signed variance before taking the absolute value.
    ///
    /// A negative value comes from floating point cancellation. Callers that
    /// want stricter diagnostics can compare its magnitude against `sigma2`.
    pub raw_sigma2: f64,
}

/// A coherent point drift transform driven by the registration loop.
///
/// A run calls [`Transform::init`] once, then repeats
/// expectation, [`Transform::modify_probabilities`], convergence check and
/// [`Transform::compute_one`] until convergence.
pub trait Transform {
    /// Check the transform configuration before a run starts.
    fn validate(&self) -> Result<(), CpdError> {
        Ok(())
    }

    /// Prepare the transform state for the given point sets.
    fn init(&mut self, fixed: MatRef<'_, f64>, moving: MatRef<'_, f64>) -> Result<(), CpdError>;

    /// Fold transform specific terms into the objective `probabilities.l`.
    fn modify_probabilities(&self, probabilities: &mut Probabilities);

    /// Compute one maximization step.
    ///
    /// # Arguments
    ///
    /// * `fixed` - Fixed points with shape (M, D).
    /// * `moving` - Moving points with shape (N, D).
    /// * `probabilities` - Correspondence statistics of the current iteration.
    /// * `sigma2` - Current noise variance.
    fn compute_one(
        &mut self,
        fixed: MatRef<'_, f64>,
        moving: MatRef<'_, f64>,
        probabilities: &Probabilities,
        sigma2: f64,
    ) -> Result<TransformStep, CpdError>;

    /// Whether the scalings of the fixed and moving sets are linked.
    fn linked(&self) -> bool;
}
