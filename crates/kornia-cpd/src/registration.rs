use std::time::Duration;

use faer::{Mat, MatRef};
use serde::{Deserialize, Serialize};

use crate::{
    error::CpdError,
    gauss_transform::{GaussTransform, GaussTransformDirect},
    matrix::trace_product,
    nonrigid::Nonrigid,
    normalization::Normalization,
    solver::{Performance, Precision},
    transform::Transform,
};

/// Structure to define the registration loop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationCriteria {
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Convergence tolerance on the relative change of the objective between two iterations.
    pub tolerance: f64,
    /// Weight of the uniform outlier component, in `[0, 1)`.
    pub outliers: f64,
    /// Initial noise variance. Estimated from the data when `None`.
    pub sigma2: Option<f64>,
    /// Whether to normalize the point sets before registering them.
    pub normalize: bool,
    /// Whether to compute the final point correspondences.
    pub correspondence: bool,
}

impl Default for RegistrationCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 150,
            tolerance: 1e-5,
            outliers: 0.1,
            sigma2: None,
            normalize: true,
            correspondence: false,
        }
    }
}

impl RegistrationCriteria {
    /// Check that the criteria describe a valid registration run.
    pub fn validate(&self) -> Result<(), CpdError> {
        if !(0.0..1.0).contains(&self.outliers) {
            return Err(CpdError::InvalidParameter {
                name: "outliers",
                value: self.outliers,
                reason: "must be in [0, 1)",
            });
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(CpdError::InvalidParameter {
                name: "tolerance",
                value: self.tolerance,
                reason: "must be finite and strictly positive",
            });
        }
        if let Some(sigma2) = self.sigma2 {
            if !sigma2.is_finite() || sigma2 <= 0.0 {
                return Err(CpdError::InvalidParameter {
                    name: "sigma2",
                    value: sigma2,
                    reason: "must be finite and strictly positive",
                });
            }
        }
        Ok(())
    }
}

/// Result of a registration run.
///
/// The points are expressed in the frame of the fixed point set.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Registered moving points with shape (N, D).
    pub points: Mat<f64>,
    /// Final noise variance, in the normalized frame if normalization was used.
    pub sigma2: f64,
    /// Index of the fixed point matched to each moving point, if requested.
    pub correspondence: Option<Vec<usize>>,
    /// The total number of iterations performed.
    pub num_iterations: usize,
    /// Wall clock time of the run.
    pub runtime: Duration,
    /// Whether the run stopped on the tolerance instead of the iteration limit.
    pub converged: bool,
}

/// Initial noise variance estimated from the two point sets.
///
/// This is the mean squared distance over all fixed / moving pairs divided by
/// the dimension.
pub fn default_sigma2(fixed: MatRef<'_, f64>, moving: MatRef<'_, f64>) -> f64 {
    let (m, n, cols) = (fixed.nrows(), moving.nrows(), fixed.ncols());

    let cross = (0..cols)
        .map(|j| fixed.col(j).sum() * moving.col(j).sum())
        .sum::<f64>();

    (n as f64 * trace_product(fixed, fixed) + m as f64 * trace_product(moving, moving)
        - 2.0 * cross)
        / (m * n * cols) as f64
}

fn check_inputs(fixed: MatRef<'_, f64>, moving: MatRef<'_, f64>) -> Result<(), CpdError> {
    if fixed.nrows() == 0 {
        return Err(CpdError::EmptyPointSet("fixed"));
    }
    if moving.nrows() == 0 {
        return Err(CpdError::EmptyPointSet("moving"));
    }
    if fixed.ncols() != moving.ncols() {
        return Err(CpdError::DimensionMismatch {
            what: "point dimension",
            expected: fixed.ncols(),
            actual: moving.ncols(),
        });
    }
    Ok(())
}

/// Register the moving points onto the fixed points with the direct Gauss transform.
///
/// See [`run_with`] for details.
pub fn run<T: Transform>(
    transform: &mut T,
    fixed: MatRef<'_, f64>,
    moving: MatRef<'_, f64>,
    criteria: &RegistrationCriteria,
) -> Result<RegistrationResult, CpdError> {
    run_with(transform, &GaussTransformDirect, fixed, moving, criteria)
}

/// Coherent point drift registration loop.
///
/// Alternates the expectation step, computed by `gauss_transform`, with the
/// maximization step of `transform` until the relative change of the
/// objective drops below the tolerance, the variance vanishes or the
/// iteration limit is reached.
///
/// # Arguments
///
/// * `transform` - The transform to estimate, e.g. [`Nonrigid`].
/// * `gauss_transform` - Expectation step implementation.
/// * `fixed` - Fixed points with shape (M, D).
/// * `moving` - Moving points with shape (N, D).
/// * `criteria` - Convergence criteria.
///
/// # Returns
///
/// * `result` - The registered moving points with the run statistics.
pub fn run_with<T: Transform, G: GaussTransform>(
    transform: &mut T,
    gauss_transform: &G,
    fixed: MatRef<'_, f64>,
    moving: MatRef<'_, f64>,
    criteria: &RegistrationCriteria,
) -> Result<RegistrationResult, CpdError> {
    let now = std::time::Instant::now();

    check_inputs(fixed, moving)?;
    criteria.validate()?;
    transform.validate()?;

    let normalization = criteria
        .normalize
        .then(|| Normalization::new(fixed, moving, transform.linked()));
    let (fixed, moving) = match &normalization {
        Some(normalization) => (normalization.fixed.as_ref(), normalization.moving.as_ref()),
        None => (fixed, moving),
    };

    transform.init(fixed, moving)?;

    let mut points = moving.to_owned();
    let mut sigma2 = criteria
        .sigma2
        .unwrap_or_else(|| default_sigma2(fixed, moving));

    let mut num_iterations = 0;
    let mut ntol = criteria.tolerance + 10.0;
    let mut l = 0.0;

    // main em loop
    while num_iterations < criteria.max_iterations
        && ntol > criteria.tolerance
        && sigma2 > 10.0 * f64::EPSILON
    {
        log::debug!("Iteration: {}", num_iterations);

        let mut probabilities =
            gauss_transform.compute(fixed, points.as_ref(), sigma2, criteria.outliers)?;
        transform.modify_probabilities(&mut probabilities);

        let np = probabilities.np();
        if !np.is_finite() || np <= 0.0 {
            return Err(CpdError::DegenerateCorrespondence { np });
        }

        ntol = ((probabilities.l - l) / probabilities.l).abs();
        l = probabilities.l;

        // the deformation is always expressed relative to the initial moving points
        let step = transform.compute_one(fixed, moving, &probabilities, sigma2)?;
        if !step.sigma2.is_finite() {
            return Err(CpdError::NonFiniteVariance(step.sigma2));
        }

        points = step.points;
        sigma2 = step.sigma2;
        num_iterations += 1;

        log::debug!("Objective: {}, tolerance: {}, sigma2: {}", l, ntol, sigma2);
    }

    let converged = ntol <= criteria.tolerance || sigma2 <= 10.0 * f64::EPSILON;
    if converged {
        log::debug!("CPD converged in {} iterations", num_iterations);
    }

    let correspondence = if criteria.correspondence {
        gauss_transform
            .compute(fixed, points.as_ref(), sigma2, 0.0)?
            .correspondence
    } else {
        None
    };

    if let Some(normalization) = &normalization {
        points = normalization.denormalize(points.as_ref());
    }

    let runtime = now.elapsed();
    log::debug!("elapsed: {:?}", runtime);

    Ok(RegistrationResult {
        points,
        sigma2,
        correspondence,
        num_iterations,
        runtime,
        converged,
    })
}

/// Runs a nonrigid registration with the default parameters, precision policy.
///
/// The regularized system is solved with a column pivoted QR decomposition.
pub fn nonrigid(
    fixed: MatRef<'_, f64>,
    moving: MatRef<'_, f64>,
) -> Result<RegistrationResult, CpdError> {
    let mut transform = Nonrigid::<Precision>::new();
    run(&mut transform, fixed, moving, &RegistrationCriteria::default())
}

/// Runs a nonrigid registration with the default parameters, performance policy.
///
/// The regularized system is solved with a non pivoted QR decomposition.
pub fn nonrigid_quick(
    fixed: MatRef<'_, f64>,
    moving: MatRef<'_, f64>,
) -> Result<RegistrationResult, CpdError> {
    let mut transform = Nonrigid::<Performance>::new();
    run(&mut transform, fixed, moving, &RegistrationCriteria::default())
}
