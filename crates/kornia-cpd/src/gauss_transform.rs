use faer::{Col, Mat, MatRef};

use crate::{error::CpdError, probabilities::Probabilities};

/// Expectation step of the coherent point drift.
///
/// Computes the posterior correspondence statistics between the fixed points
/// and the Gaussian mixture centered on the moving points.
pub trait GaussTransform {
    /// Compute the correspondence statistics.
    ///
    /// # Arguments
    ///
    /// * `fixed` - Fixed points with shape (M, D).
    /// * `moving` - Current moving points (mixture centroids) with shape (N, D).
    /// * `sigma2` - Variance of the mixture components.
    /// * `outliers` - Weight of the uniform outlier component, in `[0, 1)`.
    fn compute(
        &self,
        fixed: MatRef<'_, f64>,
        moving: MatRef<'_, f64>,
        sigma2: f64,
        outliers: f64,
    ) -> Result<Probabilities, CpdError>;
}

/// Direct O(M * N) evaluation of the Gaussian transform.
///
/// A fixed point whose mixture density underflows to zero, which can only
/// happen without an outlier component, is left out of the statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussTransformDirect;

impl GaussTransform for GaussTransformDirect {
    fn compute(
        &self,
        fixed: MatRef<'_, f64>,
        moving: MatRef<'_, f64>,
        sigma2: f64,
        outliers: f64,
    ) -> Result<Probabilities, CpdError> {
        if fixed.ncols() != moving.ncols() {
            return Err(CpdError::DimensionMismatch {
                what: "point dimension",
                expected: fixed.ncols(),
                actual: moving.ncols(),
            });
        }

        let (m, n, cols) = (fixed.nrows(), moving.nrows(), fixed.ncols());
        let ksig = -2.0 * sigma2;

        // constant contribution of the uniform outlier distribution
        let outlier_term = (outliers
            * n as f64
            * (-ksig * std::f64::consts::PI).powf(0.5 * cols as f64))
            / ((1.0 - outliers) * m as f64);

        let mut p = vec![0.0; n];
        let mut p1 = Col::<f64>::zeros(n);
        let mut p1_max = vec![0.0; n];
        let mut pt1 = Col::<f64>::zeros(m);
        let mut px = Mat::<f64>::zeros(n, cols);
        let mut correspondence = vec![0usize; n];
        let mut l = 0.0;

        for i in 0..m {
            let mut sp = 0.0;
            for (j, pj) in p.iter_mut().enumerate() {
                let mut dist2 = 0.0;
                for d in 0..cols {
                    let diff = fixed.read(i, d) - moving.read(j, d);
                    dist2 += diff * diff;
                }
                *pj = (dist2 / ksig).exp();
                sp += *pj;
            }
            sp += outlier_term;

            // every component underflowed and there is no outlier term
            if sp == 0.0 {
                continue;
            }

            pt1.write(i, 1.0 - outlier_term / sp);

            for (j, pj) in p.iter().enumerate() {
                let posterior = pj / sp;
                p1.write(j, p1.read(j) + posterior);
                for d in 0..cols {
                    px.write(j, d, px.read(j, d) + fixed.read(i, d) * posterior);
                }
                if posterior > p1_max[j] {
                    correspondence[j] = i;
                    p1_max[j] = posterior;
                }
            }

            l -= sp.ln();
        }

        l += cols as f64 * m as f64 * sigma2.ln() / 2.0;

        Ok(Probabilities {
            p1,
            pt1,
            px,
            l,
            correspondence: Some(correspondence),
        })
    }
}
