use faer::{Mat, MatRef};

use crate::matrix::column_means;

/// Zero mean, unit scale normalization of a fixed and a moving point set.
#[derive(Debug, Clone)]
pub struct Normalization {
    /// Per column mean of the original fixed points.
    pub fixed_mean: Vec<f64>,
    /// Normalized fixed points.
    pub fixed: Mat<f64>,
    /// Scale applied to the fixed points.
    pub fixed_scale: f64,
    /// Per column mean of the original moving points.
    pub moving_mean: Vec<f64>,
    /// Normalized moving points.
    pub moving: Mat<f64>,
    /// Scale applied to the moving points.
    pub moving_scale: f64,
}

// center the points and return them with the means and the root mean square norm
fn center(points: MatRef<'_, f64>) -> (Mat<f64>, Vec<f64>, f64) {
    let mean = column_means(points);
    let centered = Mat::from_fn(points.nrows(), points.ncols(), |i, j| {
        points.read(i, j) - mean[j]
    });

    let mut sum_sq = 0.0;
    for j in 0..centered.ncols() {
        for i in 0..centered.nrows() {
            sum_sq += centered.read(i, j) * centered.read(i, j);
        }
    }
    let scale = (sum_sq / points.nrows() as f64).sqrt();

    // a set collapsed onto its mean is only centered
    let scale = if scale > 0.0 { scale } else { 1.0 };

    (centered, mean, scale)
}

fn scaled(points: Mat<f64>, scale: f64) -> Mat<f64> {
    Mat::from_fn(points.nrows(), points.ncols(), |i, j| {
        points.read(i, j) / scale
    })
}

impl Normalization {
    /// Normalize the two point sets.
    ///
    /// Both sets are centered at the origin and divided by the root mean
    /// square norm of their points. If `linked` is true, the larger of the two
    /// scales is used for both sets so their relative size is preserved.
    ///
    /// # Arguments
    ///
    /// * `fixed` - Fixed points with shape (M, D).
    /// * `moving` - Moving points with shape (N, D).
    /// * `linked` - Whether the two sets share a single scale.
    pub fn new(fixed: MatRef<'_, f64>, moving: MatRef<'_, f64>, linked: bool) -> Self {
        let (fixed_centered, fixed_mean, mut fixed_scale) = center(fixed);
        let (moving_centered, moving_mean, mut moving_scale) = center(moving);

        if linked {
            let scale = fixed_scale.max(moving_scale);
            fixed_scale = scale;
            moving_scale = scale;
        }

        Self {
            fixed_mean,
            fixed: scaled(fixed_centered, fixed_scale),
            fixed_scale,
            moving_mean,
            moving: scaled(moving_centered, moving_scale),
            moving_scale,
        }
    }

    /// Map points from the normalized frame back to the original fixed frame.
    pub fn denormalize(&self, points: MatRef<'_, f64>) -> Mat<f64> {
        Mat::from_fn(points.nrows(), points.ncols(), |i, j| {
            points.read(i, j) * self.fixed_scale + self.fixed_mean[j]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::points_to_mat;
    use approx::assert_relative_eq;

    fn rms(points: MatRef<'_, f64>) -> f64 {
        let mut acc = 0.0;
        for i in 0..points.nrows() {
            for j in 0..points.ncols() {
                acc += points.read(i, j) * points.read(i, j);
            }
        }
        (acc / points.nrows() as f64).sqrt()
    }

    #[test]
    fn test_normalization_unlinked() {
        let fixed = points_to_mat(&[[1.0, 2.0], [3.0, 2.0], [2.0, 5.0], [2.0, -1.0]]);
        let moving = points_to_mat(&[[10.0, 0.0], [30.0, 0.0], [20.0, 10.0]]);
        let norm = Normalization::new(fixed.as_ref(), moving.as_ref(), false);

        assert_relative_eq!(norm.fixed_mean[0], 2.0);
        assert_relative_eq!(norm.fixed_mean[1], 2.0);
        assert_relative_eq!(norm.moving_mean[0], 20.0);

        for mean in column_means(norm.fixed.as_ref()) {
            assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
        }
        for mean in column_means(norm.moving.as_ref()) {
            assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
        }
        assert_relative_eq!(rms(norm.fixed.as_ref()), 1.0, epsilon = 1e-12);
        assert_relative_eq!(rms(norm.moving.as_ref()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalization_linked() {
        let fixed = points_to_mat(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let moving = points_to_mat(&[[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]]);
        let norm = Normalization::new(fixed.as_ref(), moving.as_ref(), true);

        assert_eq!(norm.fixed_scale, norm.moving_scale);
        assert_relative_eq!(rms(norm.moving.as_ref()), 1.0, epsilon = 1e-12);
        assert_relative_eq!(rms(norm.fixed.as_ref()), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_denormalize_recovers_fixed() {
        let fixed = points_to_mat(&[[1.0, 2.0, 3.0], [4.0, 0.0, -1.0], [2.0, 2.0, 2.0]]);
        let moving = points_to_mat(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [5.0, 0.0, 1.0]]);
        let norm = Normalization::new(fixed.as_ref(), moving.as_ref(), false);

        let back = norm.denormalize(norm.fixed.as_ref());
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(back.read(i, j), fixed.read(i, j), epsilon = 1e-12);
            }
        }
    }
}
