use faer::{Col, Mat};

/// Correspondence statistics produced by the expectation step.
///
/// With `N` moving points, `M` fixed points and dimension `D`:
#[derive(Debug, Clone)]
pub struct Probabilities {
    /// Correspondence mass of each moving point, length N.
    pub p1: Col<f64>,
    /// Correspondence mass of each fixed point, length M.
    pub pt1: Col<f64>,
    /// Probability weighted fixed positions per moving point, shape (N, D).
    pub px: Mat<f64>,
    /// Running negative log-likelihood of the model.
    pub l: f64,
    /// Index of the most likely fixed point for every moving point.
    pub correspondence: Option<Vec<usize>>,
}

impl Probabilities {
    /// Create correspondence statistics without correspondence indices.
    pub fn new(p1: Col<f64>, pt1: Col<f64>, px: Mat<f64>, l: f64) -> Self {
        Self {
            p1,
            pt1,
            px,
            l,
            correspondence: None,
        }
    }

    /// Total correspondence mass of the moving points, `sum(p1)`.
    pub fn np(&self) -> f64 {
        self.p1.as_ref().sum()
    }
}
