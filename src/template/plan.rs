//! Template plan precomputation for normalized cross-correlation.

use crate::grid::GridView;
use crate::util::{PivError, PivResult};

/// Precomputed statistics and zero-mean buffer for one template.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f64,
    std: f64,
    sum_sq: f64,
    zero_mean: Vec<f64>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    ///
    /// A template whose maximum equals its minimum has no defined correlation
    /// and is rejected with [`PivError::DegenerateTemplate`].
    pub fn from_view(tpl: GridView<'_, f64>) -> PivResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let (lo, hi) = tpl.min_max();
        if hi - lo == 0.0 {
            return Err(PivError::DegenerateTemplate {
                reason: "flat template",
            });
        }

        let values = tpl.to_vec();
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let zero_mean: Vec<f64> = values.iter().map(|v| v - mean).collect();
        let sum_sq: f64 = zero_mean.iter().map(|v| v * v).sum();

        Ok(Self {
            width,
            height,
            mean,
            std: (sum_sq / count).sqrt(),
            sum_sq,
            zero_mean,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of template pixels.
    pub fn len(&self) -> usize {
        self.zero_mean.len()
    }

    /// Always false; a plan cannot be built from an empty view.
    pub fn is_empty(&self) -> bool {
        self.zero_mean.is_empty()
    }

    /// Returns the mean height of the template.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the population standard deviation of the template.
    pub fn std(&self) -> f64 {
        self.std
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn zero_mean(&self) -> &[f64] {
        &self.zero_mean
    }

    /// Sum of squared deviations from the mean.
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    /// False when the template holds a non-finite height (nodata).
    pub fn is_finite(&self) -> bool {
        self.sum_sq.is_finite()
    }

    /// Returns the template scaled to zero mean and unit standard deviation.
    pub fn normalized(&self) -> Vec<f64> {
        let inv_std = 1.0 / self.std;
        self.zero_mean.iter().map(|v| v * inv_std).collect()
    }
}
