//! Direct spatial-domain normalized cross-correlation.
//!
//! Each coefficient mean-centers and unit-std-normalizes both patches and
//! averages their elementwise product. This is the reference definition; the
//! uncertainty propagator evaluates it repeatedly on perturbed patches.
//! Windows holding a non-finite height score NaN.

use crate::correlate::CorrelationSurface;
use crate::grid::GridView;
use crate::kernel::{undefined_surface, valid_placements, CorrelationKernel};
use crate::template::TemplatePlan;
use crate::util::PivResult;

#[cfg(feature = "simd")]
use crate::kernel::simd::{centered_moments, sum};
#[cfg(not(feature = "simd"))]
use self::scalar::{centered_moments, sum};

/// Sliding-window kernel evaluating every placement directly.
pub struct SpatialKernel;

impl CorrelationKernel for SpatialKernel {
    fn surface(
        template: &TemplatePlan,
        search: GridView<'_, f64>,
    ) -> PivResult<CorrelationSurface> {
        let (rows, cols) = valid_placements(template, search)?;
        if !template.is_finite() {
            return undefined_surface(rows, cols);
        }
        let t_norm = template.normalized();
        let mut window = vec![0.0f64; template.len()];
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                search
                    .roi(col, row, template.width(), template.height())?
                    .copy_into(&mut window);
                let score = if window.iter().all(|v| v.is_finite()) {
                    ncc_against_normalized(&window, &t_norm).unwrap_or(0.0)
                } else {
                    f64::NAN
                };
                data.push(score);
            }
        }
        CorrelationSurface::new(data, rows, cols)
    }
}

/// Normalized cross-correlation of raw values `p` against a patch `qn` that
/// is already zero-mean and unit-std.
///
/// Returns `None` when `p` has zero (or non-finite) standard deviation.
pub(crate) fn ncc_against_normalized(p: &[f64], qn: &[f64]) -> Option<f64> {
    debug_assert_eq!(p.len(), qn.len());
    let n = p.len() as f64;
    let mean = sum(p) / n;
    let (ss, dot) = centered_moments(p, qn, mean);
    if ss == 0.0 || !ss.is_finite() {
        return None;
    }
    let std = (ss / n).sqrt();
    Some(dot / (std * n))
}

#[cfg(not(feature = "simd"))]
mod scalar {
    /// Sum of all values.
    #[inline]
    pub(crate) fn sum(values: &[f64]) -> f64 {
        values.iter().sum()
    }

    /// Returns `(Σ (p - mean)², Σ (p - mean) * q)`.
    #[inline]
    pub(crate) fn centered_moments(p: &[f64], q: &[f64], mean: f64) -> (f64, f64) {
        let mut ss = 0.0f64;
        let mut dot = 0.0f64;
        for (&a, &b) in p.iter().zip(q) {
            let d = a - mean;
            ss += d * d;
            dot += d * b;
        }
        (ss, dot)
    }
}
