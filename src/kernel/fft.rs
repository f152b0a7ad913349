//! Frequency-domain normalized cross-correlation.
//!
//! The numerator `Σ (t - t̄) · s` for every placement comes from one circular
//! cross-correlation computed with `rustfft`; the search area itself is the
//! transform size, which is large enough that valid placements never wrap.
//! Window sums and squared sums come from summed-area tables, giving the
//! per-window variance in constant time. Non-finite search values are
//! counted in a third table; windows touching one score NaN.

use crate::correlate::CorrelationSurface;
use crate::grid::GridView;
use crate::kernel::{undefined_surface, valid_placements, CorrelationKernel};
use crate::template::TemplatePlan;
use crate::util::PivResult;
use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};

/// Relative variance below which a window is treated as constant.
const FLAT_WINDOW_RTOL: f64 = 1e-12;

/// FFT-based kernel; the default for full-surface evaluation.
pub struct FftKernel;

impl CorrelationKernel for FftKernel {
    fn surface(
        template: &TemplatePlan,
        search: GridView<'_, f64>,
    ) -> PivResult<CorrelationSurface> {
        let (rows, cols) = valid_placements(template, search)?;
        if !template.is_finite() {
            return undefined_surface(rows, cols);
        }
        let sh = search.height();
        let sw = search.width();
        let th = template.height();
        let tw = template.width();

        // Shifting the search area by its mean leaves every coefficient
        // unchanged and keeps the summed-area tables well conditioned.
        let values = search.to_vec();
        let (total, finite) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0f64, 0usize), |(s, n), &v| (s + v, n + 1));
        if finite == 0 {
            return undefined_surface(rows, cols);
        }
        let shift = total / finite as f64;

        let mut image: Vec<Complex<f64>> = values
            .iter()
            .map(|&v| Complex::new(if v.is_finite() { v - shift } else { 0.0 }, 0.0))
            .collect();
        let mut kernel = vec![Complex::new(0.0, 0.0); sh * sw];
        for (ty, tpl_row) in template.zero_mean().chunks_exact(tw).enumerate() {
            for (tx, &v) in tpl_row.iter().enumerate() {
                kernel[ty * sw + tx] = Complex::new(v, 0.0);
            }
        }

        let mut planner = FftPlanner::<f64>::new();
        fft_2d(&mut planner, &mut image, sh, sw, FftDirection::Forward);
        fft_2d(&mut planner, &mut kernel, sh, sw, FftDirection::Forward);
        for (a, b) in image.iter_mut().zip(&kernel) {
            *a *= b.conj();
        }
        fft_2d(&mut planner, &mut image, sh, sw, FftDirection::Inverse);
        let scale = 1.0 / (sh * sw) as f64;

        let sums = WindowSums::new(&values, shift, sh, sw);
        let n = (th * tw) as f64;
        let tpl_ss = template.sum_sq();
        let mut data = Vec::with_capacity(rows * cols);
        for y in 0..rows {
            for x in 0..cols {
                let (s, s2, invalid) = sums.window(x, y, tw, th);
                if invalid > 0 {
                    data.push(f64::NAN);
                    continue;
                }
                let window_ss = s2 - s * s / n;
                if window_ss <= s2 * FLAT_WINDOW_RTOL {
                    data.push(0.0);
                    continue;
                }
                let numerator = image[y * sw + x].re * scale;
                let denom = (tpl_ss * window_ss).sqrt();
                data.push(if denom > f64::EPSILON {
                    numerator / denom
                } else {
                    0.0
                });
            }
        }

        CorrelationSurface::new(data, rows, cols)
    }
}

/// In-place 2D transform: all rows, then all columns. Unnormalized.
fn fft_2d(
    planner: &mut FftPlanner<f64>,
    buf: &mut [Complex<f64>],
    rows: usize,
    cols: usize,
    direction: FftDirection,
) {
    let row_fft = planner.plan_fft(cols, direction);
    row_fft.process(buf);

    let col_fft = planner.plan_fft(rows, direction);
    let mut column = vec![Complex::new(0.0, 0.0); rows];
    for x in 0..cols {
        for (y, dst) in column.iter_mut().enumerate() {
            *dst = buf[y * cols + x];
        }
        col_fft.process(&mut column);
        for (y, src) in column.iter().enumerate() {
            buf[y * cols + x] = *src;
        }
    }
}

/// Summed-area tables of shifted values, their squares and the count of
/// non-finite values (which contribute zero to the first two).
struct WindowSums {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    invalid: Vec<usize>,
    stride: usize,
}

impl WindowSums {
    fn new(values: &[f64], shift: f64, height: usize, width: usize) -> Self {
        let stride = width + 1;
        let mut sum = vec![0.0f64; (height + 1) * stride];
        let mut sum_sq = vec![0.0f64; (height + 1) * stride];
        let mut invalid = vec![0usize; (height + 1) * stride];
        for y in 0..height {
            let mut row_sum = 0.0f64;
            let mut row_sq = 0.0f64;
            let mut row_invalid = 0usize;
            for x in 0..width {
                let raw = values[y * width + x];
                if raw.is_finite() {
                    let v = raw - shift;
                    row_sum += v;
                    row_sq += v * v;
                } else {
                    row_invalid += 1;
                }
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
                invalid[idx] = invalid[idx - stride] + row_invalid;
            }
        }
        Self {
            sum,
            sum_sq,
            invalid,
            stride,
        }
    }

    /// Returns `(Σ v, Σ v², non-finite count)` over the `width x height`
    /// window at `(x, y)`.
    fn window(&self, x: usize, y: usize, width: usize, height: usize) -> (f64, f64, usize) {
        let s = self.stride;
        let a = y * s + x;
        let b = y * s + x + width;
        let c = (y + height) * s + x;
        let d = (y + height) * s + x + width;
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sum_sq[d] - self.sum_sq[b] - self.sum_sq[c] + self.sum_sq[a],
            self.invalid[d] + self.invalid[a] - self.invalid[b] - self.invalid[c],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{FftKernel, WindowSums};
    use crate::grid::GridView;
    use crate::kernel::{CorrelationKernel, SpatialKernel};
    use crate::template::TemplatePlan;

    fn terrain(width: usize, height: usize) -> Vec<f64> {
        (0..width * height)
            .map(|i| {
                let (x, y) = ((i % width) as f64, (i / width) as f64);
                1200.0 + 4.0 * (0.5 * x).sin() + 3.0 * (0.3 * y + 0.2 * x).cos() + 0.05 * x * y
            })
            .collect()
    }

    #[test]
    fn window_sums_match_bruteforce() {
        let values: Vec<f64> = (0..30).map(|i| (i * 7 % 11) as f64).collect();
        let sums = WindowSums::new(&values, 2.0, 5, 6);
        let (s, s2, invalid) = sums.window(1, 2, 3, 2);
        assert_eq!(invalid, 0);
        let mut es = 0.0;
        let mut es2 = 0.0;
        for y in 2..4 {
            for x in 1..4 {
                let v = values[y * 6 + x] - 2.0;
                es += v;
                es2 += v * v;
            }
        }
        assert!((s - es).abs() < 1e-9);
        assert!((s2 - es2).abs() < 1e-9);
    }

    #[test]
    fn fft_surface_matches_spatial_surface() {
        let width = 19;
        let height = 17;
        let search = terrain(width, height);
        let search_view = GridView::from_slice(&search, width, height).unwrap();
        let tpl: Vec<f64> = terrain(9, 9).iter().map(|v| v * 0.5 + 3.0).collect();
        let plan = TemplatePlan::from_view(GridView::from_slice(&tpl, 9, 9).unwrap()).unwrap();

        let fft = <FftKernel as CorrelationKernel>::surface(&plan, search_view).unwrap();
        let direct = <SpatialKernel as CorrelationKernel>::surface(&plan, search_view).unwrap();
        assert_eq!((fft.rows(), fft.cols()), (9, 11));
        for (a, b) in fft.as_slice().iter().zip(direct.as_slice()) {
            assert!((a - b).abs() < 1e-9, "fft {a} vs direct {b}");
        }
    }

    #[test]
    fn non_finite_search_values_only_poison_their_windows() {
        let width = 19;
        let height = 17;
        let mut search = terrain(width, height);
        search[12 * width + 15] = f64::NAN;
        let search_view = GridView::from_slice(&search, width, height).unwrap();
        let tpl: Vec<f64> = terrain(9, 9).iter().map(|v| v * 0.5 + 3.0).collect();
        let plan = TemplatePlan::from_view(GridView::from_slice(&tpl, 9, 9).unwrap()).unwrap();

        let fft = <FftKernel as CorrelationKernel>::surface(&plan, search_view).unwrap();
        let direct = <SpatialKernel as CorrelationKernel>::surface(&plan, search_view).unwrap();
        for y in 0..fft.rows() {
            for x in 0..fft.cols() {
                let touches = (y..y + 9).contains(&12) && (x..x + 9).contains(&15);
                let (a, b) = (fft.get(y, x).unwrap(), direct.get(y, x).unwrap());
                assert_eq!(a.is_nan(), touches, "fft at ({y}, {x})");
                assert_eq!(b.is_nan(), touches, "direct at ({y}, {x})");
                if !touches {
                    assert!((a - b).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn non_finite_template_gives_undefined_surface() {
        let search = terrain(14, 14);
        let search_view = GridView::from_slice(&search, 14, 14).unwrap();
        let mut tpl = terrain(5, 5);
        tpl[7] = f64::INFINITY;
        let plan = TemplatePlan::from_view(GridView::from_slice(&tpl, 5, 5).unwrap()).unwrap();
        let surface = <FftKernel as CorrelationKernel>::surface(&plan, search_view).unwrap();
        assert!(surface.as_slice().iter().all(|v| v.is_nan()));
        assert!(surface.peak().is_none());
    }

    #[test]
    fn flat_windows_score_zero() {
        let mut search = vec![5.0f64; 12 * 12];
        for y in 0..6 {
            for x in 0..12 {
                search[y * 12 + x] = (x * 3 + y * 5) as f64 % 7.0;
            }
        }
        let search_view = GridView::from_slice(&search, 12, 12).unwrap();
        let tpl = search_view.roi(0, 0, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(tpl).unwrap();
        let surface = <FftKernel as CorrelationKernel>::surface(&plan, search_view).unwrap();
        // windows fully inside the constant lower half
        assert_eq!(surface.get(8, 0), Some(0.0));
        assert_eq!(surface.get(6, 5), Some(0.0));
    }
}
