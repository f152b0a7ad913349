//! Correlation surfaces and integer peak selection.
//!
//! A surface holds one normalized cross-correlation coefficient per valid
//! placement of a template inside its search window. Row `i`, column `j`
//! corresponds to the template's top-left corner at `(j, i)` in the window.

use crate::util::{PivError, PivResult};

/// Integer-pixel correlation maximum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Row of the peak in the surface.
    pub row: usize,
    /// Column of the peak in the surface.
    pub col: usize,
    /// Correlation coefficient at the peak.
    pub score: f64,
}

/// Dense row-major correlation surface.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationSurface {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl CorrelationSurface {
    /// Wraps a row-major buffer of exactly `rows * cols` coefficients.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> PivResult<Self> {
        let needed = rows
            .checked_mul(cols)
            .ok_or(PivError::InvalidDimensions {
                width: cols,
                height: rows,
            })?;
        if rows == 0 || cols == 0 || data.len() != needed {
            return Err(PivError::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Number of surface rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of surface columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the coefficient at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }

    /// Returns the row-major coefficients.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Locates the maximum coefficient.
    ///
    /// Ties resolve to the first occurrence in row-major order (smallest row,
    /// then smallest column). NaN entries are ignored; `None` means the
    /// surface holds no comparable value.
    pub fn peak(&self) -> Option<Peak> {
        let mut best: Option<Peak> = None;
        for (idx, &score) in self.data.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            let better = match best {
                Some(b) => score > b.score,
                None => true,
            };
            if better {
                best = Some(Peak {
                    row: idx / self.cols,
                    col: idx % self.cols,
                    score,
                });
            }
        }
        best
    }

    /// True when `peak` lies on the first or last row or column.
    pub fn is_border(&self, peak: &Peak) -> bool {
        peak.row == 0 || peak.col == 0 || peak.row + 1 >= self.rows || peak.col + 1 >= self.cols
    }

    /// Returns the 3x3 neighborhood centered on `peak`, or `None` for a
    /// border peak where the neighborhood is incomplete.
    pub fn neighborhood(&self, peak: &Peak) -> Option<[[f64; 3]; 3]> {
        if self.is_border(peak) {
            return None;
        }
        let mut out = [[0.0f64; 3]; 3];
        for (dr, out_row) in out.iter_mut().enumerate() {
            let start = (peak.row + dr - 1) * self.cols + peak.col - 1;
            out_row.copy_from_slice(&self.data[start..start + 3]);
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{CorrelationSurface, Peak};

    #[test]
    fn peak_prefers_first_row_major_maximum() {
        #[rustfmt::skip]
        let data = vec![
            0.1, 0.2, 0.3, 0.1,
            0.2, 0.9, 0.4, 0.2,
            0.3, 0.4, 0.9, 0.1,
            0.0, 0.9, 0.2, 0.1,
        ];
        let surface = CorrelationSurface::new(data, 4, 4).unwrap();
        let peak = surface.peak().unwrap();
        assert_eq!((peak.row, peak.col), (1, 1));
        assert_eq!(peak.score, 0.9);
    }

    #[test]
    fn border_peaks_have_no_neighborhood() {
        let mut data = vec![0.0; 25];
        data[4] = 1.0;
        let surface = CorrelationSurface::new(data, 5, 5).unwrap();
        let peak = surface.peak().unwrap();
        assert_eq!((peak.row, peak.col), (0, 4));
        assert!(surface.is_border(&peak));
        assert!(surface.neighborhood(&peak).is_none());
    }

    #[test]
    fn neighborhood_is_centered_on_peak() {
        let data: Vec<f64> = (0..20).map(f64::from).collect();
        let surface = CorrelationSurface::new(data, 4, 5).unwrap();
        let peak = Peak {
            row: 2,
            col: 1,
            score: 11.0,
        };
        let nb = surface.neighborhood(&peak).unwrap();
        assert_eq!(nb, [[5.0, 6.0, 7.0], [10.0, 11.0, 12.0], [15.0, 16.0, 17.0]]);
    }

    #[test]
    fn all_nan_surface_has_no_peak() {
        let surface = CorrelationSurface::new(vec![f64::NAN; 9], 3, 3).unwrap();
        assert!(surface.peak().is_none());
    }
}
