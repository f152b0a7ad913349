//! Height grids, views and georeferencing.
//!
//! `GridView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! Rows run top to bottom and columns left to right. The stride counts
//! elements between the starts of consecutive rows, so sub-windows taken with
//! `roi` are zero-copy views that retain the parent stride.

use crate::util::{PivError, PivResult};

#[cfg(feature = "geotiff-io")]
pub mod io;
mod owned;
mod pair;
mod transform;

pub use owned::HeightGrid;
pub use pair::DemPair;
pub use transform::GeoTransform;

/// Borrowed 2D grid view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct GridView<'a, T> {
    pub(crate) data: &'a [T],
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) stride: usize,
}

impl<'a, T> GridView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> PivResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> PivResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(PivError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the grid width (columns).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the grid height (rows).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at column `x`, row `y` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Iterates over the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.height).filter_map(move |y| self.row(y))
    }

    /// Returns a zero-copy sub-window starting at column `col`, row `row`.
    pub fn roi(
        &self,
        col: usize,
        row: usize,
        width: usize,
        height: usize,
    ) -> PivResult<GridView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(PivError::InvalidDimensions { width, height });
        }

        let out_of_bounds = PivError::WindowOutOfBounds {
            col,
            row,
            width,
            height,
            grid_width: self.width,
            grid_height: self.height,
        };
        let end_col = col.checked_add(width).ok_or(out_of_bounds.clone())?;
        let end_row = row.checked_add(height).ok_or(out_of_bounds.clone())?;
        if end_col > self.width || end_row > self.height {
            return Err(out_of_bounds);
        }

        let start = row
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(col))
            .ok_or(PivError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self.data.get(start..).ok_or(PivError::BufferTooSmall {
            needed: start.saturating_add(1),
            got: self.data.len(),
        })?;

        GridView::new(data, width, height, self.stride)
    }
}

impl<T: Copy> GridView<'_, T> {
    /// Copies the view into a contiguous row-major buffer.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }

    /// Copies the view into `out`, which must hold `width * height` elements.
    pub(crate) fn copy_into(&self, out: &mut [T]) {
        debug_assert_eq!(out.len(), self.width * self.height);
        for (chunk, row) in out.chunks_exact_mut(self.width).zip(self.rows()) {
            chunk.copy_from_slice(row);
        }
    }
}

impl GridView<'_, f64> {
    /// Returns `(min, max)` over the view, ignoring NaN values.
    pub fn min_max(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for row in self.rows() {
            for &v in row {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        (lo, hi)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> PivResult<usize> {
    if width == 0 || height == 0 {
        return Err(PivError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(PivError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(PivError::InvalidDimensions { width, height })?;
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::GridView;
    use crate::util::PivError;

    #[test]
    fn roi_keeps_parent_stride() {
        let data: Vec<f64> = (0..20).map(f64::from).collect();
        let view = GridView::from_slice(&data, 5, 4).unwrap();
        let roi = view.roi(1, 2, 3, 2).unwrap();
        assert_eq!(roi.stride(), 5);
        assert_eq!(roi.row(0).unwrap(), &[11.0, 12.0, 13.0]);
        assert_eq!(roi.to_vec(), vec![11.0, 12.0, 13.0, 16.0, 17.0, 18.0]);
    }

    #[test]
    fn roi_rejects_windows_past_the_edge() {
        let data = vec![0.0f64; 16];
        let view = GridView::from_slice(&data, 4, 4).unwrap();
        let err = view.roi(2, 0, 3, 1).err().unwrap();
        assert_eq!(
            err,
            PivError::WindowOutOfBounds {
                col: 2,
                row: 0,
                width: 3,
                height: 1,
                grid_width: 4,
                grid_height: 4,
            }
        );
    }

    #[test]
    fn min_max_skips_nan() {
        let data = [3.0, f64::NAN, -1.0, 2.0];
        let view = GridView::from_slice(&data, 2, 2).unwrap();
        assert_eq!(view.min_max(), (-1.0, 3.0));
    }
}
