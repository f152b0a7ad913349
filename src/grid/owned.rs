//! Owned height and uncertainty grids.

use crate::grid::{GeoTransform, GridView};
use crate::util::{PivError, PivResult};

/// Owned row-major `f64` grid with its pixel-to-ground transform.
///
/// Holds either elevations or, for propagation, per-pixel height standard
/// deviations co-registered with an elevation grid.
#[derive(Clone, Debug)]
pub struct HeightGrid {
    data: Vec<f64>,
    width: usize,
    height: usize,
    transform: GeoTransform,
}

impl HeightGrid {
    /// Creates a grid from a contiguous buffer of exactly `width * height`
    /// values, with the default identity transform.
    pub fn new(data: Vec<f64>, width: usize, height: usize) -> PivResult<Self> {
        if width == 0 || height == 0 {
            return Err(PivError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(PivError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(PivError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(PivError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
            transform: GeoTransform::default(),
        })
    }

    /// Builds a grid by evaluating `f(col, row)` at every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> PivResult<Self>
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(width.saturating_mul(height));
        for row in 0..height {
            for col in 0..width {
                data.push(f(col, row));
            }
        }
        Self::new(data, width, height)
    }

    /// Replaces the pixel-to-ground transform.
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Returns a borrowed view of the grid.
    pub fn view(&self) -> GridView<'_, f64> {
        GridView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
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

    /// Returns the pixel-to-ground transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Returns the row-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}
