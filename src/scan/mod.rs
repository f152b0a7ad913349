//! Regular tile lattice over a pair of equal-shaped grids.
//!
//! Each lattice position pairs a square template cut from the before grid
//! with a search window, twice as large, cut from the after grid. Tiles are
//! enumerated row-major (vertical index outer, horizontal index inner); this
//! order fixes the order of every output array.

use crate::util::{PivError, PivResult};
use std::ops::Range;

/// Lattice geometry derived from grid shape, template size and step size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileLattice {
    template_size: usize,
    step_size: usize,
    n_vertical: usize,
    n_horizontal: usize,
}

/// Pixel sub-ranges of one lattice position.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    /// Vertical lattice index.
    pub vt: usize,
    /// Horizontal lattice index.
    pub hz: usize,
    /// Template rows in the before grid.
    pub template_rows: Range<usize>,
    /// Template columns in the before grid.
    pub template_cols: Range<usize>,
    /// Search window rows in the after grid.
    pub search_rows: Range<usize>,
    /// Search window columns in the after grid.
    pub search_cols: Range<usize>,
    /// Template center `[col, row]` in pixel units.
    pub origin: [f64; 2],
}

impl TileLattice {
    /// Builds the lattice for a grid of `(height, width)` pixels.
    pub fn new(shape: (usize, usize), template_size: usize, step_size: usize) -> PivResult<Self> {
        if template_size < 3 {
            return Err(PivError::InvalidInput("template_size must be at least 3"));
        }
        if step_size < 1 {
            return Err(PivError::InvalidInput("step_size must be at least 1"));
        }
        let (height, width) = shape;
        let search_size = template_size
            .checked_mul(2)
            .ok_or(PivError::InvalidInput("template_size too large"))?;
        Ok(Self {
            template_size,
            step_size,
            n_vertical: height.saturating_sub(search_size) / step_size,
            n_horizontal: width.saturating_sub(search_size) / step_size,
        })
    }

    /// Returns the template edge length.
    pub fn template_size(&self) -> usize {
        self.template_size
    }

    /// Returns the lattice step.
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Nominal search size (`2 * template_size`).
    pub fn search_size(&self) -> usize {
        2 * self.template_size
    }

    /// Search window edge length including the odd-template parity correction.
    pub fn search_extent(&self) -> usize {
        self.search_size() + self.template_size % 2
    }

    /// Offset of the template inside its search window, `ceil(template_size / 2)`.
    pub fn template_offset(&self) -> usize {
        self.template_size.div_ceil(2)
    }

    /// Returns `(n_vertical, n_horizontal)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.n_vertical, self.n_horizontal)
    }

    /// Total number of lattice positions.
    pub fn len(&self) -> usize {
        self.n_vertical * self.n_horizontal
    }

    /// True when no tile fits in the grid.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tile at lattice position `(vt, hz)`.
    pub fn tile(&self, vt: usize, hz: usize) -> Tile {
        let (template_rows, search_rows, origin_row) = self.axis(vt);
        let (template_cols, search_cols, origin_col) = self.axis(hz);
        Tile {
            vt,
            hz,
            template_rows,
            template_cols,
            search_rows,
            search_cols,
            origin: [origin_col, origin_row],
        }
    }

    /// Returns the tile at a flat row-major index, if it exists.
    pub fn tile_at(&self, index: usize) -> Option<Tile> {
        if index >= self.len() {
            return None;
        }
        Some(self.tile(index / self.n_horizontal, index % self.n_horizontal))
    }

    /// Iterates over all tiles in scan order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.len()).filter_map(move |index| self.tile_at(index))
    }

    fn axis(&self, index: usize) -> (Range<usize>, Range<usize>, f64) {
        let base = index * self.step_size;
        let template_start = base + self.template_offset();
        let template = template_start..template_start + self.template_size;
        let search = base..base + self.search_extent();
        // even templates are centered between pixel centers
        let half = if self.template_size % 2 == 0 { 0.5 } else { 0.0 };
        let origin = (base + self.template_size) as f64 - half;
        (template, search, origin)
    }
}
