//! Error types for geopiv.

use thiserror::Error;

/// Result alias for geopiv operations.
pub type Result<T> = std::result::Result<T, PivError>;

/// Errors that can occur when running the displacement pipeline.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PivError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Width or height is zero, or their product overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested sub-window does not fit inside the grid.
    #[error(
        "window ({col}, {row}, {width}x{height}) out of bounds for {grid_width}x{grid_height} grid"
    )]
    WindowOutOfBounds {
        col: usize,
        row: usize,
        width: usize,
        height: usize,
        grid_width: usize,
        grid_height: usize,
    },
    /// Template has no height variation, so correlation is undefined.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// Two grids that must be co-registered have different shapes.
    #[error("grid shape mismatch: {context} is {got_width}x{got_height}, expected {width}x{height}")]
    GridMismatch {
        context: &'static str,
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },
    /// Before and after grids do not share the same pixel-to-ground transform.
    #[error("the extent and/or datum of the 'before' and 'after' grids is not equivalent")]
    TransformMismatch,
    /// Propagation was requested without per-pixel uncertainty grids.
    #[error("uncertainty propagation requested but no uncertainty grids were supplied")]
    MissingUncertainty,
    /// Raster decoding failed.
    #[error("raster i/o error: {reason}")]
    RasterIo { reason: String },
    /// Writing or reading the JSON result files failed.
    #[error("export error: {reason}")]
    Export { reason: String },
}
