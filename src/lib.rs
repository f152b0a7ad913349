//! geopiv estimates dense displacement fields between two co-registered
//! elevation grids.
//!
//! Templates cut from the "before" grid are located in the "after" grid with
//! normalized cross-correlation (FFT or direct spatial kernels), refined to
//! sub-pixel precision with a biquadratic fit, and optionally paired with a
//! displacement covariance propagated from per-pixel height uncertainty.
//! Results are exported in ground units as JSON. Tile-level parallelism is
//! available via the `rayon` feature, SIMD window statistics via `simd`,
//! GeoTIFF input via `geotiff-io`, and structured logs via `tracing`.
//!
//! ```
//! use geopiv::{DemPair, HeightGrid, Piv, PivConfig};
//!
//! let surface = |dx: f64| {
//!     HeightGrid::from_fn(40, 40, move |c, r| {
//!         let w = std::f64::consts::TAU / 9.0;
//!         let x = c as f64 - dx;
//!         100.0 + (w * x).cos() + (w * r as f64).sin()
//!     })
//! };
//! let before = surface(0.0)?;
//! let after = surface(2.0)?;
//! let pair = DemPair::new(&before, &after)?;
//! let output = Piv::new(PivConfig::default())?.run(&pair)?;
//! assert_eq!(output.stats.lattice, (4, 4));
//! # Ok::<(), geopiv::PivError>(())
//! ```

pub mod correlate;
pub mod export;
pub mod grid;
pub mod kernel;
pub mod piv;
pub mod propagate;
pub mod refine;
pub mod scan;
pub mod template;
mod trace;
pub mod util;

#[cfg(feature = "geotiff-io")]
pub use grid::io;

pub use correlate::{CorrelationSurface, Peak};
pub use export::{GroundResults, OutputPaths};
pub use grid::{DemPair, GeoTransform, GridView, HeightGrid};
pub use kernel::{CorrelationKernel, CorrelationMethod, FftKernel, SpatialKernel};
pub use piv::{Piv, PivConfig, PivOutput, ScanStats, SkipReason, TileMatch, TileOutcome};
pub use refine::biquadratic_offset;
pub use scan::{Tile, TileLattice};
pub use template::TemplatePlan;
pub use util::{PivError, PivResult};
