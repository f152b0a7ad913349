//! Normalized cross-correlation kernels.
//!
//! Every kernel evaluates the Pearson correlation between a template and each
//! equally sized window of a search area, producing a
//! [`CorrelationSurface`] with one entry per valid placement. Windows with
//! zero height variance score `0.0`; windows containing a non-finite height
//! score NaN, and a template with a non-finite height yields an all-NaN
//! surface.

use crate::correlate::CorrelationSurface;
use crate::grid::GridView;
use crate::template::TemplatePlan;
use crate::util::{PivError, PivResult};

pub mod fft;
pub mod spatial;

#[cfg(feature = "simd")]
pub(crate) mod simd;

pub use fft::FftKernel;
pub use spatial::SpatialKernel;

/// Kernel trait for full correlation surfaces.
pub trait CorrelationKernel {
    /// Correlates `template` against every valid placement in `search`.
    fn surface(
        template: &TemplatePlan,
        search: GridView<'_, f64>,
    ) -> PivResult<CorrelationSurface>;
}

/// Selects the kernel used to build correlation surfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorrelationMethod {
    /// Frequency-domain numerator with summed-area window statistics.
    #[default]
    Fft,
    /// Direct sliding-window evaluation.
    Spatial,
}

impl CorrelationMethod {
    /// Builds the correlation surface with the selected kernel.
    pub fn surface(
        self,
        template: &TemplatePlan,
        search: GridView<'_, f64>,
    ) -> PivResult<CorrelationSurface> {
        match self {
            CorrelationMethod::Fft => <FftKernel as CorrelationKernel>::surface(template, search),
            CorrelationMethod::Spatial => {
                <SpatialKernel as CorrelationKernel>::surface(template, search)
            }
        }
    }

    /// Lowercase name used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            CorrelationMethod::Fft => "fft",
            CorrelationMethod::Spatial => "spatial",
        }
    }
}

/// All-NaN surface for inputs without a defined correlation.
pub(crate) fn undefined_surface(rows: usize, cols: usize) -> PivResult<CorrelationSurface> {
    CorrelationSurface::new(vec![f64::NAN; rows * cols], rows, cols)
}

/// Returns the surface shape `(rows, cols)` for a template inside `search`.
pub(crate) fn valid_placements(
    template: &TemplatePlan,
    search: GridView<'_, f64>,
) -> PivResult<(usize, usize)> {
    if search.width() < template.width() || search.height() < template.height() {
        return Err(PivError::WindowOutOfBounds {
            col: 0,
            row: 0,
            width: template.width(),
            height: template.height(),
            grid_width: search.width(),
            grid_height: search.height(),
        });
    }
    Ok((
        search.height() - template.height() + 1,
        search.width() - template.width() + 1,
    ))
}
