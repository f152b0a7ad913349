//! First-order propagation of per-pixel height uncertainty into the
//! displacement estimate of one tile.
//!
//! Two chained linearizations are applied:
//!
//! 1. pixel heights → the 3x3 correlation neighborhood around the peak
//!    ([`correlation_covariance`]), using a `(size + 2)²` search sub-window so
//!    that every neighborhood entry has full pixel coverage;
//! 2. the 3x3 neighborhood → the 2-D sub-pixel offset
//!    ([`offset_covariance`]).
//!
//! Both Jacobians are estimated with forward differences. Input pixels are
//! flattened as all template pixels followed by all sub-window pixels, each
//! row-major; neighborhood entries are flattened row-major. Input errors are
//! assumed uncorrelated.

use crate::grid::GridView;
use crate::util::math::{congruence_2x9, congruence_diag_9};
use crate::util::{PivError, PivResult};

mod jacobian;

pub use jacobian::{correlation_jacobian, offset_jacobian};

/// Default finite-difference increment, in height units.
pub const DEFAULT_INCREMENT: f64 = 1e-6;

/// Inputs of one tile's propagation, all borrowed from the source grids.
#[derive(Clone, Copy, Debug)]
pub struct PatchInputs<'a> {
    /// Template heights (`size x size`).
    pub template: GridView<'a, f64>,
    /// Template height standard deviations.
    pub template_sigma: GridView<'a, f64>,
    /// Search sub-window heights (`(size + 2) x (size + 2)`), whose top-left
    /// pixel is one row and one column before the correlation peak.
    pub window: GridView<'a, f64>,
    /// Search sub-window height standard deviations.
    pub window_sigma: GridView<'a, f64>,
}

impl PatchInputs<'_> {
    fn check_shapes(&self) -> PivResult<usize> {
        let size = self.template.width();
        if self.template.height() != size {
            return Err(PivError::InvalidInput("template must be square"));
        }
        let check = |context: &'static str, view: &GridView<'_, f64>, n: usize| {
            if view.width() != n || view.height() != n {
                return Err(PivError::GridMismatch {
                    context,
                    width: n,
                    height: n,
                    got_width: view.width(),
                    got_height: view.height(),
                });
            }
            Ok(())
        };
        check("template uncertainty", &self.template_sigma, size)?;
        check("search sub-window", &self.window, size + 2)?;
        check("search sub-window uncertainty", &self.window_sigma, size + 2)?;
        Ok(size)
    }
}

/// Propagates pixel uncertainty into the 9x9 covariance of the correlation
/// neighborhood, `J · Σ_input · Jᵗ`.
///
/// Returns `Ok(None)` when a template or shifted sub-window has zero
/// standard deviation, where the correlation has no derivative.
pub fn correlation_covariance(
    inputs: &PatchInputs<'_>,
    increment: f64,
    parallel: bool,
) -> PivResult<Option<[[f64; 9]; 9]>> {
    let size = inputs.check_shapes()?;
    let template = inputs.template.to_vec();
    let window = inputs.window.to_vec();

    let Some(jac) = correlation_jacobian(&template, &window, size, increment, parallel) else {
        return Ok(None);
    };

    let mut variances = Vec::with_capacity(jac.len() / 9);
    for sigma in [inputs.template_sigma, inputs.window_sigma] {
        for row in sigma.rows() {
            variances.extend(row.iter().map(|s| s * s));
        }
    }
    Ok(Some(congruence_diag_9(&jac, &variances)))
}

/// Propagates the neighborhood covariance into the 2x2 covariance of the
/// sub-pixel offset `(hz, vt)`, `J₂ · Σ_patch · J₂ᵗ`.
///
/// Returns `None` when the quadratic fit is singular at the neighborhood or
/// at one of its perturbations, or the result is not finite.
pub fn offset_covariance(
    neighborhood: &[[f64; 3]; 3],
    correlation_cov: &[[f64; 9]; 9],
    increment: f64,
) -> Option<[[f64; 2]; 2]> {
    let jac = offset_jacobian(neighborhood, increment)?;
    let cov = congruence_2x9(&jac, correlation_cov);
    if cov.iter().flatten().all(|v| v.is_finite()) {
        Some(cov)
    } else {
        None
    }
}

/// Runs both propagation stages for one tile, returning the displacement
/// covariance in squared pixels.
pub fn displacement_covariance(
    inputs: &PatchInputs<'_>,
    neighborhood: &[[f64; 3]; 3],
    increment: f64,
    parallel: bool,
) -> PivResult<Option<[[f64; 2]; 2]>> {
    let Some(correlation_cov) = correlation_covariance(inputs, increment, parallel)? else {
        return Ok(None);
    };
    Ok(offset_covariance(neighborhood, &correlation_cov, increment))
}
