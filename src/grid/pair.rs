//! Validated pre-/post-event grid pair.

use crate::grid::{GeoTransform, GridView, HeightGrid};
use crate::util::{PivError, PivResult};

/// Co-registered before/after elevation grids, optionally with their
/// per-pixel uncertainty grids.
///
/// Construction enforces identical shapes and bit-equal transforms; a pair
/// that exists is always safe to scan.
#[derive(Clone, Copy, Debug)]
pub struct DemPair<'a> {
    before: &'a HeightGrid,
    after: &'a HeightGrid,
    uncertainty: Option<(&'a HeightGrid, &'a HeightGrid)>,
}

impl<'a> DemPair<'a> {
    /// Pairs two elevation grids.
    pub fn new(before: &'a HeightGrid, after: &'a HeightGrid) -> PivResult<Self> {
        check_shape("after height grid", before, after)?;
        if !before.transform().bit_eq(after.transform()) {
            return Err(PivError::TransformMismatch);
        }
        Ok(Self {
            before,
            after,
            uncertainty: None,
        })
    }

    /// Attaches per-pixel height standard deviations for the before and after
    /// grids respectively.
    pub fn with_uncertainty(
        mut self,
        before_sigma: &'a HeightGrid,
        after_sigma: &'a HeightGrid,
    ) -> PivResult<Self> {
        check_shape("before uncertainty grid", self.before, before_sigma)?;
        check_shape("after uncertainty grid", self.after, after_sigma)?;
        self.uncertainty = Some((before_sigma, after_sigma));
        Ok(self)
    }

    /// Returns the before (pre-event) elevations.
    pub fn before(&self) -> GridView<'a, f64> {
        self.before.view()
    }

    /// Returns the after (post-event) elevations.
    pub fn after(&self) -> GridView<'a, f64> {
        self.after.view()
    }

    /// Returns the before/after uncertainty views, if attached.
    pub fn uncertainty(&self) -> Option<(GridView<'a, f64>, GridView<'a, f64>)> {
        self.uncertainty
            .map(|(before, after)| (before.view(), after.view()))
    }

    /// Returns the shared pixel-to-ground transform.
    pub fn transform(&self) -> &'a GeoTransform {
        self.before.transform()
    }

    /// Returns the shared `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.before.shape()
    }
}

fn check_shape(context: &'static str, expected: &HeightGrid, got: &HeightGrid) -> PivResult<()> {
    if expected.shape() != got.shape() {
        return Err(PivError::GridMismatch {
            context,
            width: expected.width(),
            height: expected.height(),
            got_width: got.width(),
            got_height: got.height(),
        });
    }
    Ok(())
}
