//! Rayon-parallel tile loop (feature-gated).
//!
//! Every lattice position gets one slot in an indexed collect, so outcomes
//! come back in scan order regardless of which worker finished first.

use super::{Piv, TileOutcome};
use crate::grid::DemPair;
use crate::scan::TileLattice;
use crate::util::{PivError, PivResult};
use rayon::prelude::*;

pub(super) fn outcomes_par(
    piv: &Piv,
    pair: &DemPair<'_>,
    lattice: &TileLattice,
) -> PivResult<Vec<TileOutcome>> {
    (0..lattice.len())
        .into_par_iter()
        .map(|index| {
            let tile = lattice
                .tile_at(index)
                .ok_or(PivError::InvalidInput("tile index out of range"))?;
            piv.process_tile(pair, lattice, &tile)
        })
        .collect()
}
