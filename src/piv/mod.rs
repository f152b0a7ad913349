//! Tile-by-tile displacement scan over a validated [`DemPair`].
//!
//! [`Piv::run`] walks the lattice in scan order. For every tile it correlates
//! the template against its search window, rejects flat templates and border
//! peaks, refines the peak with the biquadratic fit, and, when configured,
//! propagates pixel uncertainty into a displacement covariance. Accepted
//! tiles are collected in lattice order; skipped tiles only update
//! [`ScanStats`].

use crate::correlate::Peak;
use crate::grid::{DemPair, GridView};
use crate::kernel::CorrelationMethod;
use crate::propagate::{displacement_covariance, PatchInputs, DEFAULT_INCREMENT};
use crate::refine::biquadratic_offset;
use crate::scan::{Tile, TileLattice};
use crate::template::TemplatePlan;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{PivError, PivResult};

#[cfg(feature = "rayon")]
mod rayon;

/// Parameters of a displacement scan.
#[derive(Clone, Debug, PartialEq)]
pub struct PivConfig {
    /// Template edge length in pixels (at least 3).
    pub template_size: usize,
    /// Lattice step in pixels (at least 1).
    pub step_size: usize,
    /// Propagate per-pixel uncertainty into displacement covariances.
    pub propagate: bool,
    /// Correlation kernel used for the integer peak search.
    pub method: CorrelationMethod,
    /// Finite-difference increment in height units.
    pub fd_increment: f64,
    /// Process tiles in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for PivConfig {
    fn default() -> Self {
        Self {
            template_size: 9,
            step_size: 5,
            propagate: false,
            method: CorrelationMethod::Fft,
            fd_increment: DEFAULT_INCREMENT,
            parallel: false,
        }
    }
}

impl PivConfig {
    /// Checks parameter ranges.
    pub fn validate(&self) -> PivResult<()> {
        if self.template_size < 3 {
            return Err(PivError::InvalidInput("template_size must be at least 3"));
        }
        if self.step_size < 1 {
            return Err(PivError::InvalidInput("step_size must be at least 1"));
        }
        if !(self.fd_increment.is_finite() && self.fd_increment > 0.0) {
            return Err(PivError::InvalidInput(
                "fd_increment must be positive and finite",
            ));
        }
        Ok(())
    }
}

/// Why a tile produced no output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Template heights are all equal.
    FlatTemplate,
    /// The correlation surface has no finite entry.
    NoFinitePeak,
    /// The integer peak lies on the edge of the correlation surface.
    BorderPeak,
    /// The quadratic fit around the peak has a singular Hessian.
    SingularFit,
    /// A normalization or the propagated covariance was degenerate.
    DegeneratePropagation,
}

impl SkipReason {
    /// All reasons, in reporting order.
    pub const ALL: [SkipReason; 5] = [
        SkipReason::FlatTemplate,
        SkipReason::NoFinitePeak,
        SkipReason::BorderPeak,
        SkipReason::SingularFit,
        SkipReason::DegeneratePropagation,
    ];

    /// Snake-case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::FlatTemplate => "flat_template",
            SkipReason::NoFinitePeak => "no_finite_peak",
            SkipReason::BorderPeak => "border_peak",
            SkipReason::SingularFit => "singular_fit",
            SkipReason::DegeneratePropagation => "degenerate_propagation",
        }
    }

    fn index(self) -> usize {
        match self {
            SkipReason::FlatTemplate => 0,
            SkipReason::NoFinitePeak => 1,
            SkipReason::BorderPeak => 2,
            SkipReason::SingularFit => 3,
            SkipReason::DegeneratePropagation => 4,
        }
    }
}

/// Displacement estimate of one accepted tile, in pixel units.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatch {
    /// Vertical lattice index.
    pub vt: usize,
    /// Horizontal lattice index.
    pub hz: usize,
    /// Template center `[col, row]`.
    pub origin: [f64; 2],
    /// Displacement `[du, dv]`, columns then rows.
    pub vector: [f64; 2],
    /// Integer peak on the correlation surface.
    pub peak: Peak,
    /// Displacement covariance, present when propagation ran.
    pub covariance: Option<[[f64; 2]; 2]>,
}

/// Result of processing a single tile.
#[derive(Clone, Debug, PartialEq)]
pub enum TileOutcome {
    /// The tile contributed a displacement.
    Accepted(TileMatch),
    /// The tile was dropped.
    Skipped(SkipReason),
}

/// Counters collected over one scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Lattice size `(n_vertical, n_horizontal)`.
    pub lattice: (usize, usize),
    /// Number of accepted tiles.
    pub accepted: usize,
    skipped: [usize; 5],
}

impl ScanStats {
    /// Number of tiles skipped for `reason`.
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skipped[reason.index()]
    }

    /// Total number of skipped tiles.
    pub fn skipped_total(&self) -> usize {
        self.skipped.iter().sum()
    }

    fn record(&mut self, outcome: &TileOutcome) {
        match outcome {
            TileOutcome::Accepted(_) => self.accepted += 1,
            TileOutcome::Skipped(reason) => self.skipped[reason.index()] += 1,
        }
    }
}

/// Accepted tiles of one scan, in lattice order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PivOutput {
    /// Accepted tiles.
    pub matches: Vec<TileMatch>,
    /// Scan counters.
    pub stats: ScanStats,
    /// Whether covariances were computed.
    pub propagated: bool,
}

impl PivOutput {
    /// Tile origins `[col, row]`.
    pub fn origins(&self) -> Vec<[f64; 2]> {
        self.matches.iter().map(|m| m.origin).collect()
    }

    /// Displacement vectors `[du, dv]`.
    pub fn vectors(&self) -> Vec<[f64; 2]> {
        self.matches.iter().map(|m| m.vector).collect()
    }

    /// Displacement covariances, or `None` if propagation did not run.
    pub fn covariances(&self) -> Option<Vec<[[f64; 2]; 2]>> {
        if !self.propagated {
            return None;
        }
        self.matches.iter().map(|m| m.covariance).collect()
    }
}

/// Displacement field estimator.
#[derive(Clone, Debug)]
pub struct Piv {
    config: PivConfig,
}

impl Piv {
    /// Creates an estimator after validating `config`.
    pub fn new(config: PivConfig) -> PivResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PivConfig {
        &self.config
    }

    /// Builds the tile lattice for `pair`.
    pub fn lattice(&self, pair: &DemPair<'_>) -> PivResult<TileLattice> {
        TileLattice::new(
            pair.shape(),
            self.config.template_size,
            self.config.step_size,
        )
    }

    /// Scans all tiles of `pair`.
    pub fn run(&self, pair: &DemPair<'_>) -> PivResult<PivOutput> {
        if self.config.propagate && pair.uncertainty().is_none() {
            return Err(PivError::MissingUncertainty);
        }
        let lattice = self.lattice(pair)?;
        let _span = trace_span!(
            "piv_scan",
            method = self.config.method.as_str(),
            template_size = lattice.template_size(),
            step_size = lattice.step_size(),
            tiles = lattice.len()
        )
        .entered();

        let outcomes = self.outcomes(pair, &lattice)?;

        let mut stats = ScanStats {
            lattice: lattice.counts(),
            ..ScanStats::default()
        };
        let mut matches = Vec::with_capacity(outcomes.len());
        for (tile, outcome) in lattice.tiles().zip(outcomes) {
            stats.record(&outcome);
            match outcome {
                TileOutcome::Accepted(m) => matches.push(m),
                TileOutcome::Skipped(reason) => {
                    trace_debug!(
                        "tile_skipped",
                        vt = tile.vt,
                        hz = tile.hz,
                        reason = reason.as_str()
                    );
                }
            }
        }

        trace_event!(
            "piv_summary",
            accepted = stats.accepted,
            skipped = stats.skipped_total()
        );

        Ok(PivOutput {
            matches,
            stats,
            propagated: self.config.propagate,
        })
    }

    fn outcomes(&self, pair: &DemPair<'_>, lattice: &TileLattice) -> PivResult<Vec<TileOutcome>> {
        #[cfg(feature = "rayon")]
        if self.config.parallel {
            return self::rayon::outcomes_par(self, pair, lattice);
        }
        lattice
            .tiles()
            .map(|tile| self.process_tile(pair, lattice, &tile))
            .collect()
    }

    /// Processes one tile.
    pub fn process_tile(
        &self,
        pair: &DemPair<'_>,
        lattice: &TileLattice,
        tile: &Tile,
    ) -> PivResult<TileOutcome> {
        let size = lattice.template_size();
        let template = window(pair.before(), &tile.template_cols, &tile.template_rows)?;
        let search = window(pair.after(), &tile.search_cols, &tile.search_rows)?;

        let plan = match TemplatePlan::from_view(template) {
            Ok(plan) => plan,
            Err(PivError::DegenerateTemplate { .. }) => {
                return Ok(TileOutcome::Skipped(SkipReason::FlatTemplate))
            }
            Err(err) => return Err(err),
        };

        let surface = self.config.method.surface(&plan, search)?;
        let Some(peak) = surface.peak() else {
            return Ok(TileOutcome::Skipped(SkipReason::NoFinitePeak));
        };
        let Some(neighborhood) = surface.neighborhood(&peak) else {
            return Ok(TileOutcome::Skipped(SkipReason::BorderPeak));
        };
        let Some((hz_delta, vt_delta)) = biquadratic_offset(&neighborhood) else {
            return Ok(TileOutcome::Skipped(SkipReason::SingularFit));
        };

        let offset = lattice.template_offset() as f64;
        let vector = [
            peak.col as f64 - offset + hz_delta,
            peak.row as f64 - offset + vt_delta,
        ];

        let covariance = match (self.config.propagate, pair.uncertainty()) {
            (true, Some((before_sigma, after_sigma))) => {
                let inputs = PatchInputs {
                    template,
                    template_sigma: window(before_sigma, &tile.template_cols, &tile.template_rows)?,
                    window: search.roi(peak.col - 1, peak.row - 1, size + 2, size + 2)?,
                    window_sigma: window(after_sigma, &tile.search_cols, &tile.search_rows)?
                        .roi(peak.col - 1, peak.row - 1, size + 2, size + 2)?,
                };
                match displacement_covariance(
                    &inputs,
                    &neighborhood,
                    self.config.fd_increment,
                    self.config.parallel,
                )? {
                    Some(cov) => Some(cov),
                    None => return Ok(TileOutcome::Skipped(SkipReason::DegeneratePropagation)),
                }
            }
            (true, None) => return Err(PivError::MissingUncertainty),
            (false, _) => None,
        };

        Ok(TileOutcome::Accepted(TileMatch {
            vt: tile.vt,
            hz: tile.hz,
            origin: tile.origin,
            vector,
            peak,
            covariance,
        }))
    }
}

fn window<'a>(
    grid: GridView<'a, f64>,
    cols: &std::ops::Range<usize>,
    rows: &std::ops::Range<usize>,
) -> PivResult<GridView<'a, f64>> {
    grid.roi(cols.start, rows.start, cols.len(), rows.len())
}
