//! End-to-end scans over synthetic elevation pairs with known motion.

use geopiv::{CorrelationMethod, DemPair, HeightGrid, Piv, PivConfig, SkipReason};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOLERANCE_PX: f64 = 0.05;
const LOOSE_TOLERANCE_PX: f64 = 0.25;

/// Smooth terrain with a 9 px period along both axes and the diagonal.
///
/// The period equals the template size, so every template spans whole
/// periods and the biquadratic fit carries no peak-locking bias.
/// [`TOLERANCE_PX`] only holds for texture aligned this way.
fn terrain(width: usize, height: usize, dx: f64, dy: f64) -> HeightGrid {
    let w = std::f64::consts::TAU / 9.0;
    HeightGrid::from_fn(width, height, |col, row| {
        let x = col as f64 - dx;
        let y = row as f64 - dy;
        250.0 + 3.0 * (w * x + 0.4).cos() + 2.0 * (w * y - 1.1).cos() + (w * (x + y)).cos()
    })
    .unwrap()
}

/// Smooth terrain whose periods (11, 13 and 17 px) do not divide the template.
fn incommensurate_terrain(width: usize, height: usize, dx: f64, dy: f64) -> HeightGrid {
    let w = |period: f64| std::f64::consts::TAU / period;
    HeightGrid::from_fn(width, height, |col, row| {
        let x = col as f64 - dx;
        let y = row as f64 - dy;
        250.0
            + 3.0 * (w(11.0) * x + 0.4).cos()
            + 2.0 * (w(13.0) * y - 1.1).cos()
            + (w(17.0) * (x + y)).cos()
    })
    .unwrap()
}

fn noise(width: usize, height: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height)
        .map(|_| rng.random_range(0.0..10.0))
        .collect()
}

fn recover(method: CorrelationMethod) {
    let before = terrain(64, 64, 0.0, 0.0);
    let after = terrain(64, 64, 1.3, -0.7);
    let pair = DemPair::new(&before, &after).unwrap();
    let piv = Piv::new(PivConfig {
        template_size: 9,
        step_size: 5,
        method,
        ..PivConfig::default()
    })
    .unwrap();
    let out = piv.run(&pair).unwrap();

    assert_eq!(out.stats.lattice, (9, 9));
    assert_eq!(out.matches.len(), 81);
    for m in &out.matches {
        assert!(
            (m.vector[0] - 1.3).abs() < TOLERANCE_PX,
            "tile ({}, {}) du = {}",
            m.vt,
            m.hz,
            m.vector[0]
        );
        assert!(
            (m.vector[1] + 0.7).abs() < TOLERANCE_PX,
            "tile ({}, {}) dv = {}",
            m.vt,
            m.hz,
            m.vector[1]
        );
        assert!(m.covariance.is_none());
    }
}

#[test]
fn subpixel_shift_is_recovered_with_fft() {
    recover(CorrelationMethod::Fft);
}

#[test]
fn subpixel_shift_is_recovered_with_spatial_kernel() {
    recover(CorrelationMethod::Spatial);
}

#[test]
fn subpixel_shift_is_recovered_on_incommensurate_texture() {
    let before = incommensurate_terrain(64, 64, 0.0, 0.0);
    let after = incommensurate_terrain(64, 64, 1.3, -0.7);
    let pair = DemPair::new(&before, &after).unwrap();
    let out = Piv::new(PivConfig::default()).unwrap().run(&pair).unwrap();

    assert_eq!(out.matches.len(), 81);
    let worst = out
        .matches
        .iter()
        .map(|m| (m.vector[0] - 1.3).abs().max((m.vector[1] + 0.7).abs()))
        .fold(0.0, f64::max);
    assert!(worst < LOOSE_TOLERANCE_PX, "worst error {worst}");
}

#[test]
fn kernels_agree_on_every_tile() {
    let before = terrain(48, 48, 0.0, 0.0);
    let after = terrain(48, 48, -0.4, 1.8);
    let pair = DemPair::new(&before, &after).unwrap();
    let run = |method| {
        Piv::new(PivConfig {
            method,
            ..PivConfig::default()
        })
        .unwrap()
        .run(&pair)
        .unwrap()
    };
    let fft = run(CorrelationMethod::Fft);
    let spatial = run(CorrelationMethod::Spatial);
    assert_eq!(fft.matches.len(), spatial.matches.len());
    for (a, b) in fft.matches.iter().zip(&spatial.matches) {
        assert_eq!(a.peak.row, b.peak.row);
        assert_eq!(a.peak.col, b.peak.col);
        assert!((a.vector[0] - b.vector[0]).abs() < 1e-6);
        assert!((a.vector[1] - b.vector[1]).abs() < 1e-6);
    }
}

#[test]
fn flat_templates_never_contribute() {
    let before = HeightGrid::new(vec![12.5; 40 * 40], 40, 40).unwrap();
    let after = HeightGrid::new(noise(40, 40, 7), 40, 40).unwrap();
    let pair = DemPair::new(&before, &after).unwrap();
    let out = Piv::new(PivConfig::default()).unwrap().run(&pair).unwrap();
    assert!(out.matches.is_empty());
    assert_eq!(out.stats.skipped(SkipReason::FlatTemplate), 16);
}

#[test]
fn border_peaks_never_contribute() {
    // after[r][c] = before[r][c - 5]: the match sits on the last surface column
    let (width, height) = (40, 40);
    let data = noise(width, height, 42);
    let fill = noise(5, height, 43);
    let mut shifted = vec![0.0; width * height];
    for r in 0..height {
        for c in 0..width {
            shifted[r * width + c] = if c >= 5 {
                data[r * width + c - 5]
            } else {
                fill[r * 5 + c]
            };
        }
    }
    let before = HeightGrid::new(data, width, height).unwrap();
    let after = HeightGrid::new(shifted, width, height).unwrap();
    let pair = DemPair::new(&before, &after).unwrap();
    let out = Piv::new(PivConfig::default()).unwrap().run(&pair).unwrap();
    assert!(out.matches.is_empty());
    assert_eq!(out.stats.skipped(SkipReason::BorderPeak), 16);
}

#[test]
fn small_grids_produce_empty_results() {
    let before = terrain(17, 30, 0.0, 0.0);
    let after = terrain(17, 30, 0.5, 0.5);
    let pair = DemPair::new(&before, &after).unwrap();
    let out = Piv::new(PivConfig::default()).unwrap().run(&pair).unwrap();
    assert_eq!(out.stats.lattice, (2, 0));
    assert!(out.matches.is_empty());
    assert_eq!(out.stats.skipped_total(), 0);
}
