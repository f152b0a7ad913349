#![cfg(feature = "rayon")]

use geopiv::{DemPair, HeightGrid, Piv, PivConfig};

fn terrain(dx: f64, dy: f64) -> HeightGrid {
    let w = std::f64::consts::TAU / 9.0;
    HeightGrid::from_fn(52, 46, |col, row| {
        let x = col as f64 - dx;
        let y = row as f64 - dy;
        250.0 + 3.0 * (w * x + 0.4).cos() + 2.0 * (w * y - 1.1).cos() + (w * (x + y)).cos()
    })
    .unwrap()
}

#[test]
fn parallel_scan_matches_sequential() {
    let before = terrain(0.0, 0.0);
    let after = terrain(0.6, -1.4);
    // left third is flat so skips are interleaved with accepted tiles
    let flat_edge = HeightGrid::from_fn(52, 46, |col, row| {
        if col < 16 {
            3.0
        } else {
            before.data()[row * 52 + col]
        }
    })
    .unwrap();
    let sigma = HeightGrid::new(vec![0.1; 52 * 46], 52, 46).unwrap();
    let pair = DemPair::new(&flat_edge, &after)
        .unwrap()
        .with_uncertainty(&sigma, &sigma)
        .unwrap();

    let config = PivConfig {
        template_size: 8,
        step_size: 3,
        propagate: true,
        ..PivConfig::default()
    };
    let sequential = Piv::new(config.clone()).unwrap().run(&pair).unwrap();
    let parallel = Piv::new(PivConfig {
        parallel: true,
        ..config
    })
    .unwrap()
    .run(&pair)
    .unwrap();

    assert!(sequential.stats.skipped_total() > 0);
    assert!(sequential.stats.accepted > 0);
    assert_eq!(sequential, parallel);
}
