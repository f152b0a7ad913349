use geopiv::{
    CorrelationSurface, DemPair, GeoTransform, GridView, HeightGrid, PivError, TileLattice,
};

#[test]
fn lattice_counts_follow_floor_formula() {
    for &(height, width) in &[(64usize, 64usize), (64, 40), (37, 91), (18, 18), (10, 200)] {
        for template_size in 3..12 {
            for step_size in 1..7 {
                let lattice = TileLattice::new((height, width), template_size, step_size).unwrap();
                let search = 2 * template_size;
                let expect_h = width.saturating_sub(search) / step_size;
                let expect_v = height.saturating_sub(search) / step_size;
                assert_eq!(lattice.counts(), (expect_v, expect_h));
                assert_eq!(lattice.tiles().count(), expect_v * expect_h);
            }
        }
    }
}

#[test]
fn tiles_stay_inside_the_grid() {
    let (height, width) = (50, 47);
    for template_size in [3usize, 4, 9, 10] {
        let lattice = TileLattice::new((height, width), template_size, 3).unwrap();
        for tile in lattice.tiles() {
            assert!(tile.search_rows.end <= height);
            assert!(tile.search_cols.end <= width);
            assert_eq!(tile.template_rows.len(), template_size);
            assert_eq!(tile.search_cols.len(), 2 * template_size + template_size % 2);
            assert!(tile.template_cols.start >= tile.search_cols.start);
            assert!(tile.template_cols.end <= tile.search_cols.end);
        }
    }
}

#[test]
fn invalid_lattice_parameters_are_rejected() {
    assert!(TileLattice::new((64, 64), 2, 5).is_err());
    assert!(TileLattice::new((64, 64), 9, 0).is_err());
}

#[test]
fn peak_tie_break_is_first_in_row_major_order() {
    #[rustfmt::skip]
    let data = vec![
        0.2, 0.1, 0.0,
        0.0, 0.7, 0.7,
        0.7, 0.3, 0.1,
    ];
    let surface = CorrelationSurface::new(data, 3, 3).unwrap();
    let peak = surface.peak().unwrap();
    assert_eq!((peak.row, peak.col), (1, 1));
}

#[test]
fn grid_view_roi_is_zero_copy() {
    let data: Vec<f64> = (0..20).map(f64::from).collect();
    let view = GridView::from_slice(&data, 5, 4).unwrap();
    let roi = view.roi(1, 2, 3, 2).unwrap();
    assert_eq!(roi.row(0).unwrap(), &[11.0, 12.0, 13.0]);
    assert_eq!(roi.to_vec(), vec![11.0, 12.0, 13.0, 16.0, 17.0, 18.0]);
    assert!(view.roi(3, 0, 3, 1).is_err());
}

#[test]
fn mismatched_pairs_fail_before_scanning() {
    let a = HeightGrid::from_fn(20, 20, |c, r| (c + r) as f64).unwrap();
    let b = HeightGrid::from_fn(21, 20, |c, r| (c + r) as f64).unwrap();
    assert!(matches!(
        DemPair::new(&a, &b),
        Err(PivError::GridMismatch { .. })
    ));

    let c = a
        .clone()
        .with_transform(GeoTransform::north_up(10.0, 20.0, 1.0));
    assert_eq!(DemPair::new(&a, &c).unwrap_err(), PivError::TransformMismatch);

    let pair = DemPair::new(&a, &a).unwrap();
    let sigma = HeightGrid::new(vec![0.1; 400], 20, 20).unwrap();
    let short = HeightGrid::new(vec![0.1; 380], 20, 19).unwrap();
    assert!(pair.with_uncertainty(&sigma, &sigma).is_ok());
    assert!(matches!(
        pair.with_uncertainty(&sigma, &short),
        Err(PivError::GridMismatch { .. })
    ));
}
