//! SIMD reductions for the spatial correlation kernel using the `wide` crate.
//!
//! The finite-difference loops of the uncertainty propagator spend nearly all
//! of their time in these two reductions, processing 4 values at a time with
//! `f64x4` and a scalar remainder.

use wide::f64x4;

const LANES: usize = 4;

/// Load 4 f64 values into f64x4.
#[inline]
fn load_f64x4(slice: &[f64]) -> f64x4 {
    f64x4::from([slice[0], slice[1], slice[2], slice[3]])
}

/// Horizontal sum of f64x4.
#[inline]
fn hsum(v: f64x4) -> f64 {
    let arr = v.to_array();
    (arr[0] + arr[1]) + (arr[2] + arr[3])
}

/// Sum of all values.
#[inline]
pub(crate) fn sum(values: &[f64]) -> f64 {
    let mut acc = f64x4::ZERO;
    let chunks = values.chunks_exact(LANES);
    let tail: f64 = chunks.remainder().iter().sum();
    for chunk in chunks {
        acc += load_f64x4(chunk);
    }
    hsum(acc) + tail
}

/// Returns `(Σ (p - mean)², Σ (p - mean) * q)`.
#[inline]
pub(crate) fn centered_moments(p: &[f64], q: &[f64], mean: f64) -> (f64, f64) {
    debug_assert_eq!(p.len(), q.len());
    let mean_v = f64x4::splat(mean);
    let mut ss_v = f64x4::ZERO;
    let mut dot_v = f64x4::ZERO;

    let simd_end = p.len() / LANES * LANES;
    let mut i = 0;
    while i < simd_end {
        let d = load_f64x4(&p[i..]) - mean_v;
        ss_v += d * d;
        dot_v += d * load_f64x4(&q[i..]);
        i += LANES;
    }

    let mut ss = 0.0f64;
    let mut dot = 0.0f64;
    while i < p.len() {
        let d = p[i] - mean;
        ss += d * d;
        dot += d * q[i];
        i += 1;
    }

    (hsum(ss_v) + ss, hsum(dot_v) + dot)
}
