//! Forward-difference Jacobians for the two propagation stages.

use crate::kernel::spatial::ncc_against_normalized;
use crate::refine::biquadratic_offset;
use crate::util::math::normalize_into;

/// Scratch buffers reused across the perturbations of one neighborhood entry.
struct Scratch {
    area: Vec<f64>,
    area_norm: Vec<f64>,
    template_norm: Vec<f64>,
    perturbed: Vec<f64>,
}

impl Scratch {
    fn new(n: usize) -> Self {
        Self {
            area: vec![0.0; n],
            area_norm: vec![0.0; n],
            template_norm: vec![0.0; n],
            perturbed: vec![0.0; n],
        }
    }
}

/// Jacobian of the 3x3 correlation neighborhood with respect to every input
/// pixel.
///
/// `template` is `size x size` and `window` is `(size + 2) x (size + 2)`,
/// both row-major. The result has 9 rows (neighborhood entries, row-major)
/// and `size² + (size + 2)²` columns (template pixels, then window pixels),
/// stored row-major. Window pixels outside the shifted area of an entry have
/// zero partials.
///
/// Each partial perturbs one pixel by `increment` and re-evaluates the
/// correlation against the unperturbed, normalized counterpart. Returns
/// `None` when the template or one of the shifted areas has zero standard
/// deviation.
pub fn correlation_jacobian(
    template: &[f64],
    window: &[f64],
    size: usize,
    increment: f64,
    parallel: bool,
) -> Option<Vec<f64>> {
    let n = size * size;
    let side = size + 2;
    debug_assert_eq!(template.len(), n);
    debug_assert_eq!(window.len(), side * side);
    let cols = n + side * side;
    let mut jac = vec![0.0f64; 9 * cols];

    let fill = |entry: usize, row: &mut [f64], scratch: &mut Scratch| -> Option<()> {
        let (r, c) = (entry / 3, entry % 3);
        for i in 0..size {
            let src = (r + i) * side + c;
            scratch.area[i * size..(i + 1) * size].copy_from_slice(&window[src..src + size]);
        }
        normalize_into(&scratch.area, &mut scratch.area_norm)?;
        normalize_into(template, &mut scratch.template_norm)?;

        let base_t = ncc_against_normalized(template, &scratch.area_norm)?;
        scratch.perturbed.copy_from_slice(template);
        for k in 0..n {
            scratch.perturbed[k] += increment;
            let v = ncc_against_normalized(&scratch.perturbed, &scratch.area_norm)?;
            row[k] = (v - base_t) / increment;
            scratch.perturbed[k] = template[k];
        }

        let base_s = ncc_against_normalized(&scratch.area, &scratch.template_norm)?;
        scratch.perturbed.copy_from_slice(&scratch.area);
        for i in 0..size {
            for j in 0..size {
                let k = i * size + j;
                scratch.perturbed[k] += increment;
                let v = ncc_against_normalized(&scratch.perturbed, &scratch.template_norm)?;
                row[n + (r + i) * side + (c + j)] = (v - base_s) / increment;
                scratch.perturbed[k] = scratch.area[k];
            }
        }
        Some(())
    };

    #[cfg(feature = "rayon")]
    if parallel {
        use rayon::prelude::*;
        jac.par_chunks_mut(cols)
            .enumerate()
            .try_for_each_init(|| Scratch::new(n), |scratch, (entry, row)| {
                fill(entry, row, scratch)
            })?;
        return Some(jac);
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    let mut scratch = Scratch::new(n);
    for (entry, row) in jac.chunks_mut(cols).enumerate() {
        fill(entry, row, &mut scratch)?;
    }
    Some(jac)
}

/// Jacobian of the sub-pixel offset `(hz, vt)` with respect to the nine
/// neighborhood entries (row-major).
///
/// Returns `None` when the fit is singular at the neighborhood or at any
/// perturbation of it.
pub fn offset_jacobian(neighborhood: &[[f64; 3]; 3], increment: f64) -> Option<[[f64; 9]; 2]> {
    let (hz0, vt0) = biquadratic_offset(neighborhood)?;
    let mut jac = [[0.0f64; 9]; 2];
    let mut perturbed = *neighborhood;
    for k in 0..9 {
        let (r, c) = (k / 3, k % 3);
        perturbed[r][c] += increment;
        let (hz, vt) = biquadratic_offset(&perturbed)?;
        jac[0][k] = (hz - hz0) / increment;
        jac[1][k] = (vt - vt0) / increment;
        perturbed[r][c] = neighborhood[r][c];
    }
    Some(jac)
}
