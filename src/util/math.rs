//! Numeric helpers shared by the correlation and propagation kernels.

/// Population mean and standard deviation of `values` (two-pass).
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mut ss = 0.0f64;
    for &v in values {
        let d = v - mean;
        ss += d * d;
    }
    (mean, (ss / n).sqrt())
}

/// Writes `(v - mean) / std` into `out`.
///
/// Returns `None` when the standard deviation is zero or not finite, in which
/// case `out` is left unspecified.
pub(crate) fn normalize_into(values: &[f64], out: &mut [f64]) -> Option<()> {
    debug_assert_eq!(values.len(), out.len());
    let (mean, std) = mean_std(values);
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    let inv_std = 1.0 / std;
    for (dst, &v) in out.iter_mut().zip(values) {
        *dst = (v - mean) * inv_std;
    }
    Some(())
}

/// Computes `J · diag(variances) · Jᵗ` for a 9-row Jacobian stored row-major.
pub(crate) fn congruence_diag_9(jacobian: &[f64], variances: &[f64]) -> [[f64; 9]; 9] {
    let cols = variances.len();
    debug_assert_eq!(jacobian.len(), 9 * cols);
    let mut out = [[0.0f64; 9]; 9];
    for a in 0..9 {
        let row_a = &jacobian[a * cols..(a + 1) * cols];
        for b in a..9 {
            let row_b = &jacobian[b * cols..(b + 1) * cols];
            let mut acc = 0.0f64;
            for k in 0..cols {
                acc += row_a[k] * variances[k] * row_b[k];
            }
            out[a][b] = acc;
            out[b][a] = acc;
        }
    }
    out
}

/// Computes `J · C · Jᵗ` for a 2x9 Jacobian and a 9x9 covariance.
pub(crate) fn congruence_2x9(jacobian: &[[f64; 9]; 2], cov: &[[f64; 9]; 9]) -> [[f64; 2]; 2] {
    let mut jc = [[0.0f64; 9]; 2];
    for i in 0..2 {
        for b in 0..9 {
            let mut acc = 0.0f64;
            for a in 0..9 {
                acc += jacobian[i][a] * cov[a][b];
            }
            jc[i][b] = acc;
        }
    }
    let mut out = [[0.0f64; 2]; 2];
    for i in 0..2 {
        for j in i..2 {
            let mut acc = 0.0f64;
            for b in 0..9 {
                acc += jc[i][b] * jacobian[j][b];
            }
            out[i][j] = acc;
            out[j][i] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{congruence_2x9, congruence_diag_9, mean_std, normalize_into};

    #[test]
    fn mean_std_uses_population_variance() {
        let (mean, std) = mean_std(&[0.0, 1.0, 2.0, 3.0]);
        assert!((mean - 1.5).abs() < 1e-12);
        assert!((std - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn normalize_rejects_constant_values() {
        let mut out = [0.0; 3];
        assert!(normalize_into(&[4.0, 4.0, 4.0], &mut out).is_none());
        assert!(normalize_into(&[1.0, 2.0, 3.0], &mut out).is_some());
        assert!((out.iter().sum::<f64>()).abs() < 1e-12);
        let ss: f64 = out.iter().map(|v| v * v).sum();
        assert!((ss - 3.0).abs() < 1e-12);
    }

    #[test]
    fn congruence_diag_matches_dense_product() {
        let cols = 4;
        let jac: Vec<f64> = (0..9 * cols).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let var = [0.5, 1.0, 2.0, 0.25];
        let out = congruence_diag_9(&jac, &var);
        for a in 0..9 {
            for b in 0..9 {
                let mut expected = 0.0;
                for k in 0..cols {
                    expected += jac[a * cols + k] * var[k] * jac[b * cols + k];
                }
                assert!((out[a][b] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn congruence_2x9_with_identity_picks_gram_matrix() {
        let mut cov = [[0.0; 9]; 9];
        for (i, row) in cov.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        let mut jac = [[0.0; 9]; 2];
        jac[0][0] = 2.0;
        jac[0][4] = 1.0;
        jac[1][4] = 3.0;
        let out = congruence_2x9(&jac, &cov);
        assert!((out[0][0] - 5.0).abs() < 1e-12);
        assert!((out[0][1] - 3.0).abs() < 1e-12);
        assert!((out[1][0] - 3.0).abs() < 1e-12);
        assert!((out[1][1] - 9.0).abs() < 1e-12);
    }
}
