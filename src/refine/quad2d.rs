//! Biquadratic fit for `(x, y)` sub-pixel refinement.

/// Sub-pixel offset of the maximum of a local quadratic surface.
///
/// The input is a 3x3 neighborhood of correlation scores centered at
/// `s[1][1]` (rows top to bottom, columns left to right). Central differences
/// give the gradient and Hessian of the fitted quadratic, and one Newton step
/// from the center yields `(hz, vt)`: `hz` positive left-to-right, `vt`
/// positive top-to-bottom.
///
/// Returns `None` when the Hessian is singular or the step is not finite.
/// Unlike a separable fit, the mixed term `dxy` couples the two axes, so the
/// offset is exact for any quadratic surface.
pub fn biquadratic_offset(s: &[[f64; 3]; 3]) -> Option<(f64, f64)> {
    let dx = (s[1][2] - s[1][0]) / 2.0;
    let dxx = s[1][2] + s[1][0] - 2.0 * s[1][1];
    let dy = (s[2][1] - s[0][1]) / 2.0;
    let dyy = s[2][1] + s[0][1] - 2.0 * s[1][1];
    let dxy = (s[2][2] - s[2][0] - s[0][2] + s[0][0]) / 4.0;

    let denom = dxx * dyy - dxy * dxy;
    if denom == 0.0 {
        return None;
    }
    let hz = -(dyy * dx - dxy * dy) / denom;
    let vt = -(dxx * dy - dxy * dx) / denom;
    if hz.is_finite() && vt.is_finite() {
        Some((hz, vt))
    } else {
        None
    }
}
