//! Affine pixel-to-ground transform.

use serde::{Deserialize, Serialize};

/// 3x3 affine matrix mapping pixel `(col, row, 1)` to ground `(x, y, 1)`.
///
/// ```text
/// x = m[0][0] * col + m[0][1] * row + m[0][2]
/// y = m[1][0] * col + m[1][1] * row + m[1][2]
/// ```
///
/// Displacement export only uses the pixel size `m[0][0]` and the two
/// translation terms; rows are assumed to run southward with square pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    matrix: [[f64; 3]; 3],
}

impl GeoTransform {
    /// Creates a transform from a full 3x3 matrix.
    pub fn from_matrix(matrix: [[f64; 3]; 3]) -> Self {
        Self { matrix }
    }

    /// Creates a transform from the affine six-tuple `(a, b, c, d, e, f)`
    /// where `x = a*col + b*row + c` and `y = d*col + e*row + f`.
    pub fn from_affine(coeffs: [f64; 6]) -> Self {
        let [a, b, c, d, e, f] = coeffs;
        Self {
            matrix: [[a, b, c], [d, e, f], [0.0, 0.0, 1.0]],
        }
    }

    /// Creates a transform from a GDAL-style array
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        let [c, a, b, f, d, e] = coeffs;
        Self::from_affine([a, b, c, d, e, f])
    }

    /// North-up transform with square pixels of `pixel_size` ground units.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self::from_affine([pixel_size, 0.0, origin_x, 0.0, -pixel_size, origin_y])
    }

    /// Returns the 3x3 matrix.
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.matrix
    }

    /// Ground size of one pixel (`m[0][0]`).
    pub fn pixel_size(&self) -> f64 {
        self.matrix[0][0]
    }

    /// Ground x of the left edge (`m[0][2]`).
    pub fn origin_x(&self) -> f64 {
        self.matrix[0][2]
    }

    /// Ground y of the top edge (`m[1][2]`).
    pub fn origin_y(&self) -> f64 {
        self.matrix[1][2]
    }

    /// Bitwise equality of all nine coefficients.
    ///
    /// Unlike `==`, this distinguishes `0.0` from `-0.0` and treats identical
    /// NaN payloads as equal.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.matrix
            .iter()
            .flatten()
            .zip(other.matrix.iter().flatten())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::from_affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
    }
}
