//! Projective transforms between tag-local and pixel coordinates.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

/// Canonical tag-local corners, in the same order a detection stores its pixel corners.
pub const TAG_SQUARE: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Relative tolerance used for determinant and perspective-division checks.
const REL_EPS: f64 = 1e-12;

/// A 3x3 Homography matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    /// The 3x3 homography matrix.
    pub h: Matrix3<f64>,
}

impl Homography {
    /// Wrap an existing matrix.
    #[must_use]
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    /// Compute homography from 4 source points to 4 destination points using DLT.
    /// Points are [x, y].
    #[must_use]
    pub fn from_pairs(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Option<Self> {
        let mut a = SMatrix::<f64, 8, 9>::zeros();

        for i in 0..4 {
            let [sx, sy] = src[i];
            let [dx, dy] = dst[i];

            a[(i * 2, 0)] = -sx;
            a[(i * 2, 1)] = -sy;
            a[(i * 2, 2)] = -1.0;
            a[(i * 2, 6)] = sx * dx;
            a[(i * 2, 7)] = sy * dx;
            a[(i * 2, 8)] = dx;

            a[(i * 2 + 1, 3)] = -sx;
            a[(i * 2 + 1, 4)] = -sy;
            a[(i * 2 + 1, 5)] = -1.0;
            a[(i * 2 + 1, 6)] = sx * dy;
            a[(i * 2 + 1, 7)] = sy * dy;
            a[(i * 2 + 1, 8)] = dy;
        }

        // Fix h[8] = 1 and solve the remaining 8x8 system.
        let m = a.fixed_columns::<8>(0).into_owned();
        let b: SVector<f64, 8> = -a.column(8).into_owned();

        let h_vec = m.lu().solve(&b)?;
        let h = Matrix3::new(
            h_vec[0], h_vec[1], h_vec[2], h_vec[3], h_vec[4], h_vec[5], h_vec[6], h_vec[7], 1.0,
        );
        let homography = Self { h };
        homography.is_invertible().then_some(homography)
    }

    /// Homography mapping [`TAG_SQUARE`] onto `dst`.
    #[must_use]
    pub fn square_to_quad(dst: &[[f64; 2]; 4]) -> Option<Self> {
        Self::from_pairs(&TAG_SQUARE, dst)
    }

    /// Quarter turns of the tag-local frame.
    ///
    /// `Q` maps `TAG_SQUARE[i]` to `TAG_SQUARE[(i + 1) % 4]`, so
    /// `quarter_turns(r)` maps `TAG_SQUARE[i]` to `TAG_SQUARE[(i + r) % 4]`.
    #[must_use]
    pub fn quarter_turns(r: u8) -> Matrix3<f64> {
        let q = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        (0..r % 4).fold(Matrix3::identity(), |acc, _| acc * q)
    }

    /// Determinant of the matrix.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.h.determinant()
    }

    /// Whether the matrix is finite and numerically invertible.
    ///
    /// The determinant is compared against the cube of the Frobenius norm so the
    /// test does not depend on the arbitrary projective scale of `h`.
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        if self.h.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let norm = self.h.norm();
        norm > 0.0 && self.determinant().abs() > REL_EPS * norm.powi(3)
    }

    /// Inverse transform, if one exists.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        if !self.is_invertible() {
            return None;
        }
        self.h.try_inverse().map(Self::new)
    }

    /// Project a point using the homography.
    ///
    /// Returns `None` when the point sits on (or numerically next to) the
    /// vanishing line, or when the result is not finite.
    #[must_use]
    pub fn try_project(&self, p: [f64; 2]) -> Option<[f64; 2]> {
        let res = self.h * Vector3::new(p[0], p[1], 1.0);
        let w = res[2];
        if w.abs() <= REL_EPS * self.h.norm() {
            return None;
        }
        let out = [res[0] / w, res[1] / w];
        (out[0].is_finite() && out[1].is_finite()).then_some(out)
    }
}
