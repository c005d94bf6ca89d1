//! The detection record and its geometric queries.
//!
//! A [`TagDetection`] is assembled in two steps, mirroring the two upstream
//! stages that produce it:
//!
//! 1. the decoder supplies a [`DecodedCode`] (identity and confidence),
//! 2. the quad-fit stage supplies a [`QuadGeometry`] (pixel-space footprint).
//!
//! [`TagDetectionBuilder::build`] validates both halves and aligns the corner
//! order with the decoded orientation, so `corners[0]` is always the same
//! physical corner of the tag regardless of how the quad was traced.
//!
//! # Homography convention
//!
//! `homography` maps tag-local homogeneous coordinates over `[-1, 1]²` to pixel
//! coordinates *relative to* `homography_center`:
//!
//! ```text
//! (u, v, w)ᵀ = H · (x, y, 1)ᵀ
//! pixel      = (u / w, v / w) + homography_center
//! ```
//!
//! # Scale caveat
//!
//! [`TagDetection::scale_tag`] rescales `center` and `corners` only. The
//! homography, its center and the observed perimeter stay in the frame the quad
//! was fitted in, so after a non-unit rescale `interpolate` no longer lands on
//! `corners`. The accumulated factor is exposed through
//! [`TagDetection::applied_scale`] for consumers that need to compensate.

use crate::code::{Code, DecodedCode};
use crate::error::DetectionError;
use crate::homography::{Homography, TAG_SQUARE};
use crate::overlap::{quads_overlap, signed_area};
use nalgebra::Matrix3;

/// Quads with a smaller area (pixels²) are rejected as degenerate.
pub const MIN_QUAD_AREA: f64 = 1e-6;

/// Pixel-space footprint produced by the quad-fit stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadGeometry {
    corners: [[f64; 2]; 4],
    center: [f64; 2],
    observed_perimeter: f64,
    homography: Homography,
    homography_center: [f64; 2],
}

impl QuadGeometry {
    /// Fit the tag-local square to `corners` relative to `homography_center`.
    ///
    /// The center is derived as the image of the tag-local origin, which is the
    /// projective center of the quad rather than its vertex mean.
    ///
    /// # Errors
    /// Fails if the corners are non-finite, degenerate, clockwise, not convex,
    /// or do not admit an invertible homography.
    pub fn fit(
        corners: [[f64; 2]; 4],
        observed_perimeter: f64,
        homography_center: [f64; 2],
    ) -> Result<Self, DetectionError> {
        let area = validate_winding(&corners)?;
        let relative = corners.map(|c| [c[0] - homography_center[0], c[1] - homography_center[1]]);
        let homography =
            Homography::square_to_quad(&relative).ok_or(DetectionError::DegenerateQuad { area })?;
        let origin = homography
            .try_project([0.0, 0.0])
            .ok_or(DetectionError::DegenerateQuad { area })?;

        Ok(Self {
            corners,
            center: [
                origin[0] + homography_center[0],
                origin[1] + homography_center[1],
            ],
            observed_perimeter,
            homography,
            homography_center,
        })
    }

    /// Assemble a geometry from a homography fitted elsewhere.
    ///
    /// # Errors
    /// Fails if the corners are non-finite, degenerate, clockwise or not convex,
    /// or if the homography is singular.
    pub fn from_parts(
        corners: [[f64; 2]; 4],
        center: [f64; 2],
        observed_perimeter: f64,
        homography: Matrix3<f64>,
        homography_center: [f64; 2],
    ) -> Result<Self, DetectionError> {
        let area = validate_winding(&corners)?;
        if !center.iter().chain(&homography_center).all(|v| v.is_finite()) {
            return Err(DetectionError::DegenerateQuad { area });
        }
        let homography = Homography::new(homography);
        if !homography.is_invertible() {
            return Err(DetectionError::SingularHomography {
                determinant: homography.determinant(),
            });
        }
        Ok(Self {
            corners,
            center,
            observed_perimeter,
            homography,
            homography_center,
        })
    }

    /// Corners in the order the quad was traced.
    #[must_use]
    pub fn corners(&self) -> &[[f64; 2]; 4] {
        &self.corners
    }

    /// Pixel-space center.
    #[must_use]
    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    /// Observed perimeter in pixels.
    #[must_use]
    pub fn observed_perimeter(&self) -> f64 {
        self.observed_perimeter
    }

    /// Tag-to-offset-pixel homography.
    #[must_use]
    pub fn homography(&self) -> &Homography {
        &self.homography
    }

    /// Pixel origin of the homography frame.
    #[must_use]
    pub fn homography_center(&self) -> [f64; 2] {
        self.homography_center
    }
}

/// Signed area of a valid (finite, counter-clockwise, convex) quad.
fn validate_winding(corners: &[[f64; 2]; 4]) -> Result<f64, DetectionError> {
    if !corners.iter().flatten().all(|v| v.is_finite()) {
        return Err(DetectionError::DegenerateQuad { area: f64::NAN });
    }
    let area = signed_area(corners);
    if area.abs() < MIN_QUAD_AREA {
        return Err(DetectionError::DegenerateQuad { area });
    }
    if area < 0.0 {
        return Err(DetectionError::ClockwiseWinding { area });
    }
    // Every corner must turn left, otherwise the square-to-quad homography
    // puts its vanishing line through the tag.
    for i in 0..4 {
        let [a, b, c] = [corners[i], corners[(i + 1) % 4], corners[(i + 2) % 4]];
        let turn = (b[0] - a[0]) * (c[1] - b[1]) - (b[1] - a[1]) * (c[0] - b[0]);
        if turn.is_nan() || turn <= 0.0 {
            return Err(DetectionError::NonConvexQuad {
                corner: (i + 1) % 4,
            });
        }
    }
    Ok(area)
}

/// A fully validated tag observation.
#[derive(Clone, Debug, PartialEq)]
pub struct TagDetection {
    id: u32,
    good: bool,
    observed_code: Code,
    matched_code: Code,
    hamming_distance: u32,
    num_rotations: u8,
    center: [f64; 2],
    corners: [[f64; 2]; 4],
    observed_perimeter: f64,
    homography: Matrix3<f64>,
    homography_center: [f64; 2],
    applied_scale: f64,
}

impl TagDetection {
    /// Start building a detection from the decoder's output.
    #[must_use]
    pub fn builder(decoded: DecodedCode) -> TagDetectionBuilder {
        TagDetectionBuilder::new(decoded)
    }

    /// Matched code identifier. Meaningful only when [`Self::good`] is true.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether decoding succeeded within the accepted error budget.
    #[must_use]
    pub fn good(&self) -> bool {
        self.good
    }

    /// Bits sampled from the image.
    #[must_use]
    pub fn observed_code(&self) -> Code {
        self.observed_code
    }

    /// Nearest valid code in the observed orientation.
    #[must_use]
    pub fn matched_code(&self) -> Code {
        self.matched_code
    }

    /// Bit disagreement between observed and matched code. Lower is more confident.
    #[must_use]
    pub fn hamming_distance(&self) -> u32 {
        self.hamming_distance
    }

    /// Clockwise quarter turns aligning the matched code with the observation.
    #[must_use]
    pub fn num_rotations(&self) -> u8 {
        self.num_rotations
    }

    /// Pixel-space center.
    #[must_use]
    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    /// Counter-clockwise pixel corners, starting from the tag's reference corner.
    #[must_use]
    pub fn corners(&self) -> &[[f64; 2]; 4] {
        &self.corners
    }

    /// Length of the observed (not inferred) quad boundary, in fit-time pixels.
    #[must_use]
    pub fn observed_perimeter(&self) -> f64 {
        self.observed_perimeter
    }

    /// Tag-local to offset-pixel homography, in fit-time pixels.
    #[must_use]
    pub fn homography(&self) -> &Matrix3<f64> {
        &self.homography
    }

    /// Pixel origin the homography is relative to, in fit-time pixels.
    #[must_use]
    pub fn homography_center(&self) -> [f64; 2] {
        self.homography_center
    }

    /// Product of every factor passed to [`Self::scale_tag`].
    #[must_use]
    pub fn applied_scale(&self) -> f64 {
        self.applied_scale
    }

    /// Map a tag-local point in `[-1, 1]²` to pixel coordinates.
    ///
    /// # Errors
    /// Returns [`DetectionError::VanishingLine`] if the point projects to (or
    /// numerically near) infinity.
    pub fn interpolate(&self, x: f64, y: f64) -> Result<[f64; 2], DetectionError> {
        let p = Homography::new(self.homography)
            .try_project([x, y])
            .ok_or(DetectionError::VanishingLine { x, y })?;
        Ok([
            p[0] + self.homography_center[0],
            p[1] + self.homography_center[1],
        ])
    }

    /// In-image angle (radians) of the tag's `(-1,-1) -> (1,-1)` edge.
    ///
    /// Returns `0.0` when the edge cannot be mapped.
    #[must_use]
    pub fn xy_orientation(&self) -> f64 {
        match (self.interpolate(-1.0, -1.0), self.interpolate(1.0, -1.0)) {
            (Ok(p0), Ok(p1)) => {
                let orient = (p1[1] - p0[1]).atan2(p1[0] - p0[0]);
                if orient.is_nan() { 0.0 } else { orient }
            }
            _ => 0.0,
        }
    }

    /// Whether `other` is a redundant observation of the same physical tag.
    ///
    /// Symmetric and identity-agnostic; see [`crate::overlap`] for the policy.
    #[must_use]
    pub fn overlaps_too_much(&self, other: &TagDetection) -> bool {
        quads_overlap(self.center, &self.corners, other.center, &other.corners)
    }

    /// Rescale `center` and `corners` by `scale`, e.g. to undo decimation.
    ///
    /// The homography, its center and the observed perimeter are left in the
    /// fit-time frame; see the module docs.
    ///
    /// `scale` must be finite and positive.
    pub fn scale_tag(&mut self, scale: f64) {
        debug_assert!(
            scale.is_finite() && scale > 0.0,
            "scale must be finite and positive, got {scale}"
        );
        self.center = self.center.map(|v| v * scale);
        for corner in &mut self.corners {
            *corner = corner.map(|v| v * scale);
        }
        self.applied_scale *= scale;
    }
}

/// Two-step constructor for [`TagDetection`].
#[derive(Clone, Debug)]
pub struct TagDetectionBuilder {
    decoded: DecodedCode,
    geometry: Option<QuadGeometry>,
}

impl TagDetectionBuilder {
    /// Start from the decoder's output.
    #[must_use]
    pub fn new(decoded: DecodedCode) -> Self {
        Self {
            decoded,
            geometry: None,
        }
    }

    /// Attach the quad-fit output.
    #[must_use]
    pub fn geometry(mut self, geometry: QuadGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Validate and assemble the detection.
    ///
    /// Corners are rotated so that `corners[i] = quad[(i + num_rotations) % 4]`
    /// and the homography is turned to match, keeping
    /// `interpolate(TAG_SQUARE[i]) == corners[i]`.
    ///
    /// # Errors
    /// Returns the first broken invariant among rotation range, code widths,
    /// zero-hamming consistency and missing geometry.
    pub fn build(self) -> Result<TagDetection, DetectionError> {
        let d = self.decoded;
        if d.num_rotations > 3 {
            return Err(DetectionError::InvalidRotation(d.num_rotations));
        }
        if d.observed_code.width() != d.matched_code.width() {
            return Err(DetectionError::CodeWidthMismatch {
                observed: d.observed_code.width(),
                matched: d.matched_code.width(),
            });
        }
        if d.hamming_distance == 0 && d.observed_code != d.matched_code {
            return Err(DetectionError::CodeMismatch);
        }
        let geometry = self.geometry.ok_or(DetectionError::MissingGeometry)?;

        let rot = usize::from(d.num_rotations);
        let corners = std::array::from_fn(|i| geometry.corners[(i + rot) % 4]);
        let homography = geometry.homography.h * Homography::quarter_turns(d.num_rotations);

        Ok(TagDetection {
            id: d.id,
            good: d.good,
            observed_code: d.observed_code,
            matched_code: d.matched_code,
            hamming_distance: d.hamming_distance,
            num_rotations: d.num_rotations,
            center: geometry.center,
            corners,
            observed_perimeter: geometry.observed_perimeter,
            homography,
            homography_center: geometry.homography_center,
            applied_scale: 1.0,
        })
    }
}

/// Tag-local coordinates of `corners()[i]`.
#[must_use]
pub fn tag_corner(i: usize) -> [f64; 2] {
    TAG_SQUARE[i % 4]
}
