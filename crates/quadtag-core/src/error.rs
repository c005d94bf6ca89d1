//! Error type shared by record construction and coordinate mapping.

use thiserror::Error;

/// Errors raised when building or geometrically querying a [`crate::TagDetection`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    /// The builder was finalized before a quad geometry was supplied.
    #[error("detection is missing its quad geometry")]
    MissingGeometry,

    /// The quadrilateral has (near-)zero area, non-finite coordinates, or no homography fit.
    #[error("degenerate quadrilateral (signed area {area})")]
    DegenerateQuad {
        /// Signed shoelace area of the corners in pixels².
        area: f64,
    },

    /// The quadrilateral is concave or self-intersecting.
    #[error("quadrilateral is not convex (corner {corner} turns the wrong way)")]
    NonConvexQuad {
        /// Index of the first corner whose turn is not counter-clockwise.
        corner: usize,
    },

    /// The corners wind clockwise in pixel coordinates.
    #[error("corners must be counter-clockwise (signed area {area})")]
    ClockwiseWinding {
        /// Signed shoelace area of the corners in pixels².
        area: f64,
    },

    /// The homography cannot be inverted.
    #[error("homography is singular or non-finite (determinant {determinant})")]
    SingularHomography {
        /// Determinant of the offending matrix.
        determinant: f64,
    },

    /// Rotation count outside `0..=3`.
    #[error("num_rotations must be in 0..=3, got {0}")]
    InvalidRotation(u8),

    /// A zero hamming distance was reported for two different codes.
    #[error("hamming distance is 0 but observed and matched codes differ")]
    CodeMismatch,

    /// Observed and matched codes do not have the same bit width.
    #[error("code width mismatch: observed {observed} bits, matched {matched} bits")]
    CodeWidthMismatch {
        /// Width of the observed code.
        observed: u32,
        /// Width of the matched code.
        matched: u32,
    },

    /// A code width of zero or above 64 bits.
    #[error("code width must be in 1..=64, got {0}")]
    InvalidCodeWidth(u32),

    /// Perspective division by (near-)zero: the point lies on the tag's vanishing line.
    #[error("tag coordinate ({x}, {y}) maps onto the vanishing line")]
    VanishingLine {
        /// Tag-local x.
        x: f64,
        /// Tag-local y.
        y: f64,
    },
}
