//! Geometric model of square fiducial tag detections.
//!
//! A [`TagDetection`] is what a tag detector knows about one candidate marker
//! once its quadrilateral has been fitted and its bit pattern decoded. This
//! crate owns the geometry of that record:
//!
//! - **Coordinate mapping**: [`TagDetection::interpolate`] pushes a tag-local
//!   point in `[-1, 1]²` through the record's homography into pixel space.
//! - **Overlap classification**: [`TagDetection::overlaps_too_much`] decides
//!   whether two candidates are the same physical tag.
//! - **Rescaling**: [`TagDetection::scale_tag`] moves a detection made on a
//!   decimated image back to full-resolution pixels.
//!
//! Image processing, quad search and bit sampling happen upstream. Their
//! outputs enter through [`detection::QuadGeometry`] and [`code::DecodedCode`].
//!
//! # Example
//!
//! ```
//! use quadtag_core::{Code, DecodedCode, QuadGeometry, TagDetection};
//!
//! let geometry = QuadGeometry::fit(
//!     [[10.0, 10.0], [110.0, 10.0], [110.0, 110.0], [10.0, 110.0]],
//!     400.0,
//!     [320.0, 240.0],
//! )?;
//! let code = Code::new(0xe960, 16)?;
//! let mut det = TagDetection::builder(DecodedCode::exact(0, code, 0))
//!     .geometry(geometry)
//!     .build()?;
//!
//! let [x, y] = det.interpolate(0.0, 0.0)?;
//! assert!((x - 60.0).abs() < 1e-6 && (y - 60.0).abs() < 1e-6);
//!
//! det.scale_tag(2.0);
//! assert!((det.center()[0] - 120.0).abs() < 1e-6);
//! # Ok::<(), quadtag_core::DetectionError>(())
//! ```

/// Decoder-stage boundary: codes, code tables and decode results.
pub mod code;
/// Configuration types for post-processing.
pub mod config;
/// Removal of redundant candidates.
pub mod dedup;
/// The detection record, its builder and quad geometry.
pub mod detection;
/// Error type.
pub mod error;
/// Homography fitting and projection.
pub mod homography;
/// Quad footprint comparison.
pub mod overlap;
/// Filter / rescale / dedup pass over a candidate list.
pub mod pipeline;
/// Utilities for testing and synthetic data generation.
pub mod test_utils;

pub use crate::code::{Code, CodeFamily, DecodedCode};
pub use crate::config::{DedupConfig, PostprocessConfig};
pub use crate::dedup::dedup_detections;
pub use crate::detection::{QuadGeometry, TagDetection, TagDetectionBuilder};
pub use crate::error::DetectionError;
pub use crate::homography::Homography;
pub use crate::pipeline::{PostprocessStats, postprocess};
