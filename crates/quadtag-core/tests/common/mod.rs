#![allow(dead_code, clippy::expect_used)]

use proptest::prelude::*;
use quadtag_core::test_utils::SyntheticTag;
use quadtag_core::{DecodedCode, QuadGeometry, TagDetection};

/// Tolerance for pixel comparisons.
///
/// Scales with coordinate magnitude, like the reprojection bound for an
/// unnormalized DLT, but never drops below 1e-4 px.
pub fn pixel_tol(p: [f64; 2]) -> f64 {
    1e-6 * p[0].abs().max(p[1].abs()).max(100.0)
}

pub fn assert_px_close(actual: [f64; 2], expected: [f64; 2]) {
    let tol = pixel_tol(expected);
    assert!(
        (actual[0] - expected[0]).abs() < tol && (actual[1] - expected[1]).abs() < tol,
        "{actual:?} != {expected:?} (tol {tol})"
    );
}

/// Strategy for an axis-free square tag anywhere in a 4k frame.
pub fn tag_strategy() -> impl Strategy<Value = SyntheticTag> {
    (
        0u32..30,
        [(0.0..4000.0), (0.0..3000.0)],
        10.0..400.0,
        0.0..std::f64::consts::TAU,
        0u8..4,
    )
        .prop_map(|(id, center, size, rotation, rot)| {
            SyntheticTag::new(id, center, size)
                .rotation(rotation)
                .num_rotations(rot)
                .homography_center([2000.0, 1500.0])
        })
}

/// Strategy for a perspective-distorted (but convex, CCW) quad detection.
///
/// Each corner of a square is pushed by up to 10 % of the side length.
pub fn perspective_detection_strategy() -> impl Strategy<Value = TagDetection> {
    (tag_strategy(), prop::array::uniform8(-0.1..0.1f64)).prop_map(|(tag, jitter)| {
        let mut corners = tag.corners();
        for (i, corner) in corners.iter_mut().enumerate() {
            corner[0] += jitter[2 * i] * tag.size;
            corner[1] += jitter[2 * i + 1] * tag.size;
        }
        let geometry = QuadGeometry::fit(corners, 4.0 * tag.size, tag.homography_center)
            .expect("jittered square stays convex");
        TagDetection::builder(tag.decoded())
            .geometry(geometry)
            .build()
            .expect("valid detection")
    })
}

/// Strategy for a pair of detections close enough that overlap is undecided a priori.
pub fn nearby_pair_strategy() -> impl Strategy<Value = (TagDetection, TagDetection)> {
    (tag_strategy(), [(-1.0..1.0f64), (-1.0..1.0f64)], 0.5..2.0f64, 0.0..1.0f64).prop_map(
        |(tag, offset, size_ratio, rotation)| {
            let other = SyntheticTag::new(
                tag.id,
                [
                    tag.center[0] + offset[0] * tag.size,
                    tag.center[1] + offset[1] * tag.size,
                ],
                tag.size * size_ratio,
            )
            .rotation(tag.rotation_rad + rotation);
            (tag.build(), other.build())
        },
    )
}

pub fn exact_decode(id: u32) -> DecodedCode {
    SyntheticTag::new(id, [0.0, 0.0], 10.0).decoded()
}
