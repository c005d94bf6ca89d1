//! Synthetic detections and scenes for tests and benchmarks.

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::expect_used)]

use crate::code::{Code, CodeFamily, DecodedCode, rotate90};
use crate::detection::{QuadGeometry, TagDetection};
use crate::homography::TAG_SQUARE;
use rand::Rng;

/// Homography origin used by synthetic detections (center of a 640x480 frame).
pub const DEFAULT_IMAGE_CENTER: [f64; 2] = [320.0, 240.0];

/// A synthetic square tag, turned into a full [`TagDetection`] by [`SyntheticTag::build`].
///
/// Codes come from the 16h5 reference family.
#[derive(Debug, Clone)]
pub struct SyntheticTag {
    /// Tag ID (wrapped into the family size).
    pub id: u32,
    /// Pixel-space center.
    pub center: [f64; 2],
    /// Side length in pixels.
    pub size: f64,
    /// In-image rotation in radians.
    pub rotation_rad: f64,
    /// Number of flipped bits in the observed code.
    pub hamming: u32,
    /// Decoded orientation.
    pub num_rotations: u8,
    /// Fraction of the true perimeter reported as observed.
    pub observed_fraction: f64,
    /// Origin of the homography frame.
    pub homography_center: [f64; 2],
}

impl SyntheticTag {
    /// An axis-aligned, perfectly decoded tag.
    pub fn new(id: u32, center: [f64; 2], size: f64) -> Self {
        Self {
            id,
            center,
            size,
            rotation_rad: 0.0,
            hamming: 0,
            num_rotations: 0,
            observed_fraction: 1.0,
            homography_center: DEFAULT_IMAGE_CENTER,
        }
    }

    /// Set the in-image rotation.
    pub fn rotation(mut self, rad: f64) -> Self {
        self.rotation_rad = rad;
        self
    }

    /// Set the number of bit errors.
    pub fn hamming(mut self, hamming: u32) -> Self {
        self.hamming = hamming;
        self
    }

    /// Set the decoded orientation.
    pub fn num_rotations(mut self, rot: u8) -> Self {
        self.num_rotations = rot;
        self
    }

    /// Set the observed share of the perimeter.
    pub fn observed_fraction(mut self, fraction: f64) -> Self {
        self.observed_fraction = fraction;
        self
    }

    /// Set the homography origin.
    pub fn homography_center(mut self, center: [f64; 2]) -> Self {
        self.homography_center = center;
        self
    }

    /// Corners in traced (pre-orientation) order.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        let half = self.size / 2.0;
        let (sin, cos) = self.rotation_rad.sin_cos();
        TAG_SQUARE.map(|[x, y]| {
            let (px, py) = (x * half, y * half);
            [
                self.center[0] + px * cos - py * sin,
                self.center[1] + px * sin + py * cos,
            ]
        })
    }

    /// The decoder output this tag would produce.
    pub fn decoded(&self) -> DecodedCode {
        let family = CodeFamily::tag16h5();
        #[allow(clippy::cast_possible_truncation)]
        let id = self.id % family.len() as u32;
        let mut bits = family.code(id).expect("valid ID").bits();
        for _ in 0..self.num_rotations {
            bits = rotate90(bits, family.dimension());
        }
        let flips = (1u64 << self.hamming.min(16)) - 1;
        let matched = Code::new(bits, family.width()).expect("valid width");
        let observed = Code::new(bits ^ flips, family.width()).expect("valid width");

        DecodedCode {
            id,
            good: self.hamming <= family.error_recovery_bits(),
            observed_code: observed,
            matched_code: matched,
            hamming_distance: observed.hamming(&matched),
            num_rotations: self.num_rotations,
        }
    }

    /// Fit and assemble the detection.
    pub fn build(&self) -> TagDetection {
        let geometry = QuadGeometry::fit(
            self.corners(),
            4.0 * self.size * self.observed_fraction,
            self.homography_center,
        )
        .expect("synthetic quad is valid");
        TagDetection::builder(self.decoded())
            .geometry(geometry)
            .build()
            .expect("synthetic detection is valid")
    }
}

/// Near-duplicate candidates of `base`, as a quad finder emits for one physical tag.
///
/// Each copy is shifted by up to `max_offset` pixels, resized by up to ±5 %,
/// and carries 0-2 bit errors.
pub fn jittered_cluster<R: Rng>(
    rng: &mut R,
    base: &SyntheticTag,
    count: usize,
    max_offset: f64,
) -> Vec<TagDetection> {
    (0..count)
        .map(|_| {
            let mut tag = base.clone();
            tag.center[0] += rng.gen_range(-max_offset..=max_offset);
            tag.center[1] += rng.gen_range(-max_offset..=max_offset);
            tag.size *= rng.gen_range(0.95..=1.05);
            tag.hamming = rng.gen_range(0..=2);
            tag.build()
        })
        .collect()
}

/// Randomly place up to `count` tags whose footprints cannot overlap.
pub fn random_scene<R: Rng>(
    rng: &mut R,
    count: usize,
    width: f64,
    height: f64,
    size_range: (f64, f64),
) -> Vec<SyntheticTag> {
    let mut tags: Vec<SyntheticTag> = Vec::with_capacity(count);
    let mut attempts = 0;
    while tags.len() < count && attempts < count * 100 {
        attempts += 1;
        let size = rng.gen_range(size_range.0..size_range.1);
        let margin = size;
        if width <= 2.0 * margin || height <= 2.0 * margin {
            continue;
        }
        let center = [
            rng.gen_range(margin..width - margin),
            rng.gen_range(margin..height - margin),
        ];
        // Circumradii sum to ~0.71 * (s1 + s2); stay clear of that.
        let clear = tags.iter().all(|t| {
            let d = (t.center[0] - center[0]).hypot(t.center[1] - center[1]);
            d >= (t.size + size) * 0.8
        });
        if clear {
            #[allow(clippy::cast_possible_truncation)]
            let id = tags.len() as u32;
            tags.push(
                SyntheticTag::new(id, center, size)
                    .rotation(rng.gen_range(0.0..std::f64::consts::TAU))
                    .num_rotations(rng.gen_range(0..4)),
            );
        }
    }
    tags
}

/// Mean Euclidean distance between corresponding corners.
/// Tries all 4 cyclic shifts of `detected` and returns the smallest error.
pub fn compute_corner_error(detected: &[[f64; 2]; 4], ground_truth: &[[f64; 2]; 4]) -> f64 {
    let mut min_error = f64::MAX;
    for rot in 0..4 {
        let mut sum_dist = 0.0;
        for i in 0..4 {
            let d = &detected[(i + rot) % 4];
            let g = &ground_truth[i];
            sum_dist += (d[0] - g[0]).hypot(d[1] - g[1]);
        }
        min_error = min_error.min(sum_dist / 4.0);
    }
    min_error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_tag_round_trips() {
        let tag = SyntheticTag::new(5, [200.0, 150.0], 64.0)
            .rotation(0.3)
            .num_rotations(3);
        let det = tag.build();
        assert!(det.good());
        assert_eq!(det.id(), 5);
        assert!(compute_corner_error(det.corners(), &tag.corners()) < 1e-9);
        assert!((det.center()[0] - 200.0).abs() < 1e-7);
    }

    #[test]
    fn test_hamming_sets_good_flag() {
        assert!(SyntheticTag::new(0, [0.0, 0.0], 10.0).hamming(1).build().good());
        assert!(!SyntheticTag::new(0, [0.0, 0.0], 10.0).hamming(2).build().good());
    }
}
