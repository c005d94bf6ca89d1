//! Overlap-based deduplication of candidate detections.

use crate::config::DedupConfig;
use crate::detection::TagDetection;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Preference order between two candidates: lower hamming distance first, then
/// the longer observed perimeter.
#[must_use]
pub fn rank(a: &TagDetection, b: &TagDetection) -> Ordering {
    a.hamming_distance()
        .cmp(&b.hamming_distance())
        .then_with(|| b.observed_perimeter().total_cmp(&a.observed_perimeter()))
}

fn conflicts(a: &TagDetection, b: &TagDetection, config: &DedupConfig) -> bool {
    if config.require_matching_id && a.id() != b.id() {
        return false;
    }
    a.overlaps_too_much(b)
}

/// Remove redundant detections, keeping the best-ranked one of each overlapping group.
///
/// Pairwise overlap checks fan out over rayon; the keep/drop decision is then
/// taken sequentially in rank order, so a candidate is dropped only by one
/// that survived. The result is sorted by [`rank`].
#[must_use]
pub fn dedup_detections(detections: Vec<TagDetection>, config: &DedupConfig) -> Vec<TagDetection> {
    let mut detections = detections;
    detections.sort_by(rank);

    let overlaps: Vec<Vec<usize>> = (0..detections.len())
        .into_par_iter()
        .map(|i| {
            (0..i)
                .filter(|&j| conflicts(&detections[i], &detections[j], config))
                .collect()
        })
        .collect();

    let mut keep = vec![true; detections.len()];
    for (i, better) in overlaps.iter().enumerate() {
        keep[i] = better.iter().all(|&j| !keep[j]);
    }

    let before = detections.len();
    let kept: Vec<TagDetection> = detections
        .into_iter()
        .zip(keep)
        .filter_map(|(det, keep)| keep.then_some(det))
        .collect();
    tracing::debug!(before, after = kept.len(), "dedup");
    kept
}
