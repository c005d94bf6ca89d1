//! Candidate post-processing: filter, rescale, deduplicate.

use crate::config::PostprocessConfig;
use crate::dedup::dedup_detections;
use crate::detection::TagDetection;
use rayon::prelude::*;

/// Counters and timings for one [`postprocess`] call.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostprocessStats {
    /// Candidates passed in.
    pub num_input: usize,
    /// Candidates dropped because decoding was not `good`.
    pub num_rejected_bad: usize,
    /// Candidates dropped for exceeding `max_hamming`.
    pub num_rejected_hamming: usize,
    /// Candidates removed as duplicates.
    pub num_duplicates: usize,
    /// Detections returned.
    pub num_output: usize,
    /// Time spent deduplicating in milliseconds.
    pub dedup_ms: f64,
    /// Total time in milliseconds.
    pub total_ms: f64,
}

/// Turn raw candidates into the final detection list.
///
/// Rescaling happens before deduplication so every overlap test compares
/// footprints in the same pixel frame.
#[must_use]
pub fn postprocess(
    detections: Vec<TagDetection>,
    config: &PostprocessConfig,
) -> (Vec<TagDetection>, PostprocessStats) {
    let start_total = std::time::Instant::now();
    let mut stats = PostprocessStats {
        num_input: detections.len(),
        ..Default::default()
    };

    let mut kept = {
        let _span = tracing::info_span!("filter").entered();
        let mut kept = Vec::with_capacity(detections.len());
        for det in detections {
            if config.good_only && !det.good() {
                stats.num_rejected_bad += 1;
                tracing::debug!(
                    id = det.id(),
                    hamming = det.hamming_distance(),
                    "rejected: bad decode"
                );
                continue;
            }
            if config.max_hamming.is_some_and(|max| det.hamming_distance() > max) {
                stats.num_rejected_hamming += 1;
                tracing::debug!(
                    id = det.id(),
                    hamming = det.hamming_distance(),
                    "rejected: hamming"
                );
                continue;
            }
            kept.push(det);
        }
        kept
    };

    if (config.scale - 1.0).abs() > f64::EPSILON {
        let _span = tracing::info_span!("rescale", scale = config.scale).entered();
        kept.par_iter_mut().for_each(|det| det.scale_tag(config.scale));
        tracing::trace!(count = kept.len(), "rescaled");
    }

    if config.deduplicate {
        let start_dedup = std::time::Instant::now();
        let _span = tracing::info_span!("dedup").entered();
        let before = kept.len();
        kept = dedup_detections(kept, &config.dedup);
        stats.num_duplicates = before - kept.len();
        stats.dedup_ms = start_dedup.elapsed().as_secs_f64() * 1000.0;
    }

    stats.num_output = kept.len();
    stats.total_ms = start_total.elapsed().as_secs_f64() * 1000.0;
    (kept, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SyntheticTag;

    #[test]
    fn test_filters_and_counts() {
        let good = SyntheticTag::new(0, [100.0, 100.0], 50.0).build();
        let one_bit = SyntheticTag::new(1, [300.0, 100.0], 50.0).hamming(1).build();
        let bad = SyntheticTag::new(2, [500.0, 100.0], 50.0).hamming(2).build();

        let config = PostprocessConfig::builder().max_hamming(0).build();
        let (out, stats) = postprocess(vec![good.clone(), one_bit, bad], &config);

        assert_eq!(out, vec![good]);
        assert_eq!(stats.num_input, 3);
        assert_eq!(stats.num_rejected_bad, 1);
        assert_eq!(stats.num_rejected_hamming, 1);
        assert_eq!(stats.num_output, 1);
    }

    #[test]
    fn test_keeps_bad_when_asked() {
        let bad = SyntheticTag::new(2, [500.0, 100.0], 50.0).hamming(2).build();
        let config = PostprocessConfig::builder().good_only(false).build();
        let (out, _) = postprocess(vec![bad], &config);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_rescales_before_dedup() {
        let a = SyntheticTag::new(0, [50.0, 50.0], 40.0).build();
        let b = SyntheticTag::new(0, [52.0, 51.0], 40.0).hamming(1).build();

        let config = PostprocessConfig::builder().scale(2.0).build();
        let (out, stats) = postprocess(vec![a, b], &config);

        assert_eq!(stats.num_duplicates, 1);
        assert_eq!(out.len(), 1);
        assert!((out[0].center()[0] - 100.0).abs() < 1e-7);
        assert!((out[0].applied_scale() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dedup_can_be_disabled() {
        let a = SyntheticTag::new(0, [50.0, 50.0], 40.0).build();
        let config = PostprocessConfig::builder().deduplicate(false).build();
        let (out, stats) = postprocess(vec![a.clone(), a], &config);
        assert_eq!(out.len(), 2);
        assert_eq!(stats.num_duplicates, 0);
    }
}
