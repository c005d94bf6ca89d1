#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::exact_decode;
use quadtag_core::test_utils::{SyntheticTag, jittered_cluster, random_scene};
use quadtag_core::{
    DedupConfig, PostprocessConfig, QuadGeometry, TagDetection, dedup_detections, postprocess,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

fn scene_candidates(seed: u64, num_tags: usize) -> (Vec<SyntheticTag>, Vec<TagDetection>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let tags = random_scene(&mut rng, num_tags, 1920.0, 1080.0, (30.0, 120.0));
    let mut candidates: Vec<TagDetection> = tags
        .iter()
        .flat_map(|tag| jittered_cluster(&mut rng, tag, 4, 0.04 * tag.size))
        .collect();
    candidates.shuffle(&mut rng);
    (tags, candidates)
}

fn assert_one_per_tag(tags: &[SyntheticTag], detections: &[TagDetection]) {
    assert_eq!(detections.len(), tags.len());
    for tag in tags {
        let matches = detections
            .iter()
            .filter(|d| {
                let dx = d.center()[0] - tag.center[0];
                let dy = d.center()[1] - tag.center[1];
                dx.hypot(dy) < 0.1 * tag.size
            })
            .count();
        assert_eq!(matches, 1, "tag at {:?}", tag.center);
    }
}

#[test]
fn test_scene_collapses_to_one_detection_per_tag() {
    let (tags, candidates) = scene_candidates(42, 25);
    assert!(tags.len() >= 10, "scene too sparse: {}", tags.len());
    assert_eq!(candidates.len(), tags.len() * 4);

    let config = PostprocessConfig::builder().good_only(false).build();
    let (out, stats) = postprocess(candidates, &config);

    assert_one_per_tag(&tags, &out);
    assert_eq!(stats.num_input, tags.len() * 4);
    assert_eq!(stats.num_duplicates, tags.len() * 3);
    assert_eq!(stats.num_output, tags.len());
}

#[test]
fn test_scene_survivors_are_best_ranked() {
    let (_, candidates) = scene_candidates(7, 15);
    let out = dedup_detections(candidates.clone(), &DedupConfig::default());

    for survivor in &out {
        let better = candidates.iter().any(|c| {
            c.id() == survivor.id()
                && c.overlaps_too_much(survivor)
                && (c.hamming_distance() < survivor.hamming_distance()
                    || (c.hamming_distance() == survivor.hamming_distance()
                        && c.observed_perimeter() > survivor.observed_perimeter()))
        });
        assert!(!better, "a better candidate for ID {} was dropped", survivor.id());
    }
}

#[test]
fn test_dedup_is_order_independent() {
    let (_, mut candidates) = scene_candidates(11, 12);
    let forward = dedup_detections(candidates.clone(), &DedupConfig::default());
    candidates.reverse();
    let backward = dedup_detections(candidates, &DedupConfig::default());
    assert_eq!(forward, backward);
}

#[test]
fn test_decimated_scene_is_restored_before_dedup() {
    let mut rng = StdRng::seed_from_u64(3);
    let tags = random_scene(&mut rng, 10, 960.0, 540.0, (20.0, 60.0));
    let candidates: Vec<TagDetection> = tags
        .iter()
        .flat_map(|tag| jittered_cluster(&mut rng, tag, 3, 0.03 * tag.size))
        .collect();

    let config = PostprocessConfig::builder()
        .scale(2.0)
        .good_only(false)
        .build();
    let (out, _) = postprocess(candidates, &config);

    let full_res: Vec<SyntheticTag> = tags
        .iter()
        .map(|t| {
            SyntheticTag::new(t.id, [t.center[0] * 2.0, t.center[1] * 2.0], t.size * 2.0)
        })
        .collect();
    assert_one_per_tag(&full_res, &out);
    assert!(out.iter().all(|d| (d.applied_scale() - 2.0).abs() < f64::EPSILON));
}

#[test]
fn test_nested_tags_survive_id_check() {
    let outer = QuadGeometry::fit(
        [[0.0, 0.0], [300.0, 0.0], [300.0, 300.0], [0.0, 300.0]],
        1200.0,
        [150.0, 150.0],
    )
    .unwrap();
    let inner = QuadGeometry::fit(
        [[100.0, 100.0], [180.0, 100.0], [180.0, 180.0], [100.0, 180.0]],
        320.0,
        [150.0, 150.0],
    )
    .unwrap();
    let outer = TagDetection::builder(exact_decode(1)).geometry(outer).build().unwrap();
    let inner = TagDetection::builder(exact_decode(2)).geometry(inner).build().unwrap();

    let config = PostprocessConfig::default();
    let (out, _) = postprocess(vec![outer.clone(), inner.clone()], &config);
    assert_eq!(out.len(), 2);

    let config = PostprocessConfig::builder().require_matching_id(false).build();
    let (out, stats) = postprocess(vec![outer.clone(), inner], &config);
    assert_eq!(out, vec![outer]);
    assert_eq!(stats.num_duplicates, 1);
}
