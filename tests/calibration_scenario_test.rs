// Integration tests for the calibration pipeline
//
// These tests drive the public pipeline API end to end with an in-memory
// store and check the behavioral laws of the stepper strategies:
// 1. Output stays within [1, 100] for arbitrary input
// 2. Readings inside the dead zone leave the output unchanged
// 3. Sustained exhale saturates at 100
// 4. A committed baseline latches until reset

use std::sync::Arc;

use breath_trainer::calibration::{normalize, round_to_hundredths, StrategyKind};
use breath_trainer::config::CalibrationConfig;
use breath_trainer::pipeline::CalibrationPipeline;
use breath_trainer::storage::{KeyValueStore, MemoryStore, BASELINE_KEY};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn pipeline_with(store: Arc<MemoryStore>, strategy: StrategyKind) -> CalibrationPipeline {
    let config = CalibrationConfig {
        strategy,
        ..CalibrationConfig::default()
    };
    CalibrationPipeline::new(config, store)
}

/// Extrema (0, 1000), then 51 samples at 500 so the baseline commits at 50
fn commit_baseline_at_fifty(pipeline: &mut CalibrationPipeline) {
    pipeline.process_sample(0);
    pipeline.process_sample(1000);
    for _ in 0..51 {
        pipeline.process_sample(500);
    }
    assert_eq!(pipeline.baseline(), Some(50.0));
}

#[test]
fn test_hardware_range_normalization() {
    let min = 26_804_568;
    let max = 2_107_080_156;
    assert_eq!(round_to_hundredths(normalize(min, min, max)), 0.0);
    assert_eq!(round_to_hundredths(normalize(max, min, max)), 100.0);
}

#[test]
fn test_baseline_commits_on_fifty_first_identical_sample() {
    let mut pipeline = pipeline_with(Arc::new(MemoryStore::new()), StrategyKind::DynamicStepper);
    pipeline.process_sample(0);
    pipeline.process_sample(1000);

    for _ in 0..50 {
        pipeline.process_sample(500);
    }
    assert_eq!(pipeline.baseline(), None);

    let update = pipeline.process_sample(500);
    assert_eq!(update.baseline, Some(50.0));
    assert_eq!(update.progress, 100);
}

#[test]
fn test_output_always_within_bounds() {
    for strategy in StrategyKind::ALL {
        let mut rng = StdRng::seed_from_u64(99);
        let mut pipeline = pipeline_with(Arc::new(MemoryStore::new()), strategy);
        pipeline.set_sensitivity(100).unwrap();

        // Let the steppers find a baseline so their outputs actually move
        for _ in 0..60 {
            pipeline.process_sample(0);
        }
        for _ in 0..2_000 {
            let raw = rng.gen_range(-1_000_000..1_000_000);
            let output = pipeline.process_sample(raw).output;
            assert!(
                (1.0..=100.0).contains(&output),
                "{} produced {}",
                strategy,
                output
            );
        }
    }
}

#[test]
fn test_dead_zone_holds_output() {
    let mut pipeline = pipeline_with(Arc::new(MemoryStore::new()), StrategyKind::DynamicStepper);
    commit_baseline_at_fifty(&mut pipeline);

    let before = pipeline.process_sample(800).output;
    for raw in [490, 500, 510, 505, 495] {
        assert_eq!(pipeline.process_sample(raw).output, before);
    }
}

#[test]
fn test_sustained_exhale_saturates() {
    let mut pipeline = pipeline_with(Arc::new(MemoryStore::new()), StrategyKind::DynamicStepper);
    commit_baseline_at_fifty(&mut pipeline);

    let mut last = 1.0;
    for _ in 0..200 {
        let output = pipeline.process_sample(700).output;
        assert!(output >= last);
        last = output;
    }
    assert_eq!(last, 100.0);
    assert_eq!(pipeline.process_sample(900).output, 100.0);
}

#[test]
fn test_baseline_latches_until_reset() {
    let store = Arc::new(MemoryStore::new());
    let mut pipeline = pipeline_with(Arc::clone(&store), StrategyKind::DynamicStepper);
    commit_baseline_at_fifty(&mut pipeline);

    // A new, longer stable run elsewhere must not move the baseline
    for _ in 0..120 {
        pipeline.process_sample(700);
    }
    assert_eq!(pipeline.baseline(), Some(50.0));

    pipeline.complete_reset();
    assert_eq!(store.get(BASELINE_KEY).unwrap(), None);

    pipeline.process_sample(0);
    pipeline.process_sample(1000);
    for _ in 0..51 {
        pipeline.process_sample(700);
    }
    assert_eq!(pipeline.baseline(), Some(70.0));
}

#[test]
fn test_zero_resting_reading_commits() {
    let mut pipeline = pipeline_with(Arc::new(MemoryStore::new()), StrategyKind::DynamicStepper);
    // A single repeated value keeps the extrema degenerate, so every reading is 0
    for _ in 0..51 {
        pipeline.process_sample(123);
    }
    assert_eq!(pipeline.baseline(), Some(0.0));
}

#[test]
fn test_corrupted_persisted_baseline_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    store.set(BASELINE_KEY, "not a number").unwrap();

    let mut pipeline = pipeline_with(Arc::clone(&store), StrategyKind::DynamicStepper);
    let update = pipeline.process_sample(400);
    assert_eq!(update.baseline, None);
    assert_eq!(update.output, 1.0);

    // Fresh counting replaces the corrupted value
    commit_baseline_at_fifty(&mut pipeline);
    assert_eq!(store.get(BASELINE_KEY).unwrap().as_deref(), Some("50.0"));
}

#[test]
fn test_persisted_baseline_shared_across_pipelines() {
    let store = Arc::new(MemoryStore::new());
    let mut first = pipeline_with(Arc::clone(&store), StrategyKind::DynamicStepper);
    commit_baseline_at_fifty(&mut first);

    let mut second = pipeline_with(store, StrategyKind::DynamicStepper);
    assert_eq!(second.baseline(), Some(50.0));
    assert_eq!(second.snapshot().progress, 100);
    second.process_sample(0);
    let update = second.process_sample(1000);
    assert_eq!(update.baseline, Some(50.0));
    assert_eq!(update.output, 9.0);
}
