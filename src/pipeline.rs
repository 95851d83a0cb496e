//! CalibrationPipeline: per-sample orchestration of the calibration core.
//!
//! The pipeline owns the running session extrema and the active strategy.
//! Every raw sample widens the extrema, runs through the strategy, and is
//! published as one [`CalibrationUpdate`] carrying both the output and the
//! baseline progress, so subscribers never see the two out of step.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::calibration::{
    normalize, round_to_hundredths, CalibrationPhase, CalibrationStrategy, Extrema, StrategyKind,
    MIN_OUTPUT,
};
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;
use crate::managers::BroadcastChannelManager;
use crate::storage::KeyValueStore;

/// Highest accepted sensitivity, in percent
pub const MAX_SENSITIVITY: u32 = 100;

/// Result of processing one raw sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationUpdate {
    /// Position of the sample since the pipeline was created
    pub sequence: u64,
    pub raw: i32,
    /// Reading on the 0-100 scale against the updated extrema, two decimals
    pub normalized: f64,
    /// Strategy output in [1, 100], two decimals
    pub output: f64,
    /// Baseline detection progress, 0-100
    pub progress: u8,
    pub phase: CalibrationPhase,
    pub baseline: Option<f64>,
}

/// Point-in-time view of the pipeline for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub strategy: String,
    pub sensitivity: u32,
    pub samples_processed: u64,
    pub min_reading: Option<i64>,
    pub max_reading: Option<i64>,
    pub last_output: f64,
    pub progress: u8,
    pub baseline: Option<f64>,
}

/// Orchestrates normalization, baseline detection and the active strategy
pub struct CalibrationPipeline {
    config: CalibrationConfig,
    store: Arc<dyn KeyValueStore>,
    extrema: Extrema,
    strategy: Box<dyn CalibrationStrategy>,
    sensitivity: u32,
    sequence: u64,
    last_output: f64,
    broadcasts: BroadcastChannelManager,
}

impl CalibrationPipeline {
    /// Create a pipeline with its own subscriber lists
    pub fn new(config: CalibrationConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_broadcasts(config, store, BroadcastChannelManager::new())
    }

    /// Create a pipeline publishing through `broadcasts`
    ///
    /// The initial strategy and sensitivity come from `config`; an out of
    /// range configured sensitivity is clamped with a warning.
    pub fn with_broadcasts(
        config: CalibrationConfig,
        store: Arc<dyn KeyValueStore>,
        broadcasts: BroadcastChannelManager,
    ) -> Self {
        let sensitivity = if config.sensitivity > MAX_SENSITIVITY {
            tracing::warn!(
                "[CalibrationPipeline] Configured sensitivity {} clamped to {}",
                config.sensitivity,
                MAX_SENSITIVITY
            );
            MAX_SENSITIVITY
        } else {
            config.sensitivity
        };
        let strategy = config.strategy.create(Arc::clone(&store), &config);

        Self {
            config,
            store,
            extrema: Extrema::new(),
            strategy,
            sensitivity,
            sequence: 0,
            last_output: MIN_OUTPUT,
            broadcasts,
        }
    }

    /// Run one raw sample through the pipeline and publish the result
    ///
    /// Every subscriber receives the update; with none it is only returned.
    pub fn process_sample(&mut self, raw: i32) -> CalibrationUpdate {
        let (min, max) = self.extrema.observe(raw as i64);
        let output = self
            .strategy
            .calibrate(raw as i64, min, max, self.sensitivity);
        let progress = self.strategy.progress();

        self.sequence += 1;
        self.last_output = round_to_hundredths(output);

        let update = CalibrationUpdate {
            sequence: self.sequence,
            raw,
            normalized: round_to_hundredths(normalize(raw as i64, min, max)),
            output: self.last_output,
            progress: progress.percentage(),
            phase: progress.phase(),
            baseline: self.strategy.baseline(),
        };
        self.broadcasts.publish_update(&update);
        update
    }

    /// Change the gain applied from the next sample on
    pub fn set_sensitivity(&mut self, sensitivity: u32) -> Result<(), CalibrationError> {
        if sensitivity > MAX_SENSITIVITY {
            return Err(CalibrationError::InvalidSensitivity { sensitivity });
        }
        self.sensitivity = sensitivity;
        tracing::info!("[CalibrationPipeline] Sensitivity set to {}", sensitivity);
        Ok(())
    }

    /// Swap to a fresh instance of a built-in strategy
    ///
    /// The previous strategy's state is discarded. Extrema are kept, and a
    /// persisted baseline is loaded by the new instance right away.
    pub fn set_strategy(&mut self, kind: StrategyKind) {
        let strategy = kind.create(Arc::clone(&self.store), &self.config);
        self.install(strategy);
    }

    /// Swap to a caller-provided strategy implementation
    pub fn set_custom_strategy(&mut self, strategy: Box<dyn CalibrationStrategy>) {
        self.install(strategy);
    }

    fn install(&mut self, strategy: Box<dyn CalibrationStrategy>) {
        tracing::info!(
            "[CalibrationPipeline] Strategy changed: {} -> {}",
            self.strategy.name(),
            strategy.name()
        );
        self.strategy = strategy;
        self.last_output = MIN_OUTPUT;
    }

    /// Restart calibration from scratch
    ///
    /// Clears the extrema and the strategy state, including the persisted
    /// baseline.
    pub fn complete_reset(&mut self) {
        self.extrema.reset();
        self.strategy.reset();
        self.last_output = MIN_OUTPUT;
        tracing::info!("[CalibrationPipeline] Calibration reset");
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        let bounds = self.extrema.bounds();
        PipelineSnapshot {
            strategy: self.strategy.name().to_string(),
            sensitivity: self.sensitivity,
            samples_processed: self.sequence,
            min_reading: bounds.map(|(min, _)| min),
            max_reading: bounds.map(|(_, max)| max),
            last_output: self.last_output,
            progress: self.strategy.progress().percentage(),
            baseline: self.strategy.baseline(),
        }
    }

    /// Receive every update published from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CalibrationUpdate> {
        self.broadcasts.subscribe_updates()
    }

    pub fn sensitivity(&self) -> u32 {
        self.sensitivity
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn baseline(&self) -> Option<f64> {
        self.strategy.baseline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationProgress, Linear};
    use crate::storage::{load_json, MemoryStore, BASELINE_KEY};

    fn pipeline(store: Arc<MemoryStore>) -> CalibrationPipeline {
        CalibrationPipeline::new(CalibrationConfig::default(), store)
    }

    /// Widen the extrema to (0, 1000) and hold at 500 until the baseline commits
    fn calibrate_to_fifty(pipeline: &mut CalibrationPipeline) {
        pipeline.process_sample(0);
        pipeline.process_sample(1000);
        for _ in 0..51 {
            pipeline.process_sample(500);
        }
    }

    #[test]
    fn test_documented_scenario() {
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(Arc::clone(&store));

        calibrate_to_fifty(&mut pipeline);
        assert_eq!(pipeline.baseline(), Some(50.0));
        assert_eq!(
            load_json::<f64>(store.as_ref(), BASELINE_KEY).unwrap(),
            Some(50.0)
        );

        let up = pipeline.process_sample(800);
        assert_eq!(up.normalized, 80.0);
        assert_eq!(up.output, 6.0);
        assert_eq!(up.progress, 100);
        assert_eq!(up.phase, CalibrationPhase::Calibrated);

        assert_eq!(pipeline.process_sample(200).output, 1.5);
        assert_eq!(pipeline.process_sample(200).output, 1.0);
    }

    #[test]
    fn test_first_sample_normalizes_to_zero() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        let update = pipeline.process_sample(123_456);
        assert_eq!(update.normalized, 0.0);
        assert_eq!(update.output, 1.0);
        assert_eq!(update.sequence, 1);
    }

    #[test]
    fn test_progress_counts_stable_run() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        pipeline.process_sample(0);
        pipeline.process_sample(1000);
        let mut last = None;
        for _ in 0..25 {
            last = Some(pipeline.process_sample(500));
        }
        let last = last.unwrap();
        assert_eq!(last.progress, 50);
        assert_eq!(last.phase, CalibrationPhase::SeekingBaseline);

        // A broken run does not lower the reported progress
        let broken = pipeline.process_sample(900);
        assert_eq!(broken.progress, 50);
    }

    #[test]
    fn test_updates_published_in_order() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        let mut rx = pipeline.subscribe();

        for raw in [10, 20, 30] {
            pipeline.process_sample(raw);
        }

        let received: Vec<i32> = (0..3).map(|_| rx.try_recv().unwrap().raw).collect();
        assert_eq!(received, vec![10, 20, 30]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_set_sensitivity_bounds() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        assert!(pipeline.set_sensitivity(0).is_ok());
        assert!(pipeline.set_sensitivity(100).is_ok());
        assert_eq!(
            pipeline.set_sensitivity(101),
            Err(CalibrationError::InvalidSensitivity { sensitivity: 101 })
        );
        assert_eq!(pipeline.sensitivity(), 100);
    }

    #[test]
    fn test_sensitivity_change_applies_to_next_sample() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        calibrate_to_fifty(&mut pipeline);

        pipeline.set_sensitivity(30).unwrap();
        // 30 * 30 * 0.01 + 0.5 on top of the floor
        assert_eq!(pipeline.process_sample(800).output, 10.5);
    }

    #[test]
    fn test_strategy_swap_keeps_persisted_baseline() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        calibrate_to_fifty(&mut pipeline);
        pipeline.process_sample(800);

        pipeline.set_strategy(StrategyKind::ConstantStepper);
        assert_eq!(pipeline.strategy_name(), "Constant stepper");

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.last_output, 1.0);
        assert_eq!(snapshot.baseline, Some(50.0));
        assert_eq!(snapshot.progress, 100);

        let update = pipeline.process_sample(800);
        assert_eq!(update.baseline, Some(50.0));
        assert_eq!(update.output, 2.5);
    }

    #[test]
    fn test_swap_mid_calibration_restarts_count() {
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(Arc::clone(&store));
        pipeline.process_sample(0);
        pipeline.process_sample(1000);
        for _ in 0..30 {
            pipeline.process_sample(500);
        }
        assert_eq!(pipeline.snapshot().progress, 60);

        pipeline.set_strategy(StrategyKind::ConstantStepper);
        assert_eq!(pipeline.snapshot().baseline, None);
        assert_eq!(pipeline.snapshot().progress, 0);

        for _ in 0..50 {
            let update = pipeline.process_sample(500);
            assert_eq!(update.baseline, None);
        }
        assert_eq!(store.get(BASELINE_KEY).unwrap(), None);

        let update = pipeline.process_sample(500);
        assert_eq!(update.baseline, Some(50.0));
        assert_eq!(update.phase, CalibrationPhase::Calibrated);
        assert_eq!(
            load_json::<f64>(store.as_ref(), BASELINE_KEY).unwrap(),
            Some(50.0)
        );
    }

    #[test]
    fn test_unread_subscriber_receives_every_update() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        let mut rx = pipeline.subscribe();

        for raw in 0..20_000 {
            pipeline.process_sample(raw % 1000);
        }

        let mut expected = 1;
        while let Ok(update) = rx.try_recv() {
            assert_eq!(update.sequence, expected);
            expected += 1;
        }
        assert_eq!(expected, 20_001);
    }

    #[test]
    fn test_linear_strategy_passthrough() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        pipeline.set_strategy(StrategyKind::Linear);

        pipeline.process_sample(0);
        pipeline.process_sample(1000);
        let update = pipeline.process_sample(437);
        assert_eq!(update.output, 44.0);
        assert_eq!(update.progress, 100);
        assert_eq!(update.baseline, None);
    }

    #[test]
    fn test_custom_strategy() {
        struct Fixed;

        impl CalibrationStrategy for Fixed {
            fn name(&self) -> &'static str {
                "Fixed"
            }
            fn description(&self) -> &'static str {
                "Always 42"
            }
            fn calibrate(&mut self, _: i64, _: i64, _: i64, _: u32) -> f64 {
                42.0
            }
            fn reset(&mut self) {}
            fn progress(&self) -> CalibrationProgress {
                CalibrationProgress::new(1, 4, false)
            }
        }

        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        pipeline.set_custom_strategy(Box::new(Fixed));
        let update = pipeline.process_sample(5);
        assert_eq!(update.output, 42.0);
        assert_eq!(update.progress, 25);
        assert_eq!(pipeline.strategy_name(), "Fixed");

        pipeline.set_custom_strategy(Box::new(Linear::new()));
        assert_eq!(pipeline.strategy_name(), "Linear");
    }

    #[test]
    fn test_complete_reset_clears_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(Arc::clone(&store));
        calibrate_to_fifty(&mut pipeline);
        pipeline.process_sample(800);

        pipeline.complete_reset();

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.min_reading, None);
        assert_eq!(snapshot.max_reading, None);
        assert_eq!(snapshot.baseline, None);
        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.last_output, 1.0);
        assert_eq!(store.get(BASELINE_KEY).unwrap(), None);

        // Degenerate extrema right after reset
        let update = pipeline.process_sample(700);
        assert_eq!(update.normalized, 0.0);
        assert_eq!(update.baseline, None);
    }

    #[test]
    fn test_snapshot_tracks_extrema() {
        let mut pipeline = pipeline(Arc::new(MemoryStore::new()));
        for raw in [500, 800, 200, 600] {
            pipeline.process_sample(raw);
        }
        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.min_reading, Some(200));
        assert_eq!(snapshot.max_reading, Some(800));
        assert_eq!(snapshot.samples_processed, 4);
        assert_eq!(snapshot.sensitivity, 15);
        assert_eq!(snapshot.strategy, "Dynamic stepper");
    }

    #[test]
    fn test_oversized_configured_sensitivity_is_clamped() {
        let config = CalibrationConfig {
            sensitivity: 250,
            ..CalibrationConfig::default()
        };
        let pipeline = CalibrationPipeline::new(config, Arc::new(MemoryStore::new()));
        assert_eq!(pipeline.sensitivity(), 100);
    }
}
