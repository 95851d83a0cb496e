// DynamicStepper - output moves in proportion to breath force
//
// Each sample moves the output by |reading - baseline| * sensitivity%.
// Exhaling adds a fixed bonus on top, because an exhale needs more
// perceived force than an inhale to register the same change.

use std::sync::Arc;

use super::stepper::StepperCore;
use super::strategy::{CalibrationStrategy, StrategyKind};
use super::CalibrationProgress;
use crate::config::CalibrationConfig;
use crate::storage::KeyValueStore;

/// Inertial stepper scaled by deviation from the resting reading
pub struct DynamicStepper {
    core: StepperCore,
    exhale_bonus: f64,
}

impl DynamicStepper {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CalibrationConfig) -> Self {
        Self {
            core: StepperCore::new(store, config.baseline_threshold, config.dead_zone),
            exhale_bonus: config.exhale_bonus,
        }
    }

    /// Current output before the next sample
    pub fn step_value(&self) -> f64 {
        self.core.step_value()
    }

    /// Rounded reading seen on the last call
    pub fn previous_reading(&self) -> Option<f64> {
        self.core.previous_reading()
    }
}

impl CalibrationStrategy for DynamicStepper {
    fn name(&self) -> &'static str {
        StrategyKind::DynamicStepper.display_name()
    }

    fn description(&self) -> &'static str {
        StrategyKind::DynamicStepper.description()
    }

    fn calibrate(
        &mut self,
        reading: i64,
        min_reading: i64,
        max_reading: i64,
        sensitivity: u32,
    ) -> f64 {
        let gain = sensitivity as f64 * 0.01;
        let bonus = self.exhale_bonus;
        self.core
            .advance(reading, min_reading, max_reading, |deviation| {
                let increment = deviation * gain;
                (increment + bonus, increment)
            })
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn progress(&self) -> CalibrationProgress {
        self.core.progress()
    }

    fn baseline(&self) -> Option<f64> {
        self.core.baseline()
    }
}
