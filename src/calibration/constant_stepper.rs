// ConstantStepper - output moves at a fixed pace while breathing

use std::sync::Arc;

use super::stepper::StepperCore;
use super::strategy::{CalibrationStrategy, StrategyKind};
use super::CalibrationProgress;
use crate::config::CalibrationConfig;
use crate::storage::KeyValueStore;

/// Sensitivity at which one step equals `constant_step`
const REFERENCE_SENSITIVITY: f64 = 15.0;

/// Inertial stepper whose step ignores how hard the user breathes
pub struct ConstantStepper {
    core: StepperCore,
    constant_step: f64,
}

impl ConstantStepper {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CalibrationConfig) -> Self {
        Self {
            core: StepperCore::new(store, config.baseline_threshold, config.dead_zone),
            constant_step: config.constant_step,
        }
    }

    pub fn step_value(&self) -> f64 {
        self.core.step_value()
    }
}

impl CalibrationStrategy for ConstantStepper {
    fn name(&self) -> &'static str {
        StrategyKind::ConstantStepper.display_name()
    }

    fn description(&self) -> &'static str {
        StrategyKind::ConstantStepper.description()
    }

    fn calibrate(
        &mut self,
        reading: i64,
        min_reading: i64,
        max_reading: i64,
        sensitivity: u32,
    ) -> f64 {
        let step = self.constant_step * sensitivity as f64 / REFERENCE_SENSITIVITY;
        self.core
            .advance(reading, min_reading, max_reading, |_| (step, step))
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
