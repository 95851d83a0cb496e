// Shared state machine of the inertial stepper strategies
//
// Both stepper variants keep their output between samples, hold it inside a
// dead zone around the baseline, and only differ in how far one sample moves
// it. That difference is passed in as a closure over the absolute deviation.

use std::sync::Arc;

use super::baseline::{BaselineEstimator, BaselineState};
use super::normalizer::normalize;
use super::strategy::{MAX_OUTPUT, MIN_OUTPUT};
use super::CalibrationProgress;
use crate::storage::KeyValueStore;

/// Output value, last reading, and embedded baseline detector
pub(crate) struct StepperCore {
    estimator: BaselineEstimator,
    /// Starts at the floor and always stays within [1, 100]
    step_value: f64,
    previous_reading: Option<f64>,
    dead_zone: f64,
}

impl StepperCore {
    pub(crate) fn new(store: Arc<dyn KeyValueStore>, threshold: u32, dead_zone: f64) -> Self {
        Self {
            estimator: BaselineEstimator::new(store, threshold),
            step_value: MIN_OUTPUT,
            previous_reading: None,
            dead_zone,
        }
    }

    /// Run one sample through normalization, baseline detection and stepping
    ///
    /// `increments` maps the absolute deviation from baseline to the
    /// `(rise, fall)` applied above and below the dead zone.
    pub(crate) fn advance<F>(&mut self, reading: i64, min: i64, max: i64, increments: F) -> f64
    where
        F: FnOnce(f64) -> (f64, f64),
    {
        let current = normalize(reading, min, max).round();
        let baseline = self.estimator.observe(current, self.previous_reading);

        // Deviation is undefined until a resting reading is known
        if let BaselineState::Committed(baseline) = baseline {
            let (rise, fall) = increments((current - baseline).abs());
            if current > baseline + self.dead_zone && self.step_value < MAX_OUTPUT {
                self.step_value += rise;
            } else if current < baseline - self.dead_zone && self.step_value > 0.0 {
                self.step_value -= fall;
            }
        }

        self.step_value = self.step_value.clamp(MIN_OUTPUT, MAX_OUTPUT);
        self.previous_reading = Some(current);
        self.step_value
    }

    pub(crate) fn reset(&mut self) {
        self.estimator.reset();
        self.step_value = MIN_OUTPUT;
        self.previous_reading = None;
    }

    pub(crate) fn progress(&self) -> CalibrationProgress {
        self.estimator.progress()
    }

    pub(crate) fn baseline(&self) -> Option<f64> {
        self.estimator.state().value()
    }

    pub(crate) fn step_value(&self) -> f64 {
        self.step_value
    }

    pub(crate) fn previous_reading(&self) -> Option<f64> {
        self.previous_reading
    }
}
