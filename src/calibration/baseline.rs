// BaselineEstimator - resting-state detection
//
// The estimator is a two-state machine:
// 1. Unset: counting consecutive identical readings
// 2. Committed: the resting reading is known and persisted
//
// A persisted baseline is authoritative. It is re-read from the store on
// every observation so that a value committed by any strategy instance
// sharing the store is picked up immediately.

use std::sync::Arc;

use crate::calibration::CalibrationProgress;
use crate::error::{log_storage_error, StorageError};
use crate::storage::{load_json, store_json, KeyValueStore, BASELINE_KEY};

/// Default number of identical readings that must be exceeded to commit
pub const DEFAULT_BASELINE_THRESHOLD: u32 = 50;

/// Baseline detection state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaselineState {
    /// No resting reading accepted yet
    Unset,
    /// Resting reading on the normalized 0-100 scale
    Committed(f64),
}

impl BaselineState {
    pub fn value(&self) -> Option<f64> {
        match self {
            BaselineState::Unset => None,
            BaselineState::Committed(value) => Some(*value),
        }
    }
}

/// Detects and persists the resting reading from a run of stable readings
pub struct BaselineEstimator {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    state: BaselineState,
    /// Length of the current run of identical readings
    stable_readings: u32,
    /// Longest run seen since the last reset
    peak_stable_readings: u32,
    threshold: u32,
    corrupt_warned: bool,
}

impl BaselineEstimator {
    /// Create an estimator persisting under [`BASELINE_KEY`]
    pub fn new(store: Arc<dyn KeyValueStore>, threshold: u32) -> Self {
        Self::with_key(store, BASELINE_KEY, threshold)
    }

    /// Create an estimator persisting under `key`
    ///
    /// A baseline already stored under `key` is loaded immediately, so a
    /// fresh estimator reports it before seeing any reading.
    pub fn with_key(store: Arc<dyn KeyValueStore>, key: &'static str, threshold: u32) -> Self {
        let mut estimator = Self {
            store,
            key,
            state: BaselineState::Unset,
            stable_readings: 0,
            peak_stable_readings: 0,
            threshold,
            corrupt_warned: false,
        };
        if let Some(stored) = estimator.persisted() {
            estimator.state = BaselineState::Committed(stored);
        }
        estimator
    }

    /// Feed one rounded normalized reading and return the baseline in effect
    ///
    /// # Arguments
    /// * `reading` - Current rounded reading on the 0-100 scale
    /// * `previous` - Reading seen on the previous call, if any
    pub fn observe(&mut self, reading: f64, previous: Option<f64>) -> BaselineState {
        if let Some(persisted) = self.persisted() {
            self.state = BaselineState::Committed(persisted);
            return self.state;
        }

        // An in-memory commit whose write failed still latches
        if let BaselineState::Committed(_) = self.state {
            return self.state;
        }

        if previous == Some(reading) {
            self.stable_readings = self.stable_readings.saturating_add(1);
        } else {
            self.stable_readings = 1;
        }
        self.peak_stable_readings = self.peak_stable_readings.max(self.stable_readings);

        if self.stable_readings > self.threshold && self.state.value() != Some(reading) {
            self.commit(reading);
        }

        self.state
    }

    /// Forget the baseline, both persisted and in memory, and restart counting
    pub fn reset(&mut self) {
        if let Err(err) = self.store.remove(self.key) {
            log_storage_error(&err, "baseline_reset");
        }
        self.state = BaselineState::Unset;
        self.stable_readings = 0;
        self.peak_stable_readings = 0;
        self.corrupt_warned = false;
    }

    pub fn state(&self) -> BaselineState {
        self.state
    }

    pub fn stable_readings(&self) -> u32 {
        self.stable_readings
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress::new(
            self.peak_stable_readings,
            self.threshold,
            matches!(self.state, BaselineState::Committed(_)),
        )
    }

    fn commit(&mut self, reading: f64) {
        if let Err(err) = store_json(self.store.as_ref(), self.key, &reading) {
            log_storage_error(&err, "baseline_commit");
        }
        self.state = BaselineState::Committed(reading);
        tracing::info!(
            "[BaselineEstimator] Baseline committed at {:.0} after {} stable readings",
            reading,
            self.stable_readings
        );
    }

    /// Persisted baseline, treating unreadable content as absent
    fn persisted(&mut self) -> Option<f64> {
        match load_json::<f64>(self.store.as_ref(), self.key) {
            Ok(Some(value)) if value.is_finite() => Some(value),
            Ok(Some(value)) => {
                self.warn_corrupt(&StorageError::Serialization {
                    reason: format!("non-finite baseline {}", value),
                });
                None
            }
            Ok(None) => None,
            Err(err) => {
                self.warn_corrupt(&err);
                None
            }
        }
    }

    fn warn_corrupt(&mut self, err: &StorageError) {
        if !self.corrupt_warned {
            tracing::warn!(
                "[BaselineEstimator] Ignoring persisted baseline under {}: {}",
                self.key,
                err
            );
            self.corrupt_warned = true;
        }
    }
}
