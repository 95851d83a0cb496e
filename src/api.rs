// Public API for host applications
// This module exposes the process-wide calibration engine as free functions
// and async streams, so UI layers never hold an EngineHandle themselves.

use std::sync::Arc;

use futures::Stream;
use once_cell::sync::Lazy;

use crate::calibration::{StrategyInfo, StrategyKind};
use crate::config::AppConfig;
use crate::engine::{EngineHandle, TelemetryEvent};
use crate::error::{log_storage_error, CalibrationError};
use crate::pipeline::{CalibrationUpdate, PipelineSnapshot};
use crate::storage::{self, JsonFileStore, KeyValueStore, MemoryStore};

// Re-export error code constants for host exposure
pub use crate::error::{CalibrationErrorCodes, StorageErrorCodes};

/// Process-wide configuration, loaded once from `assets/breath_config.json`
static APP_CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::load);

/// Process-wide persistence port
///
/// Falls back to an in-memory store when the configured file cannot be
/// opened, so calibration still works for the current session.
static STORE: Lazy<Arc<dyn KeyValueStore>> = Lazy::new(|| {
    match JsonFileStore::open(&APP_CONFIG.storage.path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            log_storage_error(&err, "open_store");
            Arc::new(MemoryStore::new())
        }
    }
});

/// Global EngineHandle instance
///
/// The worker thread starts on first use.
static ENGINE_HANDLE: Lazy<EngineHandle> =
    Lazy::new(|| EngineHandle::new(APP_CONFIG.clone(), Arc::clone(&STORE)));

/// Get the version of the calibration core
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// ============================================================================
// SAMPLE INGESTION
// ============================================================================

/// Feed one sensor notification buffer
///
/// # Returns
/// * `Ok(true)` - A sample was decoded and queued
/// * `Ok(false)` - The buffer was too short and was dropped
/// * `Err(CalibrationError::EngineStopped)` - The worker has shut down
pub fn push_notification(payload: Vec<u8>) -> Result<bool, CalibrationError> {
    ENGINE_HANDLE.push_notification(&payload)
}

/// Feed one already decoded raw sample
pub fn push_sample(raw: i32) -> Result<(), CalibrationError> {
    ENGINE_HANDLE.push_sample(raw)
}

// ============================================================================
// RUNTIME CONFIGURATION
// ============================================================================

/// Set the calibration gain in percent (0-100)
pub fn set_sensitivity(sensitivity: u32) -> Result<(), CalibrationError> {
    ENGINE_HANDLE.set_sensitivity(sensitivity)
}

/// Select the active strategy by identifier (`dynamic_stepper`,
/// `constant_stepper`, `linear`)
pub fn set_strategy(name: String) -> Result<StrategyKind, CalibrationError> {
    ENGINE_HANDLE.set_strategy_by_name(&name)
}

/// Names and descriptions of every built-in strategy
pub fn available_strategies() -> Vec<StrategyInfo> {
    StrategyKind::catalog()
}

/// Restart calibration, forgetting the persisted baseline
pub fn complete_reset() -> Result<(), CalibrationError> {
    ENGINE_HANDLE.complete_reset()
}

/// Current pipeline state, after all queued samples have been processed
pub fn calibration_snapshot() -> Result<PipelineSnapshot, CalibrationError> {
    ENGINE_HANDLE.snapshot()
}

/// Reading as a percentage of the fixed hardware range
pub fn hardware_percentage(raw: i32) -> f64 {
    crate::device::hardware_percentage(raw as i64, &APP_CONFIG.device)
}

// ============================================================================
// TUTORIAL FLAG
// ============================================================================

pub fn tutorial_completed() -> bool {
    storage::tutorial_completed(STORE.as_ref())
}

/// Persist the tutorial flag
///
/// # Errors
/// * `CalibrationError::Storage` - The store could not be written
pub fn set_tutorial_completed(completed: bool) -> Result<(), CalibrationError> {
    write_tutorial_flag(STORE.as_ref(), completed)
}

fn write_tutorial_flag(store: &dyn KeyValueStore, completed: bool) -> Result<(), CalibrationError> {
    storage::set_tutorial_completed(store, completed).map_err(|err| {
        log_storage_error(&err, "set_tutorial_completed");
        CalibrationError::from(err)
    })
}

// ============================================================================
// STREAMS
// ============================================================================

/// Stream of calibrated outputs in [1, 100], two decimals
pub async fn output_stream() -> impl Stream<Item = f64> {
    ENGINE_HANDLE.output_stream().await
}

/// Stream of baseline progress percentages
pub async fn progress_stream() -> impl Stream<Item = u8> {
    ENGINE_HANDLE.progress_stream().await
}

/// Stream of full per-sample updates
pub async fn update_stream() -> impl Stream<Item = CalibrationUpdate> {
    ENGINE_HANDLE.update_stream().await
}

/// Stream of engine telemetry (configuration changes, baseline commits)
pub async fn telemetry_stream() -> impl Stream<Item = TelemetryEvent> {
    ENGINE_HANDLE.telemetry_stream().await
}
