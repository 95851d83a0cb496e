//! EngineHandle: threaded owner of the calibration pipeline.
//!
//! Raw samples arrive from hardware callbacks on arbitrary threads. The
//! handle only enqueues them; a dedicated worker thread owns the
//! [`CalibrationPipeline`] and applies samples and configuration changes one
//! at a time, in the order they were submitted.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::calibration::StrategyKind;
use crate::config::AppConfig;
use crate::device::decode_notification;
use crate::error::{log_calibration_error, CalibrationError};
use crate::managers::BroadcastChannelManager;
use crate::pipeline::{CalibrationPipeline, PipelineSnapshot, MAX_SENSITIVITY};
use crate::storage::{KeyValueStore, MemoryStore};

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

/// Telemetry event emitted by the engine core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}

/// Types of telemetry events supported by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEventKind {
    SessionStarted { strategy: StrategyKind, sensitivity: u32 },
    SensitivityChanged { sensitivity: u32 },
    StrategyChanged { strategy: StrategyKind },
    /// A baseline was detected from a stable run during this session
    BaselineCommitted { baseline: f64 },
    CalibrationReset,
    /// Notification too short to carry a sample
    NotificationDropped { length: usize },
}

/// Work items consumed by the calibration worker
#[derive(Debug)]
enum EngineCommand {
    Sample(i32),
    SetSensitivity(u32),
    SetStrategy(StrategyKind),
    CompleteReset,
    Snapshot(oneshot::Sender<PipelineSnapshot>),
}

/// EngineHandle owns the calibration worker and its output channels.
pub struct EngineHandle {
    config: AppConfig,
    pub(crate) broadcasts: BroadcastChannelManager,
    command_tx: Mutex<Option<mpsc::UnboundedSender<EngineCommand>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    start_instant: Instant,
}

impl EngineHandle {
    /// Start a worker for `config`, persisting the baseline in `store`.
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let broadcasts = BroadcastChannelManager::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let start_instant = Instant::now();

        let pipeline = CalibrationPipeline::with_broadcasts(
            config.calibration.clone(),
            store,
            broadcasts.clone(),
        );
        Self::publish_event(
            &broadcasts,
            start_instant,
            TelemetryEventKind::SessionStarted {
                strategy: config.calibration.strategy,
                sensitivity: pipeline.sensitivity(),
            },
            None,
        );

        let worker = Self::spawn_worker(pipeline, command_rx, broadcasts.clone(), start_instant);

        Self {
            config,
            broadcasts,
            command_tx: Mutex::new(Some(command_tx)),
            worker: Mutex::new(Some(worker)),
            start_instant,
        }
    }

    /// Start a worker whose baseline lives only as long as the process.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    fn spawn_worker(
        mut pipeline: CalibrationPipeline,
        mut command_rx: mpsc::UnboundedReceiver<EngineCommand>,
        broadcasts: BroadcastChannelManager,
        start_instant: Instant,
    ) -> JoinHandle<()> {
        // Dedicated thread with its own runtime so callers need no Tokio
        // context of their own
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create Tokio runtime for calibration worker");

            rt.block_on(async move {
                while let Some(command) = command_rx.recv().await {
                    Self::apply_command(&mut pipeline, command, &broadcasts, start_instant);
                }
                tracing::debug!("[EngineHandle] Command channel closed, worker exiting");
            });
        })
    }

    fn apply_command(
        pipeline: &mut CalibrationPipeline,
        command: EngineCommand,
        broadcasts: &BroadcastChannelManager,
        start_instant: Instant,
    ) {
        match command {
            EngineCommand::Sample(raw) => {
                let had_baseline = pipeline.baseline().is_some();
                let update = pipeline.process_sample(raw);
                if let (false, Some(baseline)) = (had_baseline, update.baseline) {
                    Self::publish_event(
                        broadcasts,
                        start_instant,
                        TelemetryEventKind::BaselineCommitted { baseline },
                        None,
                    );
                }
            }
            EngineCommand::SetSensitivity(sensitivity) => {
                let kind = match pipeline.set_sensitivity(sensitivity) {
                    Ok(()) => TelemetryEventKind::SensitivityChanged { sensitivity },
                    Err(err) => {
                        // Range is checked before enqueueing
                        log_calibration_error(&err, "set_sensitivity");
                        return;
                    }
                };
                Self::publish_event(broadcasts, start_instant, kind, None);
            }
            EngineCommand::SetStrategy(strategy) => {
                pipeline.set_strategy(strategy);
                Self::publish_event(
                    broadcasts,
                    start_instant,
                    TelemetryEventKind::StrategyChanged { strategy },
                    Some(pipeline.strategy_name().to_string()),
                );
            }
            EngineCommand::CompleteReset => {
                pipeline.complete_reset();
                Self::publish_event(
                    broadcasts,
                    start_instant,
                    TelemetryEventKind::CalibrationReset,
                    None,
                );
            }
            EngineCommand::Snapshot(reply) => {
                let _ = reply.send(pipeline.snapshot());
            }
        }
    }

    fn publish_event(
        broadcasts: &BroadcastChannelManager,
        start_instant: Instant,
        kind: TelemetryEventKind,
        detail: Option<String>,
    ) {
        let timestamp_ms = start_instant.elapsed().as_millis() as u64;
        broadcasts.publish_telemetry(&TelemetryEvent {
            timestamp_ms,
            kind,
            detail,
        });
    }

    fn emit_event(&self, kind: TelemetryEventKind, detail: Option<String>) {
        Self::publish_event(&self.broadcasts, self.start_instant, kind, detail);
    }

    fn send(&self, command: EngineCommand) -> Result<(), CalibrationError> {
        let guard = self
            .command_tx
            .lock()
            .map_err(|_| CalibrationError::StatePoisoned)?;
        let tx = guard.as_ref().ok_or(CalibrationError::EngineStopped)?;
        tx.send(command).map_err(|_| CalibrationError::EngineStopped)
    }

    // ========================================================================
    // SAMPLE INGESTION
    // ========================================================================

    /// Decode a sensor notification and enqueue its sample.
    ///
    /// # Returns
    /// * `Ok(true)` - Sample enqueued
    /// * `Ok(false)` - Buffer too short; dropped without affecting calibration
    pub fn push_notification(&self, payload: &[u8]) -> Result<bool, CalibrationError> {
        match decode_notification(payload, self.config.device.payload_offset) {
            Some(raw) => self.push_sample(raw).map(|_| true),
            None => {
                tracing::debug!(
                    "[EngineHandle] Dropping {}-byte notification without a sample",
                    payload.len()
                );
                self.emit_event(
                    TelemetryEventKind::NotificationDropped {
                        length: payload.len(),
                    },
                    None,
                );
                Ok(false)
            }
        }
    }

    /// Enqueue an already decoded raw sample.
    pub fn push_sample(&self, raw: i32) -> Result<(), CalibrationError> {
        self.send(EngineCommand::Sample(raw))
    }

    // ========================================================================
    // RUNTIME CONFIGURATION
    // ========================================================================

    /// Change the gain, effective from the next queued sample.
    pub fn set_sensitivity(&self, sensitivity: u32) -> Result<(), CalibrationError> {
        if sensitivity > MAX_SENSITIVITY {
            return Err(CalibrationError::InvalidSensitivity { sensitivity });
        }
        self.send(EngineCommand::SetSensitivity(sensitivity))
    }

    /// Swap the active strategy for a fresh instance of `kind`.
    pub fn set_strategy(&self, kind: StrategyKind) -> Result<(), CalibrationError> {
        self.send(EngineCommand::SetStrategy(kind))
    }

    /// Swap the active strategy by identifier, e.g. `"linear"`.
    pub fn set_strategy_by_name(&self, name: &str) -> Result<StrategyKind, CalibrationError> {
        let kind: StrategyKind = name.parse()?;
        self.set_strategy(kind)?;
        Ok(kind)
    }

    /// Clear extrema, strategy state and the persisted baseline.
    pub fn complete_reset(&self) -> Result<(), CalibrationError> {
        self.send(EngineCommand::CompleteReset)
    }

    /// Pipeline state after every previously queued command has been applied.
    ///
    /// Blocks the calling thread; must not be called from inside an async
    /// runtime.
    pub fn snapshot(&self) -> Result<PipelineSnapshot, CalibrationError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot(reply_tx))?;
        reply_rx
            .blocking_recv()
            .map_err(|_| CalibrationError::EngineStopped)
    }

    /// Async variant of [`EngineHandle::snapshot`].
    pub async fn snapshot_async(&self) -> Result<PipelineSnapshot, CalibrationError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| CalibrationError::EngineStopped)
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Stop accepting commands and wait for queued ones to drain.
    ///
    /// Subscriptions end once they have delivered everything published
    /// before the worker stopped. Idempotent. Later calls that enqueue work
    /// fail with `EngineStopped`.
    pub fn shutdown(&self) {
        // Dropping the sender ends the worker loop once the queue drains
        match self.command_tx.lock() {
            Ok(mut tx) => drop(tx.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }

        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            if worker.join().is_err() {
                log_calibration_error(&CalibrationError::EngineStopped, "worker_join");
            }
        }
        self.broadcasts.close_all();
    }

    pub fn is_running(&self) -> bool {
        self.command_tx
            .lock()
            .map(|tx| tx.is_some())
            .unwrap_or(false)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Milliseconds elapsed since the handle was created (used for telemetry).
    pub fn uptime_ms(&self) -> u64 {
        self.start_instant.elapsed().as_millis() as u64
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ========================================================================
// TEST HELPERS
// ========================================================================
