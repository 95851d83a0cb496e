use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{EngineHandle, TelemetryEvent};
use crate::pipeline::CalibrationUpdate;

impl EngineHandle {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================

    /// Full per-sample updates, every one of them, in processing order.
    pub fn subscribe_updates(&self) -> mpsc::UnboundedReceiver<CalibrationUpdate> {
        self.broadcasts.subscribe_updates()
    }

    /// Calibrated output values, two decimals.
    pub fn subscribe_outputs(&self) -> mpsc::UnboundedReceiver<f64> {
        self.broadcasts.subscribe_outputs()
    }

    /// Baseline progress percentages, one per processed sample.
    pub fn subscribe_progress(&self) -> mpsc::UnboundedReceiver<u8> {
        self.broadcasts.subscribe_progress()
    }

    pub fn subscribe_telemetry(&self) -> mpsc::UnboundedReceiver<TelemetryEvent> {
        self.broadcasts.subscribe_telemetry()
    }

    // ========================================================================
    // ASYNC STREAM ADAPTERS
    // ========================================================================

    pub async fn update_stream(&self) -> impl Stream<Item = CalibrationUpdate> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_updates())
    }

    pub async fn output_stream(&self) -> impl Stream<Item = f64> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_outputs())
    }

    pub async fn progress_stream(&self) -> impl Stream<Item = u8> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_progress())
    }

    pub async fn telemetry_stream(&self) -> impl Stream<Item = TelemetryEvent> + Unpin {
        UnboundedReceiverStream::new(self.subscribe_telemetry())
    }
}
