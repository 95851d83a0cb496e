// BroadcastChannelManager: Centralized fan-out of pipeline results
// Single Responsibility: Subscriber registration and lossless delivery

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::engine::TelemetryEvent;
use crate::pipeline::CalibrationUpdate;

/// Registered receivers of one message type
///
/// Every subscriber gets its own unbounded channel, so a slow reader never
/// loses messages or holds back the others. Senders whose receiver was
/// dropped are pruned on the next publish.
pub struct Subscribers<T> {
    /// `None` once closed
    senders: Arc<Mutex<Option<Vec<mpsc::UnboundedSender<T>>>>>,
}

impl<T: Clone> Subscribers<T> {
    pub fn new() -> Self {
        Self {
            senders: Arc::new(Mutex::new(Some(Vec::new()))),
        }
    }

    /// Register a receiver for every message published from now on
    ///
    /// After [`Subscribers::close`] the receiver ends immediately.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(senders) = lock(&self.senders).as_mut() {
            senders.push(tx);
        }
        rx
    }

    /// Deliver `item` to every live subscriber, in publish order
    pub fn publish(&self, item: &T) {
        if let Some(senders) = lock(&self.senders).as_mut() {
            senders.retain(|tx| tx.send(item.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.senders).as_ref().map_or(0, Vec::len)
    }

    /// Drop every sender; receivers drain what is queued and then end
    pub fn close(&self) {
        lock(&self.senders).take();
    }
}

impl<T> Clone for Subscribers<T> {
    fn clone(&self) -> Self {
        Self {
            senders: Arc::clone(&self.senders),
        }
    }
}

impl<T: Clone> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Manages the channels fanning calibration results out to subscribers
///
/// # Channel Types
/// - Updates: one message per processed sample (output, progress, baseline)
/// - Outputs / progress: the matching fields of each update, for UI layers
///   that only draw one value
/// - Telemetry: session lifecycle and configuration changes
///
/// Clones share the same subscriber lists; the pipeline publishes through
/// one clone while the engine handle registers subscribers on another.
#[derive(Clone, Default)]
pub struct BroadcastChannelManager {
    updates: Subscribers<CalibrationUpdate>,
    outputs: Subscribers<f64>,
    progress: Subscribers<u8>,
    telemetry: Subscribers<TelemetryEvent>,
}

impl BroadcastChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // UPDATES CHANNELS
    // ========================================================================

    /// Publish one update to the update, output and progress subscribers
    pub fn publish_update(&self, update: &CalibrationUpdate) {
        self.updates.publish(update);
        self.outputs.publish(&update.output);
        self.progress.publish(&update.progress);
    }

    pub fn subscribe_updates(&self) -> mpsc::UnboundedReceiver<CalibrationUpdate> {
        self.updates.subscribe()
    }

    pub fn subscribe_outputs(&self) -> mpsc::UnboundedReceiver<f64> {
        self.outputs.subscribe()
    }

    pub fn subscribe_progress(&self) -> mpsc::UnboundedReceiver<u8> {
        self.progress.subscribe()
    }

    // ========================================================================
    // TELEMETRY CHANNEL
    // ========================================================================

    pub fn publish_telemetry(&self, event: &TelemetryEvent) {
        self.telemetry.publish(event);
    }

    pub fn subscribe_telemetry(&self) -> mpsc::UnboundedReceiver<TelemetryEvent> {
        self.telemetry.subscribe()
    }

    /// End every subscription after its queued messages
    pub fn close_all(&self) {
        self.updates.close();
        self.outputs.close();
        self.progress.close();
        self.telemetry.close();
    }
}

/// Senders stay valid even if a holder panicked, so poisoning is ignored
fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationPhase;
    use crate::engine::TelemetryEventKind;

    fn update(sequence: u64) -> CalibrationUpdate {
        CalibrationUpdate {
            sequence,
            raw: 500,
            normalized: 50.0,
            output: sequence as f64,
            progress: 2,
            phase: CalibrationPhase::SeekingBaseline,
            baseline: None,
        }
    }

    #[test]
    fn test_multiple_subscribers_in_order() {
        let manager = BroadcastChannelManager::new();
        let mut rx1 = manager.subscribe_updates();
        let mut rx2 = manager.subscribe_updates();

        manager.publish_update(&update(1));
        manager.publish_update(&update(2));

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(rx.try_recv().unwrap().sequence, 1);
            assert_eq!(rx.try_recv().unwrap().sequence, 2);
        }
    }

    #[test]
    fn test_unread_subscriber_loses_nothing() {
        let manager = BroadcastChannelManager::new();
        let mut outputs = manager.subscribe_outputs();
        let mut progress = manager.subscribe_progress();

        for sequence in 1..=10_000 {
            manager.publish_update(&update(sequence));
        }

        let mut count = 0;
        while let Ok(output) = outputs.try_recv() {
            count += 1;
            assert_eq!(output, count as f64);
        }
        assert_eq!(count, 10_000);

        let mut progress_count = 0;
        while progress.try_recv().is_ok() {
            progress_count += 1;
        }
        assert_eq!(progress_count, 10_000);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let manager = BroadcastChannelManager::new();
        let kept = manager.subscribe_updates();
        drop(manager.subscribe_updates());
        assert_eq!(manager.updates.subscriber_count(), 2);

        manager.publish_update(&update(1));
        assert_eq!(manager.updates.subscriber_count(), 1);
        drop(kept);
    }

    #[test]
    fn test_close_all_ends_subscriptions_after_drain() {
        let manager = BroadcastChannelManager::new();
        let mut rx = manager.subscribe_telemetry();

        manager.publish_telemetry(&TelemetryEvent {
            timestamp_ms: 0,
            kind: TelemetryEventKind::CalibrationReset,
            detail: None,
        });
        manager.close_all();

        assert!(matches!(
            rx.blocking_recv().map(|event| event.kind),
            Some(TelemetryEventKind::CalibrationReset)
        ));
        assert!(rx.blocking_recv().is_none());

        let mut late = manager.subscribe_outputs();
        assert!(late.blocking_recv().is_none());
    }

    #[test]
    fn test_clones_share_subscribers() {
        let manager = BroadcastChannelManager::new();
        let publisher = manager.clone();
        let mut rx = manager.subscribe_progress();

        publisher.publish_update(&update(3));
        assert_eq!(rx.try_recv().unwrap(), 2);
    }
}
