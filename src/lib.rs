// Breath Trainer Core - adaptive calibration for breath sensors
// Turns noisy amplitude samples into a smooth, bounded control signal

// Module declarations
pub mod api;
pub mod calibration;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod managers;
pub mod pipeline;
pub mod storage;

// Re-exports for convenience
pub use calibration::{CalibrationStrategy, StrategyKind};
pub use config::AppConfig;
pub use engine::{EngineHandle, TelemetryEvent, TelemetryEventKind};
pub use pipeline::{CalibrationPipeline, CalibrationUpdate, PipelineSnapshot};

/// Install the fmt tracing subscriber
///
/// Records at `info` and above go to stderr, including `log` records from the
/// config and error helpers, so stdout stays free for machine-readable output.
/// Calling it more than once is harmless.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
