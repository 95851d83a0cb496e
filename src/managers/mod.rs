// Managers Module
//
// Focused manager classes shared by the pipeline and the engine worker.
//
// - BroadcastChannelManager: lossless fan-out of updates and telemetry

pub mod broadcast_manager;

pub use broadcast_manager::{BroadcastChannelManager, Subscribers};
