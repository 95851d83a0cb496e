//! Engine module housing the threaded calibration core.
//!
//! `EngineHandle` (`core`) owns the calibration worker thread, accepts raw
//! samples and configuration commands from any thread, and republishes
//! every result to each subscriber as a channel or stream.

pub mod core;

pub use core::{EngineHandle, TelemetryEvent, TelemetryEventKind};
