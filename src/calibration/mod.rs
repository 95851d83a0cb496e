// Calibration module - turning raw breath samples into a control signal
//
// This module provides the per-sample building blocks:
// 1. normalizer: raw sample + running extrema -> 0-100 reading
// 2. baseline: resting reading detection and persistence
// 3. strategy: pluggable reading-to-output transforms
//
// The CalibrationPipeline in crate::pipeline wires them together.

pub mod baseline;
pub mod constant_stepper;
pub mod dynamic_stepper;
pub mod linear;
pub mod normalizer;
pub mod progress;
pub mod strategy;
pub mod strategy_factory;
mod stepper;

pub use baseline::{BaselineEstimator, BaselineState, DEFAULT_BASELINE_THRESHOLD};
pub use constant_stepper::ConstantStepper;
pub use dynamic_stepper::DynamicStepper;
pub use linear::Linear;
pub use normalizer::{normalize, round_to_hundredths, Extrema};
pub use progress::{CalibrationPhase, CalibrationProgress};
pub use strategy::{CalibrationStrategy, StrategyKind, MAX_OUTPUT, MIN_OUTPUT};
pub use strategy_factory::StrategyInfo;
