// CalibrationStrategy - pluggable reading-to-output transforms
//
// A strategy turns one raw sample, the running extrema, and the sensitivity
// into a bounded control value in [1, 100]. Strategies are stateful: the
// stepper variants keep their output between calls and move it by an amount
// derived from the deviation from baseline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationProgress;
use crate::error::CalibrationError;

/// Lowest value a strategy may return
pub const MIN_OUTPUT: f64 = 1.0;

/// Highest value a strategy may return
pub const MAX_OUTPUT: f64 = 100.0;

/// Stateful transform from raw samples to a bounded control output
pub trait CalibrationStrategy: Send {
    /// Short name for selection lists
    fn name(&self) -> &'static str;

    /// One-sentence explanation shown next to the name
    fn description(&self) -> &'static str;

    /// Transform one raw sample into an output in [1, 100]
    ///
    /// # Arguments
    /// * `reading` - Raw sample in device units
    /// * `min_reading` - Running session minimum, including `reading`
    /// * `max_reading` - Running session maximum, including `reading`
    /// * `sensitivity` - Gain in percent
    fn calibrate(
        &mut self,
        reading: i64,
        min_reading: i64,
        max_reading: i64,
        sensitivity: u32,
    ) -> f64;

    /// Discard all accumulated state, including any persisted baseline
    fn reset(&mut self);

    /// Baseline detection progress
    fn progress(&self) -> CalibrationProgress {
        CalibrationProgress::complete()
    }

    /// Committed resting reading, if the strategy uses one
    fn baseline(&self) -> Option<f64> {
        None
    }
}

/// Built-in strategy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Inertial stepper scaled by deviation from baseline
    DynamicStepper,
    /// Inertial stepper moving by a fixed amount
    ConstantStepper,
    /// Normalized reading passed straight through
    Linear,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::DynamicStepper,
        StrategyKind::ConstantStepper,
        StrategyKind::Linear,
    ];

    /// Identifier used in configuration files and the CLI
    pub fn id(&self) -> &'static str {
        match self {
            StrategyKind::DynamicStepper => "dynamic_stepper",
            StrategyKind::ConstantStepper => "constant_stepper",
            StrategyKind::Linear => "linear",
        }
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            StrategyKind::DynamicStepper => "Dynamic stepper",
            StrategyKind::ConstantStepper => "Constant stepper",
            StrategyKind::Linear => "Linear",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::DynamicStepper => {
                "Stepper which stays at last known location. The amount of force of the breath is taken into consideration."
            }
            StrategyKind::ConstantStepper => {
                "Stepper which stays at last known location and moves at a constant pace while breathing in or out."
            }
            StrategyKind::Linear => {
                "Follows the sensor directly. Output is the current reading within the observed range."
            }
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::DynamicStepper
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for StrategyKind {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.id() == normalized)
            .ok_or_else(|| CalibrationError::UnknownStrategy {
                name: s.to_string(),
            })
    }
}
