// Linear - pass the normalized reading straight through

use super::normalizer::normalize;
use super::strategy::{CalibrationStrategy, StrategyKind, MAX_OUTPUT, MIN_OUTPUT};

/// Stateless strategy mapping the reading onto [1, 100] directly
#[derive(Debug, Default)]
pub struct Linear;

impl Linear {
    pub fn new() -> Self {
        Self
    }
}

impl CalibrationStrategy for Linear {
    fn name(&self) -> &'static str {
        StrategyKind::Linear.display_name()
    }

    fn description(&self) -> &'static str {
        StrategyKind::Linear.description()
    }

    fn calibrate(
        &mut self,
        reading: i64,
        min_reading: i64,
        max_reading: i64,
        _sensitivity: u32,
    ) -> f64 {
        normalize(reading, min_reading, max_reading)
            .round()
            .clamp(MIN_OUTPUT, MAX_OUTPUT)
    }

    fn reset(&mut self) {}
}
