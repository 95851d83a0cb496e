// Progress tracking for baseline detection
//
// Baseline detection asks the user to hold a steady breath. Progress reports
// how long the current run of identical readings is compared to the run
// length needed before the resting reading is accepted.

/// Calibration phase derived from the baseline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CalibrationPhase {
    /// No baseline yet; counting stable readings
    SeekingBaseline,
    /// Baseline committed; output follows deviation from it
    Calibrated,
}

impl CalibrationPhase {
    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            CalibrationPhase::SeekingBaseline => "HOLD STILL",
            CalibrationPhase::Calibrated => "CALIBRATED",
        }
    }
}

/// Progress information for baseline detection
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationProgress {
    /// Longest run of identical readings observed since the last reset
    pub stable_readings: u32,
    /// Run length the baseline threshold is measured against
    pub readings_needed: u32,
    /// Whether a baseline has been committed (or loaded from storage)
    pub baseline_committed: bool,
}

impl CalibrationProgress {
    /// Create a new progress instance
    pub fn new(stable_readings: u32, readings_needed: u32, baseline_committed: bool) -> Self {
        Self {
            stable_readings,
            readings_needed,
            baseline_committed,
        }
    }

    /// Progress of a strategy that needs no baseline
    pub fn complete() -> Self {
        Self::new(0, 0, true)
    }

    pub fn phase(&self) -> CalibrationPhase {
        if self.baseline_committed {
            CalibrationPhase::Calibrated
        } else {
            CalibrationPhase::SeekingBaseline
        }
    }

    /// Get progress percentage (0-100)
    pub fn percentage(&self) -> u8 {
        if self.baseline_committed {
            return 100;
        }
        if self.readings_needed == 0 {
            return 0;
        }
        let ratio = self.stable_readings as f64 / self.readings_needed as f64;
        (ratio * 100.0).min(100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        assert_eq!(CalibrationProgress::new(0, 50, false).percentage(), 0);
        assert_eq!(CalibrationProgress::new(25, 50, false).percentage(), 50);
        assert_eq!(CalibrationProgress::new(50, 50, false).percentage(), 100);
        assert_eq!(CalibrationProgress::new(7, 50, false).percentage(), 14);
    }

    #[test]
    fn test_progress_clamps_at_100() {
        assert_eq!(CalibrationProgress::new(51, 50, false).percentage(), 100);
        assert_eq!(CalibrationProgress::new(500, 50, false).percentage(), 100);
    }

    #[test]
    fn test_progress_zero_needed() {
        assert_eq!(CalibrationProgress::new(0, 0, false).percentage(), 0);
    }

    #[test]
    fn test_committed_is_complete() {
        let progress = CalibrationProgress::new(3, 50, true);
        assert_eq!(progress.percentage(), 100);
        assert_eq!(progress.phase(), CalibrationPhase::Calibrated);

        assert_eq!(CalibrationProgress::complete().percentage(), 100);
    }

    #[test]
    fn test_phase_display_name() {
        assert_eq!(CalibrationPhase::SeekingBaseline.display_name(), "HOLD STILL");
        assert_eq!(CalibrationPhase::Calibrated.display_name(), "CALIBRATED");
    }
}
