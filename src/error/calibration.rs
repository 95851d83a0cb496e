// Calibration error types and constants

use crate::error::{ErrorCode, StorageError};
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Single source of truth for the numeric codes reported by
/// [`CalibrationError::code`].
///
/// Error code range: 2001-2005
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Sensitivity outside the accepted percentage range
    pub const INVALID_SENSITIVITY: i32 = 2001;

    /// Strategy identifier does not name a known variant
    pub const UNKNOWN_STRATEGY: i32 = 2002;

    /// Calibration state lock was poisoned
    pub const STATE_POISONED: i32 = 2003;

    /// Calibration worker is no longer accepting commands
    pub const ENGINE_STOPPED: i32 = 2004;

    /// Persistence collaborator failed
    pub const STORAGE: i32 = 2005;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover runtime configuration of the pipeline (sensitivity,
/// strategy selection) and the lifecycle of the calibration worker.
///
/// Error code range: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Sensitivity outside [0, 100]
    InvalidSensitivity { sensitivity: u32 },

    /// Unknown strategy identifier
    UnknownStrategy { name: String },

    /// Calibration state lock was poisoned
    StatePoisoned,

    /// Worker thread has shut down
    EngineStopped,

    /// Persistence collaborator failed
    Storage { reason: String },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InvalidSensitivity { .. } => {
                CalibrationErrorCodes::INVALID_SENSITIVITY
            }
            CalibrationError::UnknownStrategy { .. } => CalibrationErrorCodes::UNKNOWN_STRATEGY,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
            CalibrationError::EngineStopped => CalibrationErrorCodes::ENGINE_STOPPED,
            CalibrationError::Storage { .. } => CalibrationErrorCodes::STORAGE,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InvalidSensitivity { sensitivity } => {
                format!("Sensitivity must be within 0..=100 (got {})", sensitivity)
            }
            CalibrationError::UnknownStrategy { name } => {
                format!("Unknown calibration strategy: {}", name)
            }
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
            CalibrationError::EngineStopped => {
                "Calibration engine stopped. Create a new session first.".to_string()
            }
            CalibrationError::Storage { reason } => {
                format!("Calibration storage failure: {}", reason)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

impl From<StorageError> for CalibrationError {
    fn from(err: StorageError) -> Self {
        CalibrationError::Storage {
            reason: err.message(),
        }
    }
}
