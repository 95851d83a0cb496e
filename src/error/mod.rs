// Error types for the breath trainer core
//
// This module defines custom error types for calibration and persistence
// operations, providing structured error handling with stable numeric codes
// that host applications can match on.

mod calibration;
mod storage;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use storage::{log_storage_error, StorageError, StorageErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// library and host boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
