// Persistence error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Storage error code constants
///
/// Error code range: 3001-3003
pub struct StorageErrorCodes {}

impl StorageErrorCodes {
    /// Reading or writing the backing file failed
    pub const IO: i32 = 3001;

    /// Stored content could not be encoded or decoded as JSON
    pub const SERIALIZATION: i32 = 3002;

    /// Store lock was poisoned
    pub const LOCK_POISONED: i32 = 3003;
}

/// Log a storage error with structured context
pub fn log_storage_error(err: &StorageError, context: &str) {
    error!(
        "Storage error in {}: code={}, component=KeyValueStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by key-value store implementations
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Backing file could not be read or written
    Io { path: String, reason: String },

    /// Content was not valid JSON for the expected shape
    Serialization { reason: String },

    /// Store lock was poisoned by a panicking writer
    LockPoisoned,
}

impl ErrorCode for StorageError {
    fn code(&self) -> i32 {
        match self {
            StorageError::Io { .. } => StorageErrorCodes::IO,
            StorageError::Serialization { .. } => StorageErrorCodes::SERIALIZATION,
            StorageError::LockPoisoned => StorageErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            StorageError::Io { path, reason } => format!("I/O failure on {}: {}", path, reason),
            StorageError::Serialization { reason } => {
                format!("Invalid stored content: {}", reason)
            }
            StorageError::LockPoisoned => "Store lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StorageError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StorageError {}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_codes() {
        assert_eq!(
            StorageError::Io {
                path: "a".to_string(),
                reason: "b".to_string()
            }
            .code(),
            3001
        );
        assert_eq!(
            StorageError::Serialization {
                reason: "x".to_string()
            }
            .code(),
            3002
        );
        assert_eq!(StorageError::LockPoisoned.code(), 3003);
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<f64>("not json").unwrap_err();
        let err: StorageError = parse_err.into();
        assert_eq!(err.code(), StorageErrorCodes::SERIALIZATION);
    }

    #[test]
    fn test_error_code_trait() {
        let err: &dyn ErrorCode = &StorageError::LockPoisoned;
        assert_eq!(err.code(), 3003);
        assert!(err.message().contains("poisoned"));
    }
}
