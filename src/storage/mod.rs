// Storage module - key-value persistence port
//
// Calibration only ever persists two scalars: the committed baseline and the
// tutorial-completion flag. Both are stored as JSON-encoded strings under
// fixed keys, so any string store can back them:
// 1. MemoryStore: in-process map, used by tests and ephemeral sessions
// 2. JsonFileStore: single JSON object on disk, written through on every change

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StorageError;

/// Key holding the committed resting reading of the stepper strategies
pub const BASELINE_KEY: &str = "DYNAMIC_STEPPER_BASELINE";

/// Key holding whether the breathing tutorial has been completed
pub const TUTORIAL_KEY: &str = "TUTORIAL_COMPLETED";

/// String key-value store injected into the calibration pipeline
///
/// Writes must be visible to the next `get` on the same thread; baseline
/// detection reads back a value immediately after committing it.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw string stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value stored under `key`
///
/// Returns `Ok(None)` when the key is absent and `Err(Serialization)` when the
/// stored text is not valid JSON for `T`.
pub fn load_json<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(content) => Ok(Some(serde_json::from_str(&content)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key`
pub fn store_json<T: serde::Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(value)?;
    store.set(key, &encoded)
}

/// Whether the user has finished the breathing tutorial
///
/// A missing or corrupted flag reads as `false`.
pub fn tutorial_completed(store: &dyn KeyValueStore) -> bool {
    match load_json::<bool>(store, TUTORIAL_KEY) {
        Ok(flag) => flag.unwrap_or(false),
        Err(err) => {
            log::warn!("[Storage] Ignoring unreadable tutorial flag: {}", err);
            false
        }
    }
}

/// Persist the tutorial-completion flag
pub fn set_tutorial_completed(
    store: &dyn KeyValueStore,
    completed: bool,
) -> Result<(), StorageError> {
    store_json(store, TUTORIAL_KEY, &completed)
}
