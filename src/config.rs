//! Configuration management for runtime parameter tuning
//!
//! This module provides configuration loading from JSON files so the
//! calibration gain, strategy variant, and device framing can be adjusted
//! without recompilation. Every field has a default, so partial files are
//! accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::StrategyKind;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Calibration strategy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Gain applied to deviation from baseline, in percent
    pub sensitivity: u32,
    /// Strategy variant active at session start
    pub strategy: StrategyKind,
    /// Consecutive identical readings that must be exceeded before the
    /// baseline commits
    pub baseline_threshold: u32,
    /// Half-width of the band around baseline that leaves the output untouched
    pub dead_zone: f64,
    /// Extra step applied on exhale only
    pub exhale_bonus: f64,
    /// Step size of the constant stepper at the default sensitivity
    pub constant_step: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            sensitivity: 15,
            strategy: StrategyKind::DynamicStepper,
            baseline_threshold: 50,
            dead_zone: 1.0,
            // Exhaling needs more perceived force than inhaling to register
            // the same change.
            exhale_bonus: 0.5,
            constant_step: 1.5,
        }
    }
}

/// Notification framing and hardware caps of the breath sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Byte offset of the little-endian i32 sample inside a notification
    pub payload_offset: usize,
    /// Lowest raw value the hardware reports
    pub hardware_min: i64,
    /// Highest raw value the hardware reports
    pub hardware_max: i64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            payload_offset: 1,
            hardware_min: 26_804_568,
            hardware_max: 2_107_080_156,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the key-value store
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("breath_store.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the bundled assets directory
    pub fn load() -> Self {
        Self::load_from_file("assets/breath_config.json")
    }
}
