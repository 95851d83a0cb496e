//! Breath sensor notification decoding.
//!
//! The sensor pushes opaque notification buffers; the amplitude sample is a
//! little-endian `i32` at a fixed byte offset. Anything too short to hold it
//! yields no sample.

pub mod simulator;

pub use simulator::BreathSimulator;

use crate::calibration::{normalize, round_to_hundredths};
use crate::config::DeviceConfig;

/// Decode the raw sample carried by one notification buffer
///
/// # Arguments
/// * `payload` - Notification bytes as received from the sensor
/// * `offset` - Byte offset of the little-endian `i32`
///
/// # Returns
/// `None` when the buffer does not contain four bytes at `offset`
pub fn decode_notification(payload: &[u8], offset: usize) -> Option<i32> {
    let end = offset.checked_add(4)?;
    let bytes: [u8; 4] = payload.get(offset..end)?.try_into().ok()?;
    Some(i32::from_le_bytes(bytes))
}

/// Build a notification buffer carrying `raw`, the inverse of
/// [`decode_notification`]
pub fn encode_notification(raw: i32, offset: usize) -> Vec<u8> {
    let mut payload = vec![0u8; offset];
    payload.extend_from_slice(&raw.to_le_bytes());
    payload
}

/// Reading as a percentage of the fixed hardware range, to two decimals
///
/// Unlike the calibration pipeline this ignores session extrema; graphs use
/// it to show where the sensor sits relative to its physical caps.
pub fn hardware_percentage(raw: i64, device: &DeviceConfig) -> f64 {
    round_to_hundredths(normalize(raw, device.hardware_min, device.hardware_max))
}
