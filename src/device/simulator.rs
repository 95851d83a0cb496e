// BreathSimulator - synthetic sensor stream for demos and tests
//
// The stream has three phases so a full calibration can be observed:
// 1. Warm-up breaths that widen the running extrema
// 2. A resting plateau long enough for the baseline to commit
// 3. Continuous noisy breathing around the resting level

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::encode_notification;

/// Generator of raw breath samples in device units
pub struct BreathSimulator {
    rng: StdRng,
    rest_level: i32,
    amplitude: f64,
    noise: i32,
    warmup_samples: usize,
    rest_samples: usize,
    breath_period: usize,
    dropout_probability: f64,
    index: usize,
}

impl BreathSimulator {
    /// Create a simulator with a reproducible seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            rest_level: 600_000_000,
            amplitude: 400_000_000.0,
            noise: 2_000_000,
            warmup_samples: 40,
            rest_samples: 60,
            breath_period: 40,
            dropout_probability: 0.0,
            index: 0,
        }
    }

    /// Length of the resting plateau in samples
    pub fn with_rest_samples(mut self, rest_samples: usize) -> Self {
        self.rest_samples = rest_samples;
        self
    }

    /// Probability that a notification arrives truncated
    pub fn with_dropout(mut self, probability: f64) -> Self {
        self.dropout_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Next raw sample
    pub fn next_sample(&mut self) -> i32 {
        let index = self.index;
        self.index += 1;

        let resting = index >= self.warmup_samples && index < self.warmup_samples + self.rest_samples;
        if resting {
            return self.rest_level;
        }

        let phase = 2.0 * std::f64::consts::PI * index as f64 / self.breath_period as f64;
        let jitter = self.rng.gen_range(-self.noise..=self.noise);
        let value = self.rest_level as f64 + self.amplitude * phase.sin() + jitter as f64;
        value.clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }

    /// Next notification buffer, occasionally truncated when dropout is set
    pub fn next_notification(&mut self, offset: usize) -> Vec<u8> {
        let mut payload = encode_notification(self.next_sample(), offset);
        if self.dropout_probability > 0.0 && self.rng.gen_bool(self.dropout_probability) {
            payload.truncate(offset + 2);
        }
        payload
    }
}

impl Iterator for BreathSimulator {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        Some(self.next_sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::decode_notification;

    #[test]
    fn test_same_seed_same_stream() {
        let a: Vec<i32> = BreathSimulator::new(7).take(200).collect();
        let b: Vec<i32> = BreathSimulator::new(7).take(200).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rest_plateau_is_constant() {
        let samples: Vec<i32> = BreathSimulator::new(1).take(100).collect();
        assert!(samples[40..100].iter().all(|&s| s == 600_000_000));
        assert!(samples[..40].iter().any(|&s| s != 600_000_000));
    }

    #[test]
    fn test_notifications_decode_unless_dropped() {
        let mut clean = BreathSimulator::new(3);
        for _ in 0..50 {
            assert!(decode_notification(&clean.next_notification(1), 1).is_some());
        }

        let mut lossy = BreathSimulator::new(3).with_dropout(1.0);
        assert!(decode_notification(&lossy.next_notification(1), 1).is_none());
    }
}
