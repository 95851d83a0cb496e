// Signal normalization against running session extrema

/// Map `raw` onto a 0-100 scale spanned by `min` and `max`
///
/// Returns 0 when `min == max`, which is the state right after a reset
/// before a second distinct sample has widened the range.
pub fn normalize(raw: i64, min: i64, max: i64) -> f64 {
    if max == min {
        return 0.0;
    }
    (raw - min) as f64 / (max - min) as f64 * 100.0
}

/// Round to two decimal places, the precision published to subscribers
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Running minimum/maximum of raw samples within a session
///
/// The minimum only decreases and the maximum only increases until
/// [`Extrema::reset`] returns both to unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extrema {
    bounds: Option<(i64, i64)>,
}

impl Extrema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen the range to include `raw` and return the updated `(min, max)`
    pub fn observe(&mut self, raw: i64) -> (i64, i64) {
        let bounds = match self.bounds {
            Some((min, max)) => (min.min(raw), max.max(raw)),
            None => (raw, raw),
        };
        self.bounds = Some(bounds);
        bounds
    }

    /// Current `(min, max)`, or `None` before the first sample
    pub fn bounds(&self) -> Option<(i64, i64)> {
        self.bounds
    }

    pub fn reset(&mut self) {
        self.bounds = None;
    }
}
