use serde::Serialize;

use crate::constants::{MAX_F0, MIN_F0, SILENCE_ENERGY};

use super::autocorrelation;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchEstimate {
    /// Lag of the autocorrelation maximum, in samples
    pub period: usize,
    /// Autocorrelation at `period` normalized by the frame energy
    pub confidence: f64,
}

impl PitchEstimate {
    pub fn is_voiced(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }
}

/// Autocorrelation pitch search over the 70–200 Hz band.
#[derive(Debug, Clone)]
pub struct PitchDetector {
    min_lag: usize,
    max_lag: usize,
}

impl PitchDetector {
    pub fn new(sample_rate: usize) -> Self {
        let sample_rate = sample_rate as f64;
        let min_lag = ((sample_rate / MAX_F0).floor() as usize).max(1);
        let max_lag = ((sample_rate / MIN_F0).ceil() as usize).max(min_lag);
        Self { min_lag, max_lag }
    }

    /// Searched lag range, both ends inclusive.
    pub fn lag_range(&self) -> (usize, usize) {
        (self.min_lag, self.max_lag)
    }

    /// On a tie the shorter lag wins. A silent frame reports the shortest lag with
    /// confidence 0.
    pub fn detect<T: Copy + Into<f64>>(&self, frame: &[T]) -> PitchEstimate {
        let energy = autocorrelation(frame, 0);
        if !energy.is_finite() || energy <= SILENCE_ENERGY {
            return PitchEstimate {
                period: self.min_lag,
                confidence: 0.0,
            };
        }

        let last = self.max_lag.min(frame.len().saturating_sub(1));
        let mut period = self.min_lag;
        let mut best = f64::NEG_INFINITY;
        for lag in self.min_lag..=last {
            let value = autocorrelation(frame, lag);
            if value > best {
                best = value;
                period = lag;
            }
        }
        if best == f64::NEG_INFINITY {
            // frame shorter than the shortest searched period
            return PitchEstimate {
                period,
                confidence: 0.0,
            };
        }

        PitchEstimate {
            period,
            confidence: best / energy,
        }
    }
}
