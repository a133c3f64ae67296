//! Per-frame analysis: all-pole model and pitch estimate.

mod lpc;
mod pitch;

pub use lpc::{LpcAnalyzer, LpcModel, levinson};
pub use pitch::{PitchDetector, PitchEstimate};

/// Biased autocorrelation `Σ x[i]·x[i+lag]` over the frame. Lags past the end give 0.
#[inline]
pub fn autocorrelation<T: Copy + Into<f64>>(x: &[T], lag: usize) -> f64 {
    if lag >= x.len() {
        return 0.0;
    }
    x.iter()
        .zip(&x[lag..])
        .map(|(&a, &b)| a.into() * b.into())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::autocorrelation;

    #[test]
    fn small_frame() {
        let x = [1.0f32, 2.0, 3.0];
        assert_eq!(autocorrelation(&x, 0), 14.0);
        assert_eq!(autocorrelation(&x, 1), 8.0);
        assert_eq!(autocorrelation(&x, 2), 3.0);
        assert_eq!(autocorrelation(&x, 3), 0.0);
        assert_eq!(autocorrelation(&x, 10), 0.0);
    }
}
