use std::f64::consts::PI;

use crate::constants::{ANTI_ALIAS_Q, MAX_RESAMPLING_FACTOR, MIN_RESAMPLING_FACTOR};

/// Second-order IIR section, `a[0]` normalized to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 3],
}

impl Default for Biquad {
    fn default() -> Self {
        Self::identity()
    }
}

impl Biquad {
    pub fn identity() -> Self {
        Self {
            b: [1.0, 0.0, 0.0],
            a: [1.0, 0.0, 0.0],
        }
    }

    /// Audio EQ cookbook low-pass with its cutoff at `factor` times the Nyquist
    /// frequency. A factor of 1 or more does not need band-limiting and yields the
    /// identity section.
    pub fn anti_alias(factor: f64) -> Self {
        if factor >= 1.0 {
            return Self::identity();
        }
        let omega = PI * factor;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * ANTI_ALIAS_Q);
        let a0 = 1.0 + alpha;
        Self {
            b: [
                (1.0 - cos_omega) / 2.0 / a0,
                (1.0 - cos_omega) / a0,
                (1.0 - cos_omega) / 2.0 / a0,
            ],
            a: [1.0, -2.0 * cos_omega / a0, (1.0 - alpha) / a0],
        }
    }

    pub fn b(&self) -> &[f64; 3] {
        &self.b
    }

    pub fn a(&self) -> &[f64; 3] {
        &self.a
    }

    /// Direct form I from zero state over the whole input.
    pub fn filter<T: Copy + Into<f64>>(&self, input: &[T], output: &mut [f64]) {
        let (mut x1, mut x2) = (0.0, 0.0);
        let (mut y1, mut y2) = (0.0, 0.0);
        for (x, y) in input.iter().zip(output.iter_mut()) {
            let x0: f64 = (*x).into();
            let y0 = self.b[0] * x0 + self.b[1] * x1 + self.b[2] * x2
                - self.a[1] * y1
                - self.a[2] * y2;
            *y = y0;
            (x2, x1) = (x1, x0);
            (y2, y1) = (y1, y0);
        }
    }
}

/// Band-limits a frame and linearly interpolates it onto a grid `factor` times as dense.
///
/// Used to stretch or shrink the apparent vocal tract before LPC analysis.
#[derive(Debug, Clone)]
pub struct Resampler {
    factor: f64,
    filter: Biquad,
    filtered: Vec<f64>,
    resampled: Vec<f64>,
    len: usize,
}

impl Resampler {
    /// Buffers are sized for frames of up to `frame_size` samples.
    pub fn new(frame_size: usize) -> Self {
        Self {
            factor: 1.0,
            filter: Biquad::identity(),
            filtered: vec![0.0; frame_size],
            resampled: vec![0.0; frame_size * 2],
            len: 0,
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn filter(&self) -> &Biquad {
        &self.filter
    }

    /// Redesign the anti-alias filter if the factor changed. NaN keeps the current factor.
    pub fn set_factor(&mut self, factor: f64) {
        if factor.is_nan() {
            return;
        }
        let factor = factor.clamp(MIN_RESAMPLING_FACTOR as f64, MAX_RESAMPLING_FACTOR as f64);
        if factor != self.factor {
            self.factor = factor;
            self.filter = Biquad::anti_alias(factor);
        }
    }

    /// Number of samples a frame of `frame_size` samples resamples to.
    pub fn output_len(&self, frame_size: usize) -> usize {
        let len = (frame_size as f64 * self.factor).round() as usize;
        if self.factor > 1.0 {
            len.saturating_sub(1)
        } else {
            len
        }
    }

    pub fn process<T: Copy + Into<f64>>(&mut self, frame: &[T]) -> &[f64] {
        let n = frame.len().min(self.filtered.len());
        if n == 0 {
            self.len = 0;
            return &[];
        }
        self.len = self.output_len(n).min(self.resampled.len());
        let filtered = &mut self.filtered[..n];
        self.filter.filter(&frame[..n], filtered);

        for (i, y) in self.resampled[..self.len].iter_mut().enumerate() {
            let position = i as f64 / self.factor;
            let left = (position.floor() as usize).min(n - 1);
            let right = (position.ceil() as usize).min(n - 1);
            *y = if left == right {
                filtered[left]
            } else {
                let t = position - left as f64;
                filtered[left] * (1.0 - t) + filtered[right] * t
            };
        }
        &self.resampled[..self.len]
    }

    /// Output of the last [`Resampler::process`] call.
    pub fn output(&self) -> &[f64] {
        &self.resampled[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::{Biquad, Resampler};

    fn gain_at(filter: &Biquad, omega: f64) -> f64 {
        let (b, a) = (filter.b(), filter.a());
        let re = |c: &[f64; 3]| c[0] + c[1] * omega.cos() + c[2] * (2.0 * omega).cos();
        let im = |c: &[f64; 3]| -c[1] * omega.sin() - c[2] * (2.0 * omega).sin();
        (re(b).hypot(im(b))) / (re(a).hypot(im(a)))
    }

    #[test]
    fn unit_factor_is_identity() {
        let mut resampler = Resampler::new(1024);
        resampler.set_factor(1.0);
        assert_eq!(*resampler.filter(), Biquad::identity());
        assert_eq!(resampler.filter().b(), &[1.0, 0.0, 0.0]);
        assert_eq!(resampler.filter().a(), &[1.0, 0.0, 0.0]);

        let frame: Vec<f32> = (0..1024).map(|i| ((i * 37) % 101) as f32 / 101.0 - 0.5).collect();
        let out = resampler.process(&frame);
        assert_eq!(out.len(), 1024);
        for (x, y) in frame.iter().zip(out) {
            assert_eq!(*x as f64, *y);
        }
    }

    #[test]
    fn upsampling_needs_no_lowpass() {
        assert_eq!(Biquad::anti_alias(1.5), Biquad::identity());
        assert_eq!(Biquad::anti_alias(2.0), Biquad::identity());
    }

    #[test]
    fn anti_alias_response() {
        let filter = Biquad::anti_alias(0.5);
        approx::assert_abs_diff_eq!(gain_at(&filter, 0.0), 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(gain_at(&filter, std::f64::consts::PI), 0.0, epsilon = 1e-12);
        // Q slightly above Butterworth
        let at_cutoff = gain_at(&filter, std::f64::consts::FRAC_PI_2);
        approx::assert_abs_diff_eq!(at_cutoff, 0.95, epsilon = 1e-9);
    }

    #[test]
    fn output_lengths() {
        let mut resampler = Resampler::new(1024);
        let frame = [0.1f32; 1024];
        for (factor, expected) in [(0.5, 512), (0.7, 717), (1.0, 1024), (1.5, 1535), (2.0, 2047)] {
            resampler.set_factor(factor);
            assert_eq!(resampler.process(&frame).len(), expected, "factor {factor}");
            assert_eq!(resampler.output().len(), expected);
        }
    }

    #[test]
    fn factor_is_clamped() {
        let mut resampler = Resampler::new(256);
        resampler.set_factor(0.1);
        assert_eq!(resampler.factor(), 0.5);
        resampler.set_factor(9.0);
        assert_eq!(resampler.factor(), 2.0);
        resampler.set_factor(f64::NAN);
        assert!(resampler.factor().is_finite());
    }

    #[test]
    fn upsampled_ramp_interpolates() {
        let mut resampler = Resampler::new(128);
        resampler.set_factor(2.0);
        let ramp: Vec<f64> = (0..128).map(|i| i as f64).collect();
        let out = resampler.process(&ramp);
        assert_eq!(out.len(), 255);
        for (i, y) in out.iter().enumerate() {
            approx::assert_abs_diff_eq!(*y, i as f64 / 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn downsampled_dc_is_kept() {
        let mut resampler = Resampler::new(1024);
        resampler.set_factor(0.5);
        let out = resampler.process(&[0.25f32; 1024]);
        // after the filter settles
        for y in &out[64..] {
            approx::assert_abs_diff_eq!(*y, 0.25, epsilon = 1e-6);
        }
    }
}
