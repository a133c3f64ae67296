use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::buffer::rms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcitationKind {
    Pulses,
    Noise,
}

/// Source signal driving the synthesis filter, one frame at a time.
#[derive(Debug, Clone)]
pub struct Excitation {
    buffer: Vec<f64>,
    kind: ExcitationKind,
    pulse_train: PulseTrain,
    random: Random,
}

impl Excitation {
    pub fn new(frame_size: usize, seed: u64) -> Self {
        Self {
            buffer: vec![0.0; frame_size],
            kind: ExcitationKind::Noise,
            pulse_train: PulseTrain::new(),
            random: Random::new(seed),
        }
    }

    /// Unit impulses every `period` samples continuing the previous voiced frame's
    /// phase, scaled so the frame RMS equals `target`.
    pub fn voiced(&mut self, period: usize, target: f64) -> &[f64] {
        self.kind = ExcitationKind::Pulses;
        self.pulse_train.fill(&mut self.buffer, period.max(1), target);
        &self.buffer
    }

    /// Gaussian white noise scaled so the frame RMS equals `target`.
    pub fn unvoiced(&mut self, target: f64) -> &[f64] {
        self.kind = ExcitationKind::Noise;
        for pair in self.buffer.chunks_mut(2) {
            let (n0, n1) = self.random.normal_pair();
            pair[0] = n0;
            if let Some(second) = pair.get_mut(1) {
                *second = n1;
            }
        }
        let noise_rms = rms(&self.buffer);
        let scale = if noise_rms > 0.0 && target.is_finite() {
            target / noise_rms
        } else {
            0.0
        };
        self.buffer.iter_mut().for_each(|x| *x *= scale);
        &self.buffer
    }

    pub fn buffer(&self) -> &[f64] {
        &self.buffer
    }

    pub fn kind(&self) -> ExcitationKind {
        self.kind
    }

    /// Index of the first pulse of the next voiced frame.
    pub fn pulse_offset(&self) -> usize {
        self.pulse_train.offset
    }
}

#[derive(Debug, Clone)]
struct PulseTrain {
    offset: usize,
}

impl PulseTrain {
    fn new() -> Self {
        Self { offset: 0 }
    }

    fn fill(&mut self, buffer: &mut [f64], period: usize, target: f64) {
        let n = buffer.len();
        buffer.fill(0.0);
        if n == 0 {
            return;
        }
        if self.offset >= n {
            // the next pulse lies beyond this frame
            self.offset -= n;
            return;
        }

        let count = (n - 1 - self.offset) / period + 1;
        let amplitude = if target.is_finite() {
            target / (count as f64 / n as f64).sqrt()
        } else {
            0.0
        };
        let mut last = self.offset;
        for i in (self.offset..n).step_by(period) {
            buffer[i] = amplitude;
            last = i;
        }
        self.offset = last + period - n;
    }
}

/// Box-Muller transform over a seeded PCG stream.
#[derive(Debug, Clone)]
struct Random {
    rng: Pcg32,
}

impl Random {
    fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    fn normal_pair(&mut self) -> (f64, f64) {
        // (0, 1] keeps the logarithm finite
        let r1 = 1.0 - self.rng.random::<f64>();
        let r2 = self.rng.random::<f64>();
        let radius = (-2.0 * r1.ln()).sqrt();
        let (sin, cos) = (2.0 * PI * r2).sin_cos();
        (radius * cos, radius * sin)
    }
}
