//! Control parameters written from a non-real-time context and read by the audio callback.
//!
//! Every parameter lives in its own atomic slot. The writer publishes values with
//! last-write-wins semantics; the reader takes a [`ControlSnapshot`] once per frame and
//! never waits. Parameters are independent of each other, so a snapshot may mix an old
//! value of one parameter with a new value of another for at most one frame.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_PITCH_PERIOD_SCALE, MAX_QUANTIZATION_BITS, MAX_RESAMPLING_FACTOR, MIN_PITCH_PERIOD_SCALE,
    MIN_QUANTIZATION_BITS, MIN_RESAMPLING_FACTOR,
};

#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Values of all control parameters at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSnapshot {
    pub quantization_enabled: bool,
    /// Bits per reflection coefficient, 1 ..= 16
    pub quantization_bits: u32,
    pub reflection_reversal_enabled: bool,
    /// Vocal tract length factor, 0.5 ..= 2.0 (0.5 is a chipmunk voice, 1 is neutral)
    pub resampling_factor: f32,
    /// Voicing confidence above which pulse excitation is used, 0 ..= 1
    pub voiced_confidence_threshold: f32,
    /// Multiplier applied to the detected pitch period
    pub pitch_period_scale_factor: f32,
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        Self {
            quantization_enabled: false,
            quantization_bits: 2,
            reflection_reversal_enabled: false,
            resampling_factor: 1.0,
            voiced_confidence_threshold: 0.1,
            pitch_period_scale_factor: 1.0,
        }
    }
}

impl ControlSnapshot {
    /// Bring every parameter into its supported range.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            quantization_enabled: self.quantization_enabled,
            quantization_bits: self
                .quantization_bits
                .clamp(MIN_QUANTIZATION_BITS, MAX_QUANTIZATION_BITS),
            reflection_reversal_enabled: self.reflection_reversal_enabled,
            resampling_factor: clamp_finite(
                self.resampling_factor,
                MIN_RESAMPLING_FACTOR,
                MAX_RESAMPLING_FACTOR,
                defaults.resampling_factor,
            ),
            voiced_confidence_threshold: clamp_finite(
                self.voiced_confidence_threshold,
                0.0,
                1.0,
                defaults.voiced_confidence_threshold,
            ),
            pitch_period_scale_factor: clamp_finite(
                self.pitch_period_scale_factor,
                MIN_PITCH_PERIOD_SCALE,
                MAX_PITCH_PERIOD_SCALE,
                defaults.pitch_period_scale_factor,
            ),
        }
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

#[derive(Debug)]
struct Controls {
    quantization_enabled: AtomicBool,
    quantization_bits: AtomicU32,
    reflection_reversal_enabled: AtomicBool,
    resampling_factor: AtomicF32,
    voiced_confidence_threshold: AtomicF32,
    pitch_period_scale_factor: AtomicF32,
}

impl Controls {
    fn new(initial: ControlSnapshot) -> Self {
        let initial = initial.clamped();
        Self {
            quantization_enabled: AtomicBool::new(initial.quantization_enabled),
            quantization_bits: AtomicU32::new(initial.quantization_bits),
            reflection_reversal_enabled: AtomicBool::new(initial.reflection_reversal_enabled),
            resampling_factor: AtomicF32::new(initial.resampling_factor),
            voiced_confidence_threshold: AtomicF32::new(initial.voiced_confidence_threshold),
            pitch_period_scale_factor: AtomicF32::new(initial.pitch_period_scale_factor),
        }
    }
}

/// Create the writer/reader pair for one vocoder instance.
pub fn controls(initial: ControlSnapshot) -> (ControlWriter, ControlReader) {
    let shared = Arc::new(Controls::new(initial));
    (
        ControlWriter {
            shared: shared.clone(),
        },
        ControlReader { shared },
    )
}

/// Non-real-time side. There is exactly one writer per vocoder instance.
#[derive(Debug)]
pub struct ControlWriter {
    shared: Arc<Controls>,
}

impl ControlWriter {
    /// Enable or disable reflection coefficient quantization with the given bit depth.
    pub fn set_quantization(&self, enabled: bool, bits: u32) {
        let clamped = bits.clamp(MIN_QUANTIZATION_BITS, MAX_QUANTIZATION_BITS);
        if clamped != bits {
            log::warn!("Quantization bits {bits} out of range, using {clamped}");
        }
        log::debug!("quantization: enabled={enabled}, bits={clamped}");
        self.shared
            .quantization_bits
            .store(clamped, Ordering::Relaxed);
        self.shared
            .quantization_enabled
            .store(enabled, Ordering::Relaxed);
    }

    pub fn set_reflection_reversal(&self, enabled: bool) {
        log::debug!("reflection reversal: enabled={enabled}");
        self.shared
            .reflection_reversal_enabled
            .store(enabled, Ordering::Relaxed);
    }

    /// Set vocal tract length factor, 0.5 <= f <= 2.0
    pub fn set_resampling_factor(&self, f: f32) {
        let clamped = clamp_finite(f, MIN_RESAMPLING_FACTOR, MAX_RESAMPLING_FACTOR, 1.0);
        if clamped != f {
            log::warn!("Resampling factor {f} out of range, using {clamped}");
        }
        log::debug!("resampling factor: {clamped}");
        self.shared.resampling_factor.store(clamped);
    }

    /// Set voiced/unvoiced decision threshold, 0.0 <= f <= 1.0
    pub fn set_voiced_confidence_threshold(&self, f: f32) {
        let clamped = clamp_finite(f, 0.0, 1.0, 0.1);
        if clamped != f {
            log::warn!("Voicing threshold {f} out of range, using {clamped}");
        }
        log::debug!("voiced confidence threshold: {clamped}");
        self.shared.voiced_confidence_threshold.store(clamped);
    }

    /// Set pitch period multiplier, 0.1 <= f <= 10.0
    pub fn set_pitch_period_scale_factor(&self, f: f32) {
        let clamped = clamp_finite(f, MIN_PITCH_PERIOD_SCALE, MAX_PITCH_PERIOD_SCALE, 1.0);
        if clamped != f {
            log::warn!("Pitch period scale {f} out of range, using {clamped}");
        }
        log::debug!("pitch period scale factor: {clamped}");
        self.shared.pitch_period_scale_factor.store(clamped);
    }

    /// Publish every parameter of `snapshot`.
    pub fn apply(&self, snapshot: &ControlSnapshot) {
        self.set_quantization(snapshot.quantization_enabled, snapshot.quantization_bits);
        self.set_reflection_reversal(snapshot.reflection_reversal_enabled);
        self.set_resampling_factor(snapshot.resampling_factor);
        self.set_voiced_confidence_threshold(snapshot.voiced_confidence_threshold);
        self.set_pitch_period_scale_factor(snapshot.pitch_period_scale_factor);
    }
}

/// Real-time side: wait-free loads only.
#[derive(Debug)]
pub struct ControlReader {
    shared: Arc<Controls>,
}

impl ControlReader {
    pub fn snapshot(&self) -> ControlSnapshot {
        let shared = &*self.shared;
        ControlSnapshot {
            quantization_enabled: shared.quantization_enabled.load(Ordering::Relaxed),
            quantization_bits: shared.quantization_bits.load(Ordering::Relaxed),
            reflection_reversal_enabled: shared.reflection_reversal_enabled.load(Ordering::Relaxed),
            resampling_factor: shared.resampling_factor.load(),
            voiced_confidence_threshold: shared.voiced_confidence_threshold.load(),
            pitch_period_scale_factor: shared.pitch_period_scale_factor.load(),
        }
    }
}
