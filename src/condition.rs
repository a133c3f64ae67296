//! Initialization parameters of the vocoder and the frame layout derived from them.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BLOCK_SIZE, DEFAULT_FRAME_DURATION, DEFAULT_SAMPLING_FREQUENCY, MAX_FRAME_BLOCKS,
};

/// Error while deriving the frame layout from a [`Condition`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Sampling frequency must be positive.
    #[error("Invalid sampling frequency: {0}")]
    InvalidSampleRate(usize),
    /// Frame duration must be a positive, finite number of seconds.
    #[error("Invalid frame duration: {0}")]
    InvalidFrameDuration(f64),
    /// The rounded frame would not contain a single block.
    #[error("Frame of {frame_duration} s at {sample_rate} Hz is shorter than one block")]
    FrameTooShort {
        frame_duration: f64,
        sample_rate: usize,
    },
    /// The rounded frame would exceed [`MAX_FRAME_BLOCKS`].
    #[error("Frame of {frame_duration} s at {sample_rate} Hz is too long")]
    FrameTooLong {
        frame_duration: f64,
        sample_rate: usize,
    },
}

/// Parameters fixed for the lifetime of an audio session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    /// Sampling frequency (Hz)
    sampling_frequency: usize,
    /// Requested analysis window length (seconds)
    frame_duration: f64,
    /// Seed of the noise excitation generator
    noise_seed: u64,
    /// Number of diagnostic snapshots that may be in flight at once
    telemetry_capacity: usize,
}

impl Default for Condition {
    fn default() -> Self {
        Self {
            sampling_frequency: DEFAULT_SAMPLING_FREQUENCY,
            frame_duration: DEFAULT_FRAME_DURATION,
            noise_seed: 0x5eed_1c0d_u64,
            telemetry_capacity: 4,
        }
    }
}

impl Condition {
    /// Set sampling frequency (Hz), 1 <= i
    pub fn set_sampling_frequency(&mut self, i: usize) {
        self.sampling_frequency = i.max(1);
    }
    /// Get sampling frequency
    pub fn get_sampling_frequency(&self) -> usize {
        self.sampling_frequency
    }

    /// Set requested frame duration in seconds.
    /// Note: Default value is 0.02.
    pub fn set_frame_duration(&mut self, f: f64) {
        self.frame_duration = f;
    }
    /// Get requested frame duration in seconds
    pub fn get_frame_duration(&self) -> f64 {
        self.frame_duration
    }

    /// Set seed of the noise excitation
    pub fn set_noise_seed(&mut self, seed: u64) {
        self.noise_seed = seed;
    }
    /// Get seed of the noise excitation
    pub fn get_noise_seed(&self) -> u64 {
        self.noise_seed
    }

    /// Set number of diagnostic snapshots in flight, 1 <= i
    pub fn set_telemetry_capacity(&mut self, i: usize) {
        self.telemetry_capacity = i.max(1);
    }
    /// Get number of diagnostic snapshots in flight
    pub fn get_telemetry_capacity(&self) -> usize {
        self.telemetry_capacity
    }

    pub fn layout(&self) -> Result<FrameLayout, ConfigError> {
        FrameLayout::new(self.sampling_frequency, self.frame_duration)
    }
}

/// Frame geometry shared by the assembler, the analysis chain and the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    sample_rate: usize,
    frame_size: usize,
    num_blocks: usize,
}

impl FrameLayout {
    /// Round the requested duration so the frame holds a whole number of blocks.
    pub fn new(sample_rate: usize, frame_duration: f64) -> Result<Self, ConfigError> {
        if sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        if !frame_duration.is_finite() || frame_duration <= 0.0 {
            return Err(ConfigError::InvalidFrameDuration(frame_duration));
        }

        let requested = frame_duration * sample_rate as f64;
        let blocks = (requested / BLOCK_SIZE as f64).round();
        if blocks < 1.0 {
            return Err(ConfigError::FrameTooShort {
                frame_duration,
                sample_rate,
            });
        }
        let too_long = ConfigError::FrameTooLong {
            frame_duration,
            sample_rate,
        };
        if !blocks.is_finite() || blocks > MAX_FRAME_BLOCKS as f64 {
            return Err(too_long);
        }
        let num_blocks = blocks as usize;
        let frame_size = num_blocks.checked_mul(BLOCK_SIZE).ok_or(too_long)?;

        Ok(Self {
            sample_rate,
            frame_size,
            num_blocks,
        })
    }

    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }
    /// Samples per frame, a multiple of [`BLOCK_SIZE`].
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
    /// Blocks per frame (8 at 48 kHz with a 20 ms window).
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }
    /// Blocks shared by two consecutive frames.
    pub fn overlap_blocks(&self) -> usize {
        self.num_blocks / 2
    }
    /// Block count rounded up to the next even number.
    pub fn modulus(&self) -> usize {
        self.num_blocks + self.num_blocks % 2
    }
    /// Frame duration actually used, after rounding to whole blocks.
    pub fn frame_duration(&self) -> f64 {
        self.frame_size as f64 / self.sample_rate as f64
    }
}
