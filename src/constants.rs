/// Number of samples in one host render block.
pub const BLOCK_SIZE: usize = 128;

/// Order of the all-pole vocal tract model.
pub const LPC_ORDER: usize = 12;

/// Highest fundamental frequency searched by the pitch detector.
pub const MAX_F0: f64 = 200.0;
/// Lowest fundamental frequency searched by the pitch detector.
pub const MIN_F0: f64 = 70.0;

/// 20 ms analysis window.
pub const DEFAULT_FRAME_DURATION: f64 = 0.02;
pub const DEFAULT_SAMPLING_FREQUENCY: usize = 48000;
/// Upper bound on blocks per frame, about 11 s at 48 kHz.
pub const MAX_FRAME_BLOCKS: usize = 4096;

pub const MIN_QUANTIZATION_BITS: u32 = 1;
pub const MAX_QUANTIZATION_BITS: u32 = 16;

pub const MIN_RESAMPLING_FACTOR: f32 = 0.5;
pub const MAX_RESAMPLING_FACTOR: f32 = 2.0;

/// Q of the anti-aliasing lowpass: almost no resonance peak, so the formant
/// structure of the frame is left alone.
pub const ANTI_ALIAS_Q: f64 = 0.95;

/// Hard ceiling applied by the synthesis filter (about +12 dBFS).
pub const OUTPUT_CEILING: f64 = 4.0;

/// Autocorrelation energy below this is treated as a silent frame.
pub const SILENCE_ENERGY: f64 = 1.0e-12;

pub const MIN_PITCH_PERIOD_SCALE: f32 = 0.1;
pub const MAX_PITCH_PERIOD_SCALE: f32 = 10.0;
