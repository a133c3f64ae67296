//! Real-time LPC vocoder.
//!
//! Audio arrives in blocks of [`constants::BLOCK_SIZE`] samples. Blocks are assembled
//! into two half-overlapping frames; whenever a frame is complete it is analyzed into
//! an all-pole vocal tract model and a pitch estimate, optionally modified, and
//! resynthesized from a pulse train or noise. The output is the Hann-weighted sum of
//! the two resynthesized frames.

mod buffer;

pub mod analysis;
pub mod condition;
pub mod constants;
pub mod control;
pub mod engine;
pub mod overlap;
pub mod telemetry;
pub mod transform;
pub mod vocoder;

pub use condition::{Condition, ConfigError, FrameLayout};
pub use control::{ControlReader, ControlSnapshot, ControlWriter, controls};
pub use engine::{Engine, EngineError};
pub use overlap::Block;
