use crate::{
    condition::{Condition, ConfigError, FrameLayout},
    constants::BLOCK_SIZE,
    control::{ControlReader, ControlSnapshot},
    overlap::{Block, OverlapAdd, Side},
    telemetry::{self, Heartbeat, TelemetryReceiver, TelemetrySender},
    vocoder::{FrameReport, Vocoder},
};

/// Seconds of rendered audio between two heartbeats.
const HEARTBEAT_INTERVAL: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Buffer length {actual} is not a multiple of the {expected}-sample block")]
    BlockLength { expected: usize, actual: usize },
    #[error("Input has {input} samples but output has {output}")]
    LengthMismatch { input: usize, output: usize },
}

/// Block-synchronous LPC vocoder for one audio stream.
pub struct Engine {
    pub condition: Condition,
    layout: FrameLayout,
    overlap: OverlapAdd,
    vocoder: Vocoder,
    controls: ControlReader,
    /// Controls used for the last analyzed frame
    current: ControlSnapshot,
    telemetry: Option<TelemetrySender>,
    counter: u64,
    last_heartbeat: f64,
}

impl Engine {
    pub fn new(condition: &Condition, controls: ControlReader) -> Result<Self, ConfigError> {
        let layout = condition.layout()?;
        log::info!(
            "{} Hz, {} samples per frame ({:.1} ms, requested {:.1} ms), {} blocks, {} overlapping",
            layout.sample_rate(),
            layout.frame_size(),
            layout.frame_duration() * 1000.0,
            condition.get_frame_duration() * 1000.0,
            layout.num_blocks(),
            layout.overlap_blocks()
        );
        if layout.num_blocks() % 2 == 1 {
            log::warn!(
                "Odd number of blocks per frame ({}): overlap-add will not sum to unity",
                layout.num_blocks()
            );
        }

        Ok(Self {
            condition: condition.clone(),
            overlap: OverlapAdd::new(&layout),
            vocoder: Vocoder::new(&layout, condition.get_noise_seed()),
            current: controls.snapshot(),
            controls,
            layout,
            telemetry: None,
            counter: 0,
            last_heartbeat: 0.0,
        })
    }

    /// Start sending frame snapshots and heartbeats. Replaces any previous receiver.
    pub fn enable_telemetry(&mut self) -> TelemetryReceiver {
        let capacity = self.condition.get_telemetry_capacity();
        log::debug!("Telemetry enabled, {capacity} snapshots in flight");
        let (sender, receiver) = telemetry::channel(capacity, self.layout.frame_size(), BLOCK_SIZE);
        self.telemetry = Some(sender);
        receiver
    }

    /// Render one block. Output lags input by one frame.
    pub fn process_block(&mut self, input: &Block, output: &mut Block) {
        let cursors = self.overlap.ingest(self.counter, input, output);

        let mut pair_completed = false;
        for side in [Side::Pair, Side::Odd] {
            if !cursors.get(side).completes_frame() {
                continue;
            }
            self.current = self.controls.snapshot();
            let slot = self.overlap.slot_mut(side);
            self.vocoder.process(&slot.input, &mut slot.synth, &self.current);
            pair_completed |= side == Side::Pair;
        }

        self.counter += 1;
        let time = self.time();

        if let Some(telemetry) = self.telemetry.as_mut() {
            if pair_completed {
                let counter = self.counter;
                let overlap = &self.overlap;
                let report = self.vocoder.report();
                telemetry.send_frame(|snapshot| {
                    snapshot.counter = counter;
                    snapshot.pair.copy_from_slice(&overlap.slot(Side::Pair).synth);
                    snapshot.odd.copy_from_slice(&overlap.slot(Side::Odd).synth);
                    let (pair_block, odd_block) = overlap.debug_blocks();
                    snapshot.pair_block.copy_from_slice(pair_block);
                    snapshot.odd_block.copy_from_slice(odd_block);
                    snapshot.report = *report;
                });
            }

            if time - self.last_heartbeat > HEARTBEAT_INTERVAL {
                self.last_heartbeat = time;
                telemetry.send_heartbeat(Heartbeat {
                    time,
                    counter: self.counter,
                });
            }
        }
    }

    /// Render any number of whole blocks.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> Result<(), EngineError> {
        if input.len() != output.len() {
            return Err(EngineError::LengthMismatch {
                input: input.len(),
                output: output.len(),
            });
        }
        if input.len() % BLOCK_SIZE != 0 {
            return Err(EngineError::BlockLength {
                expected: BLOCK_SIZE,
                actual: input.len(),
            });
        }

        for (input, output) in input
            .chunks_exact(BLOCK_SIZE)
            .zip(output.chunks_exact_mut(BLOCK_SIZE))
        {
            let actual = input.len();
            let input: &Block = input.try_into().map_err(|_| EngineError::BlockLength {
                expected: BLOCK_SIZE,
                actual,
            })?;
            let output: &mut Block = output.try_into().map_err(|_| EngineError::BlockLength {
                expected: BLOCK_SIZE,
                actual,
            })?;
            self.process_block(input, output);
        }
        Ok(())
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Blocks rendered so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Rendered time in seconds.
    pub fn time(&self) -> f64 {
        (self.counter * BLOCK_SIZE as u64) as f64 / self.layout.sample_rate() as f64
    }

    /// Parameters of the last analyzed frame, either slot.
    pub fn report(&self) -> &FrameReport {
        self.vocoder.report()
    }

    pub fn controls(&self) -> &ControlSnapshot {
        &self.current
    }

    pub fn telemetry(&self) -> Option<&TelemetrySender> {
        self.telemetry.as_ref()
    }

    pub fn overlap(&self) -> &OverlapAdd {
        &self.overlap
    }

    pub fn vocoder(&self) -> &Vocoder {
        &self.vocoder
    }
}
