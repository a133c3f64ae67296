//! Frame assembly and overlap-add reconstruction with two reused frame buffers.
//!
//! A frame of `n` blocks is built from the block stream twice, once in the "pair" slot
//! and once in the "odd" slot, shifted by half a frame. Both cursors are derived from
//! the block counter modulo `n` rounded up to even:
//!
//! ```text
//!   counter   0 1 2 3 4 5 6 7 8 9 ...
//!   pair      0 1 2 3 4 5 6 7 0 1 ...   (n = 8)
//!   odd       4 5 6 7 0 1 2 3 4 5 ...
//! ```
//!
//! A slot is complete when its cursor reaches `n - 1`. Reconstruction only adds up to
//! unity for an even `n`: with an odd block count the middle block of each period
//! belongs to a single slot and the output is amplitude modulated.

use std::f64::consts::PI;

use crate::{
    buffer::*,
    condition::FrameLayout,
    constants::BLOCK_SIZE,
};

/// One block as delivered by the host.
pub type Block = [f32; BLOCK_SIZE];

#[derive(Debug, Clone)]
pub struct Frame {
    buffer: Box<[f32]>,
}

deref_buffer!(Frame, f32);

impl Frame {
    pub fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len].into_boxed_slice(),
        }
    }
}

/// Which of the two overlapped slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Pair,
    Odd,
}

/// Position of one slot inside its frame, in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCursor {
    index: usize,
    num_blocks: usize,
}

impl BlockCursor {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
    /// First sample of the block inside the frame.
    #[inline]
    pub fn offset(&self) -> usize {
        self.index * BLOCK_SIZE
    }
    /// `false` only for the extra position of an odd block count.
    #[inline]
    pub fn is_inside(&self) -> bool {
        self.index < self.num_blocks
    }
    /// The block at this cursor is the last one of the frame.
    #[inline]
    pub fn completes_frame(&self) -> bool {
        self.index + 1 == self.num_blocks
    }
}

/// Read/write cursors of both slots for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    pub pair: BlockCursor,
    pub odd: BlockCursor,
}

impl Cursors {
    pub fn get(&self, side: Side) -> BlockCursor {
        match side {
            Side::Pair => self.pair,
            Side::Odd => self.odd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapSchedule {
    num_blocks: usize,
    modulus: usize,
}

impl OverlapSchedule {
    pub fn new(layout: &FrameLayout) -> Self {
        Self {
            num_blocks: layout.num_blocks(),
            modulus: layout.modulus(),
        }
    }

    pub fn cursors(&self, counter: u64) -> Cursors {
        let pair = (counter % self.modulus as u64) as usize;
        let odd = (pair + self.modulus / 2) % self.modulus;
        Cursors {
            pair: BlockCursor {
                index: pair,
                num_blocks: self.num_blocks,
            },
            odd: BlockCursor {
                index: odd,
                num_blocks: self.num_blocks,
            },
        }
    }
}

/// `sin²(π·n/N)` for every position of the frame.
#[derive(Debug, Clone)]
pub struct HannWindow {
    buffer: Box<[f32]>,
}

deref_buffer!(HannWindow, f32);

impl HannWindow {
    pub fn new(frame_size: usize) -> Self {
        let buffer = (0..frame_size)
            .map(|n| {
                let s = (PI * n as f64 / frame_size as f64).sin();
                (s * s) as f32
            })
            .collect();
        Self { buffer }
    }

    /// Positions outside the frame weigh nothing.
    #[inline]
    pub fn weight(&self, position: usize) -> f32 {
        self.buffer.get(position).copied().unwrap_or(0.0)
    }
}

/// Analysis frame and its reconstruction.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    pub input: Frame,
    pub synth: Frame,
}

impl FrameSlot {
    fn new(frame_size: usize) -> Self {
        Self {
            input: Frame::new(frame_size),
            synth: Frame::new(frame_size),
        }
    }

    fn write(&mut self, cursor: BlockCursor, block: &Block) {
        if !cursor.is_inside() {
            return;
        }
        let offset = cursor.offset();
        for (dst, &src) in self.input[offset..offset + BLOCK_SIZE]
            .iter_mut()
            .zip(block)
        {
            *dst = if src.is_finite() { src } else { 0.0 };
        }
    }

    #[inline]
    fn synth_at(&self, position: usize) -> f32 {
        self.synth.get(position).copied().unwrap_or(0.0)
    }
}

/// Frame assembler and overlap-add compositor.
#[derive(Debug, Clone)]
pub struct OverlapAdd {
    schedule: OverlapSchedule,
    window: HannWindow,
    pair: FrameSlot,
    odd: FrameSlot,
    pair_block: Block,
    odd_block: Block,
}

impl OverlapAdd {
    pub fn new(layout: &FrameLayout) -> Self {
        Self {
            schedule: OverlapSchedule::new(layout),
            window: HannWindow::new(layout.frame_size()),
            pair: FrameSlot::new(layout.frame_size()),
            odd: FrameSlot::new(layout.frame_size()),
            pair_block: [0.0; BLOCK_SIZE],
            odd_block: [0.0; BLOCK_SIZE],
        }
    }

    /// Store `input` in both slots and mix the current reconstruction into `output`.
    ///
    /// The output is read before any slot is re-analyzed, so the caller must run the
    /// analysis of completed slots only after this returns.
    pub fn ingest(&mut self, counter: u64, input: &Block, output: &mut Block) -> Cursors {
        let cursors = self.schedule.cursors(counter);
        self.pair.write(cursors.pair, input);
        self.odd.write(cursors.odd, input);
        self.compose(cursors, output);
        cursors
    }

    fn compose(&mut self, cursors: Cursors, output: &mut Block) {
        let pair_offset = cursors.pair.offset();
        let odd_offset = cursors.odd.offset();
        for i in 0..BLOCK_SIZE {
            let pair = self.pair.synth_at(pair_offset + i);
            let odd = self.odd.synth_at(odd_offset + i);
            output[i] = self.window.weight(pair_offset + i) * pair
                + self.window.weight(odd_offset + i) * odd;
            self.pair_block[i] = pair;
            self.odd_block[i] = odd;
        }
    }

    pub fn slot(&self, side: Side) -> &FrameSlot {
        match side {
            Side::Pair => &self.pair,
            Side::Odd => &self.odd,
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut FrameSlot {
        match side {
            Side::Pair => &mut self.pair,
            Side::Odd => &mut self.odd,
        }
    }

    /// Un-weighted synth samples read for the last output block, pair then odd.
    pub fn debug_blocks(&self) -> (&Block, &Block) {
        (&self.pair_block, &self.odd_block)
    }

    pub fn window(&self) -> &HannWindow {
        &self.window
    }

    pub fn schedule(&self) -> &OverlapSchedule {
        &self.schedule
    }
}
