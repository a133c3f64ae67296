//! Best-effort diagnostics pushed out of the audio callback.
//!
//! Frame snapshots are preallocated and travel in a loop: the receiver hands them back
//! through a second queue once read, so the sending side never allocates. When the
//! consumer falls behind, new snapshots are dropped and counted.

use rtrb::{Consumer, Producer, RingBuffer};
use serde::Serialize;

use crate::vocoder::FrameReport;

/// Frame buffers and parameters at the completion of a pair frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    /// Block counter after the completing block
    pub counter: u64,
    /// Reconstructed pair frame
    pub pair: Vec<f32>,
    /// Reconstructed odd frame
    pub odd: Vec<f32>,
    /// Un-weighted pair samples of the last output block
    pub pair_block: Vec<f32>,
    /// Un-weighted odd samples of the last output block
    pub odd_block: Vec<f32>,
    pub report: FrameReport,
}

impl FrameSnapshot {
    fn new(frame_size: usize, block_size: usize) -> Self {
        Self {
            counter: 0,
            pair: vec![0.0; frame_size],
            odd: vec![0.0; frame_size],
            pair_block: vec![0.0; block_size],
            odd_block: vec![0.0; block_size],
            report: FrameReport::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Heartbeat {
    /// Rendered time in seconds
    pub time: f64,
    pub counter: u64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Telemetry {
    Frame(Box<FrameSnapshot>),
    Heartbeat(Heartbeat),
}

/// Create a telemetry channel holding up to `capacity` unread frame snapshots.
pub fn channel(
    capacity: usize,
    frame_size: usize,
    block_size: usize,
) -> (TelemetrySender, TelemetryReceiver) {
    let capacity = capacity.max(1);
    let (events, events_rx) = RingBuffer::new(capacity + 2);
    let (mut free, free_rx) = RingBuffer::new(capacity);
    for _ in 0..capacity {
        if free.push(Box::new(FrameSnapshot::new(frame_size, block_size))).is_err() {
            break;
        }
    }
    (
        TelemetrySender {
            events,
            free: free_rx,
            spare: None,
            dropped: 0,
        },
        TelemetryReceiver {
            events: events_rx,
            free,
        },
    )
}

/// Real-time side. Never blocks and never allocates.
#[derive(Debug)]
pub struct TelemetrySender {
    events: Producer<Telemetry>,
    free: Consumer<Box<FrameSnapshot>>,
    /// Snapshot whose push failed, reused for the next frame
    spare: Option<Box<FrameSnapshot>>,
    dropped: u64,
}

impl TelemetrySender {
    /// Fill a free snapshot and queue it. Returns `false` if it was dropped.
    pub fn send_frame(&mut self, fill: impl FnOnce(&mut FrameSnapshot)) -> bool {
        let Some(mut snapshot) = self.spare.take().or_else(|| self.free.pop().ok()) else {
            self.dropped += 1;
            return false;
        };
        fill(&mut snapshot);
        match self.events.push(Telemetry::Frame(snapshot)) {
            Ok(()) => true,
            Err(rtrb::PushError::Full(message)) => {
                if let Telemetry::Frame(snapshot) = message {
                    self.spare = Some(snapshot);
                }
                self.dropped += 1;
                false
            }
        }
    }

    pub fn send_heartbeat(&mut self, heartbeat: Heartbeat) -> bool {
        if self.events.push(Telemetry::Heartbeat(heartbeat)).is_ok() {
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    /// Messages dropped so far because the receiver fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Non-real-time side.
#[derive(Debug)]
pub struct TelemetryReceiver {
    events: Consumer<Telemetry>,
    free: Producer<Box<FrameSnapshot>>,
}

impl TelemetryReceiver {
    pub fn try_recv(&mut self) -> Option<Telemetry> {
        self.events.pop().ok()
    }

    /// Return a read snapshot to the sender's pool.
    pub fn recycle(&mut self, snapshot: Box<FrameSnapshot>) {
        // a full pool means the snapshot was not taken from it
        let _ = self.free.push(snapshot);
    }

    /// Receive everything queued, recycling frame snapshots after `f` has seen them.
    pub fn drain(&mut self, mut f: impl FnMut(&Telemetry)) -> usize {
        let mut count = 0;
        while let Some(message) = self.try_recv() {
            f(&message);
            count += 1;
            if let Telemetry::Frame(snapshot) = message {
                self.recycle(snapshot);
            }
        }
        count
    }
}
