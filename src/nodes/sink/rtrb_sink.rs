//! Ring buffer sink for custom audio processing

use std::time::{Duration, Instant};

use rtrb::Producer;
use tracing::trace;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::node::ProcessContext;

use super::Sink;

/// What [`RtrbSink`] does when the ring has no room for a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Backpressure {
    /// Wait for the consumer to make room.
    #[default]
    Block,
    /// Drop the block.
    Skip,
}

/// A sink that pushes interleaved audio into an rtrb ring buffer
///
/// Useful for:
/// - Sending audio to another thread
/// - Feeding a device callback
/// - Recording/analysis
pub struct RtrbSink {
    producer: Producer<f32>,
    channels: usize,
    backpressure: Backpressure,
    dropped: u64,
}

impl RtrbSink {
    /// Create a sink that writes `channels` interleaved channels to the
    /// given producer. Blocks are mapped to that layout on write.
    pub fn new(producer: Producer<f32>, channels: usize) -> Self {
        Self {
            producer,
            channels: channels.max(1),
            backpressure: Backpressure::default(),
            dropped: 0,
        }
    }

    pub fn mono(producer: Producer<f32>) -> Self {
        Self::new(producer, 1)
    }

    pub fn stereo(producer: Producer<f32>) -> Self {
        Self::new(producer, 2)
    }

    pub fn with_backpressure(mut self, backpressure: Backpressure) -> Self {
        self.backpressure = backpressure;
        self
    }

    /// Returns how many sample slots are available
    #[inline]
    pub fn available(&self) -> usize {
        self.producer.slots()
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Blocks dropped under [`Backpressure::Skip`].
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Wait until `needed` slots are free, or fail once the consumer is gone.
    fn wait_for(&self, needed: usize) -> Result<()> {
        let needed = needed.min(self.producer.buffer().capacity());
        while self.producer.slots() < needed {
            if self.producer.is_abandoned() {
                return Err(Error::Device("ring buffer consumer was dropped".into()));
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    /// Wait up to `timeout` for the consumer to read everything. Returns
    /// whether the ring is empty.
    pub fn drain(&self, timeout: Duration) -> bool {
        let capacity = self.producer.buffer().capacity();
        let deadline = Instant::now() + timeout;
        while self.producer.slots() < capacity {
            if self.producer.is_abandoned() || Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

impl Sink for RtrbSink {
    fn open(&mut self, _ctx: &ProcessContext, channels: usize) -> Result<()> {
        if channels != self.channels {
            trace!(from = channels, to = self.channels, "mapping channels into ring");
        }
        self.dropped = 0;
        Ok(())
    }

    fn write(&mut self, block: &Buffer) -> Result<()> {
        let needed = block.frames() * self.channels;
        match self.backpressure {
            Backpressure::Skip if self.producer.slots() < needed => {
                self.dropped += 1;
                return Ok(());
            }
            Backpressure::Skip => {}
            Backpressure::Block => {}
        }

        // Interleave in chunks no larger than the ring
        let capacity_frames = (self.producer.buffer().capacity() / self.channels).max(1);
        let mut frame = 0;
        while frame < block.frames() {
            let frames = capacity_frames.min(block.frames() - frame);
            self.wait_for(frames * self.channels)?;
            for i in frame..frame + frames {
                for ch in 0..self.channels {
                    let _ = self.producer.push(block.mapped(i, ch));
                }
            }
            frame += frames;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_realtime(&self) -> bool {
        true
    }
}
