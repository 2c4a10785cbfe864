//! In-memory sink.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::node::ProcessContext;

use super::Sink;

/// Collects every block into one buffer. Offline; mostly for tests and for
/// rendering sub-mixes ahead of time.
#[derive(Debug, Default)]
pub struct MemorySink {
    channels: usize,
    samples: Vec<f32>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written during the last session.
    pub fn buffer(&self) -> Buffer {
        Buffer::from_interleaved(self.channels.max(1), self.samples.clone())
    }

    pub fn into_buffer(self) -> Buffer {
        Buffer::from_interleaved(self.channels.max(1), self.samples)
    }

    /// Frames written so far.
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }
}

impl Sink for MemorySink {
    fn open(&mut self, _ctx: &ProcessContext, channels: usize) -> Result<()> {
        self.channels = channels;
        self.samples.clear();
        Ok(())
    }

    fn write(&mut self, block: &Buffer) -> Result<()> {
        self.samples.extend_from_slice(block.samples());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
