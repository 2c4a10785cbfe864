//! Delay - shifts an element in time.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement};

/// Plays `source` `frames` later (earlier, if negative).
pub struct Delay {
    source: Pe,
    frames: i64,
}

impl Delay {
    pub fn new(source: impl Into<Pe>, frames: i64) -> Self {
        Self {
            source: source.into(),
            frames,
        }
    }

    #[inline]
    pub fn frames(&self) -> i64 {
        self.frames
    }
}

impl ProcessingElement for Delay {
    fn extent(&self) -> Extent {
        self.source.extent().offset(self.frames)
    }

    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.source.render_window(start - self.frames, count)
    }

    fn reset(&mut self) {
        self.source.reset()
    }
}
