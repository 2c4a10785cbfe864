//! Crop and Slice - cut a window out of an element.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement};

/// Restricts `source` to a window. Outside the window the output is silent.
///
/// Cropping does not touch the source's own timing: a stateful source still
/// sees the absolute frames it is asked for.
pub struct Crop {
    source: Pe,
    window: Extent,
}

impl Crop {
    pub fn new(source: impl Into<Pe>, window: Extent) -> Self {
        Self {
            source: source.into(),
            window,
        }
    }

    /// Crop to `[start, end)`.
    pub fn range(source: impl Into<Pe>, start: i64, end: i64) -> Self {
        Self::new(source, Extent::finite(start, end))
    }
}

impl ProcessingElement for Crop {
    fn extent(&self) -> Extent {
        self.source.extent().intersection(&self.window)
    }

    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.source.render_within(&self.window, start, count)
    }

    fn reset(&mut self) {
        self.source.reset()
    }
}

/// The part `[start, start + duration)` of `source`, moved to begin at
/// frame 0.
pub struct Slice {
    source: Pe,
    start: i64,
    duration: i64,
}

impl Slice {
    pub fn new(source: impl Into<Pe>, start: i64, duration: i64) -> Self {
        Self {
            source: source.into(),
            start,
            duration: duration.max(0),
        }
    }

    fn window(&self) -> Extent {
        Extent::finite(self.start, self.start + self.duration)
    }
}

impl ProcessingElement for Slice {
    fn extent(&self) -> Extent {
        self.source
            .extent()
            .intersection(&self.window())
            .offset(-self.start)
    }

    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let window = self.window();
        self.source.render_within(&window, start + self.start, count)
    }

    fn reset(&mut self) {
        self.source.reset()
    }
}
