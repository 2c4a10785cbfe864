//! TimeWarp - plays an element faster or slower.
//!
//! Uses linear interpolation between neighbouring source frames, with a
//! fractional source position carried from one render to the next.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{silence_outside, Pe, ProcessingElement, RenderCursor};

/// Source frames pulled per read when more input is needed.
const FETCH_FRAMES: usize = 256;

/// Plays `source` at `rate` times its speed. A rate below 1 slows it down
/// and lengthens it; pitch changes with speed.
///
/// The source is read strictly forward, so a time warp must sit upstream of
/// any other stateful element in a chain, and must itself be rendered
/// contiguously.
pub struct TimeWarp {
    source: Pe,
    rate: f64,
    channels: usize,
    cursor: RenderCursor,
    /// Source position of the next output frame, relative to the origin.
    position: f64,
    /// Interleaved source frames starting at `held_start`.
    held: Vec<f32>,
    held_start: i64,
}

impl TimeWarp {
    pub fn new(source: impl Into<Pe>, rate: f64) -> Result<Self> {
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(Error::config(format!("time warp rate must be positive, got {rate}")));
        }
        let source = source.into();
        let channels = source.channel_count();
        Ok(Self {
            source,
            rate,
            channels,
            cursor: RenderCursor::new("TimeWarp"),
            position: 0.0,
            held: Vec::new(),
            held_start: 0,
        })
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Frame at which output and source line up.
    fn origin(&self) -> i64 {
        self.source.extent().start().unwrap_or(0)
    }

    #[inline]
    fn held_frames(&self) -> usize {
        self.held.len() / self.channels
    }

    /// Make sure source frames up to (excluding) `until` are held.
    fn fetch_to(&mut self, until: i64) -> Result<()> {
        let have = self.held_start + self.held_frames() as i64;
        if until <= have {
            return Ok(());
        }
        let frames = ((until - have) as usize).max(FETCH_FRAMES);
        let block = self.source.render_window(have, frames)?;
        self.held.extend_from_slice(block.samples());
        Ok(())
    }

    /// Drop held frames before `from`.
    fn discard_before(&mut self, from: i64) {
        let drop = (from - self.held_start).clamp(0, self.held_frames() as i64) as usize;
        self.held.drain(..drop * self.channels);
        self.held_start += drop as i64;
    }
}

impl ProcessingElement for TimeWarp {
    fn extent(&self) -> Extent {
        let source = self.source.extent();
        let origin = self.origin();
        let end = source
            .end()
            .map(|e| origin + ((e - origin) as f64 / self.rate).ceil() as i64);
        Extent::new(source.start(), end)
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let first = self.cursor.position().is_none();
        self.cursor.advance(start, count)?;

        let origin = self.origin();
        if first {
            self.position = (start - origin).max(0) as f64 * self.rate;
            self.held.clear();
            self.held_start = origin + self.position.floor() as i64;
        }

        let mut out = Buffer::zeros(self.channels, count);
        for i in 0..count {
            if start + (i as i64) < origin {
                continue;
            }
            let whole = self.position.floor();
            let frac = (self.position - whole) as f32;
            let index = origin + whole as i64;
            self.fetch_to(index + 2)?;

            let base = (index - self.held_start) as usize * self.channels;
            for ch in 0..self.channels {
                let a = self.held[base + ch];
                let b = self.held[base + self.channels + ch];
                out.set(i, ch, a + frac * (b - a));
            }
            self.position += self.rate;
        }

        self.discard_before(origin + self.position.floor() as i64);
        silence_outside(&mut out, &self.extent(), start);
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.cursor.reset();
        self.held.clear();
        self.position = 0.0;
    }
}
