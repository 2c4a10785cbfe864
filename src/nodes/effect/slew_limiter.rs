//! Slew rate limiter effect

use crate::buffer::Buffer;
use crate::dsp::slew;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{ProcessContext, Pe, ProcessingElement, RenderCursor};

/// A slew rate limiter that smooths sudden changes in audio
///
/// Useful for:
/// - Smoothing control signals
/// - Creating portamento/glide effects
/// - Reducing harsh transients
pub struct SlewLimiter {
    source: Pe,
    /// Maximum change per sample
    rate: f32,
    /// Last output value per channel
    last: Vec<f32>,
    cursor: RenderCursor,
}

impl SlewLimiter {
    /// Create a new slew limiter with the given rate per sample
    ///
    /// A rate of 1.0 means the signal can change by at most 1.0 per sample.
    /// Lower values = more smoothing.
    pub fn new(source: impl Into<Pe>, rate: f32) -> Self {
        let source = source.into();
        let channels = source.channel_count();
        Self {
            source,
            rate: rate.abs(),
            last: vec![0.0; channels],
            cursor: RenderCursor::new("SlewLimiter"),
        }
    }

    /// Create with a rate specified in units per second
    ///
    /// For example, `from_rate_per_second(&ctx, src, 1000.0)` at 48kHz means
    /// the signal can change by ~0.02 per sample.
    pub fn from_rate_per_second(ctx: &ProcessContext, source: impl Into<Pe>, rate: f32) -> Self {
        Self::new(source, rate / ctx.sample_rate as f32)
    }

    #[inline]
    pub fn rate(&self) -> f32 {
        self.rate
    }
}

impl ProcessingElement for SlewLimiter {
    fn extent(&self) -> Extent {
        self.source.extent()
    }

    fn channel_count(&self) -> usize {
        self.last.len()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.cursor.advance(start, count)?;
        let mut out = self.source.render_window(start, count)?;

        let max_delta = self.rate;
        for frame in 0..count {
            for (ch, last) in self.last.iter_mut().enumerate() {
                *last = slew(*last, out.get(frame, ch), max_delta);
                out.set(frame, ch, *last);
            }
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.cursor.reset();
        self.last.iter_mut().for_each(|l| *l = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::nodes::source::Constant;

    #[test]
    fn step_becomes_a_ramp() {
        let mut sl = SlewLimiter::new(Constant::new(1.0), 0.25);
        assert_eq!(sl.render(0, 6).unwrap().samples(), &[0.25, 0.5, 0.75, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn state_carries_across_blocks() {
        let ctx = ProcessContext::new(10);
        let mut sl = SlewLimiter::from_rate_per_second(&ctx, Constant::new(-1.0), 5.0);
        assert_eq!(sl.rate(), 0.5);
        assert_eq!(sl.render(0, 1).unwrap().samples(), &[-0.5]);
        assert_eq!(sl.render(1, 2).unwrap().samples(), &[-1.0, -1.0]);
    }

    #[test]
    fn rejects_non_contiguous_renders() {
        let mut sl = SlewLimiter::new(Constant::new(1.0), 0.25);
        sl.render(0, 2).unwrap();
        assert!(matches!(
            sl.render(1, 2),
            Err(Error::NonContiguous { expected: 2, actual: 1, .. })
        ));
        assert_eq!(sl.render(2, 3).unwrap().samples(), &[0.75, 1.0, 1.0]);
    }
}
