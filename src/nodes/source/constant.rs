//! Constant and linear ramp generators.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::ProcessingElement;

/// A mono stream holding one value forever.
///
/// Mostly used as a control signal, e.g. a fixed gain or a trigger level.
#[derive(Clone, Copy, Debug)]
pub struct Constant {
    value: f32,
    extent: Extent,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            extent: Extent::unbounded(),
        }
    }

    /// Restrict the stream to `extent`; silence elsewhere.
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }
}

impl ProcessingElement for Constant {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = Buffer::zeros(1, count);
        if let Some((offset, frames)) = self.extent.overlap(start, count) {
            out.samples_mut()[offset..offset + frames].fill(self.value);
        }
        Ok(out)
    }
}

/// A mono linear ramp from `from` at the first frame of its extent towards
/// `to` at the end.
#[derive(Clone, Copy, Debug)]
pub struct Ramp {
    from: f32,
    to: f32,
    start: i64,
    duration: i64,
}

impl Ramp {
    /// Ramp over `[start, start + duration)`.
    pub fn new(from: f32, to: f32, start: i64, duration: i64) -> Self {
        Self {
            from,
            to,
            start,
            duration: duration.max(0),
        }
    }

    #[inline]
    fn value_at(&self, t: i64) -> f32 {
        let frac = (t - self.start) as f64 / self.duration as f64;
        (self.from as f64 + (self.to - self.from) as f64 * frac) as f32
    }
}

impl ProcessingElement for Ramp {
    fn extent(&self) -> Extent {
        Extent::finite(self.start, self.start + self.duration)
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = Buffer::zeros(1, count);
        if let Some((offset, frames)) = self.extent().overlap(start, count) {
            for i in offset..offset + frames {
                out.set(i, 0, self.value_at(start + i as i64));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_fills_any_window() {
        let mut c = Constant::new(0.25);
        assert_eq!(c.render(-1_000_000, 3).unwrap().samples(), &[0.25; 3]);
        assert_eq!(c.extent(), Extent::unbounded());
    }

    #[test]
    fn bounded_constant_is_silent_outside() {
        let mut c = Constant::new(1.0).with_extent(Extent::finite(2, 4));
        assert_eq!(c.render(0, 5).unwrap().samples(), &[0.0, 0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn ramp_is_linear_across_its_extent() {
        let mut r = Ramp::new(0.0, 1.0, 10, 4);
        assert_eq!(r.extent(), Extent::finite(10, 14));
        let out = r.render(9, 6).unwrap();
        assert_eq!(out.samples(), &[0.0, 0.0, 0.25, 0.5, 0.75, 0.0]);
    }
}
