//! Loop - periodic repetition of a finite region.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement};

/// Repeats the region `[loop_start, loop_end)` of `source` forever, or a
/// fixed number of times.
///
/// Absolute frame `t` plays source frame
/// `loop_start + (t - loop_start) mod (loop_end - loop_start)`. Whenever
/// playback jumps inside the source (at every wrap, or on a random-access
/// render) the source is reset, so stateful sources restart cleanly.
pub struct Loop {
    source: Pe,
    loop_start: i64,
    length: i64,
    count: Option<u32>,
    /// One past the last source frame rendered.
    source_end: Option<i64>,
}

impl Loop {
    /// Loop the whole extent of `source`, which must be finite and non-empty.
    pub fn new(source: impl Into<Pe>) -> Result<Self> {
        let source = source.into();
        let extent = source.extent();
        match (extent.start(), extent.end()) {
            (Some(start), Some(end)) => Self::with_region(source, start, end),
            _ => Err(Error::Extent {
                operation: "looping",
                extent,
            }),
        }
    }

    /// Loop `[loop_start, loop_end)` of `source`.
    pub fn with_region(source: impl Into<Pe>, loop_start: i64, loop_end: i64) -> Result<Self> {
        if loop_end <= loop_start {
            return Err(Error::config(format!(
                "loop region [{loop_start}, {loop_end}) is empty"
            )));
        }
        Ok(Self {
            source: source.into(),
            loop_start,
            length: loop_end - loop_start,
            count: None,
            source_end: None,
        })
    }

    /// Stop after `count` repetitions. The extent becomes
    /// `[loop_start, loop_start + count * length)`.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Length of one repetition in frames.
    #[inline]
    pub fn length(&self) -> i64 {
        self.length
    }

    fn region(&self) -> Extent {
        Extent::finite(self.loop_start, self.loop_start + self.length)
    }
}

impl ProcessingElement for Loop {
    fn extent(&self) -> Extent {
        match self.count {
            Some(n) => Extent::finite(self.loop_start, self.loop_start + n as i64 * self.length),
            None => Extent::unbounded(),
        }
    }

    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = Buffer::zeros(self.source.channel_count(), count);
        let Some((offset, frames)) = self.extent().overlap(start, count) else {
            return Ok(out);
        };
        let region = self.region();

        // Split at every wrap so each source read stays inside the region.
        let mut done = offset;
        while done < offset + frames {
            let t = start + done as i64;
            let phase = (t - self.loop_start).rem_euclid(self.length);
            let local = self.loop_start + phase;
            let len = ((self.length - phase) as usize).min(offset + frames - done);

            if self.source_end.is_some_and(|end| end != local) {
                self.source.reset();
            }
            let part = self.source.render_within(&region, local, len)?;
            out.copy_from(&part, done);

            self.source_end = Some(local + len as i64);
            done += len;
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.source_end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::effect::TimeWarp;
    use crate::nodes::source::{ArraySource, Sine};
    use crate::ProcessContext;

    fn clip() -> Pe {
        Pe::new(ArraySource::mono(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
    }

    #[test]
    fn repeats_periodically() {
        let mut lp = Loop::new(clip()).unwrap();
        let period = clip().render(0, 5).unwrap();
        for k in [0i64, 1, 2, 7, 100] {
            assert_eq!(lp.render(k * 5, 5).unwrap(), period, "repetition {k}");
        }
    }

    #[test]
    fn wraps_inside_a_block_and_before_the_start() {
        let mut lp = Loop::new(clip()).unwrap();
        assert_eq!(lp.extent(), Extent::unbounded());
        let out = lp.render(-2, 9).unwrap();
        assert_eq!(out.samples(), &[4.0, 5.0, 1.0, 2.0, 3.0, 4.0, 5.0, 1.0, 2.0]);
    }

    #[test]
    fn sub_region_and_count() {
        let mut lp = Loop::with_region(clip(), 1, 3).unwrap().with_count(2);
        assert_eq!(lp.extent(), Extent::finite(1, 5));
        let out = lp.render(0, 7).unwrap();
        assert_eq!(out.samples(), &[0.0, 2.0, 3.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn open_source_cannot_loop() {
        let ctx = ProcessContext::new(8000);
        assert!(matches!(
            Loop::new(Sine::new(&ctx, 100.0)),
            Err(Error::Extent { .. })
        ));
        assert!(Loop::with_region(clip(), 3, 3).is_err());
    }

    #[test]
    fn stateful_source_restarts_each_repetition() {
        let warped = TimeWarp::new(clip(), 0.5).unwrap();
        let mut lp = Loop::with_region(warped, 0, 8).unwrap();
        let first = lp.render(0, 8).unwrap();
        let second = lp.render(8, 8).unwrap();
        assert_eq!(first, second);
    }
}
