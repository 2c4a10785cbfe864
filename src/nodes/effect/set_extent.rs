//! SetExtent - overrides the reported extent.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement};

/// Reports `extent` instead of the source's own.
///
/// Inside the new extent the source plays unchanged, with silence wherever
/// the source has nothing. Outside it the output is silent. Use it to pad a
/// stream with trailing silence, or to close (or open) one side of an
/// extent.
pub struct SetExtent {
    source: Pe,
    extent: Extent,
}

impl SetExtent {
    pub fn new(source: impl Into<Pe>, start: Option<i64>, end: Option<i64>) -> Self {
        Self {
            source: source.into(),
            extent: Extent::new(start, end),
        }
    }
}

impl ProcessingElement for SetExtent {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.source.render_within(&self.extent, start, count)
    }

    fn reset(&mut self) {
        self.source.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::source::{ArraySource, Constant};

    #[test]
    fn pads_with_trailing_silence() {
        let mut padded = SetExtent::new(ArraySource::mono(vec![1.0, 1.0]), Some(0), Some(5));
        assert_eq!(padded.extent(), Extent::finite(0, 5));
        assert_eq!(padded.render(0, 5).unwrap().samples(), &[1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn opens_and_closes_sides() {
        let opened = SetExtent::new(ArraySource::mono(vec![1.0]), Some(0), None);
        assert_eq!(opened.extent(), Extent::starting_at(0));

        let mut closed = SetExtent::new(Constant::new(0.5), Some(2), Some(4));
        assert_eq!(closed.render(0, 5).unwrap().samples(), &[0.0, 0.0, 0.5, 0.5, 0.0]);
    }
}
