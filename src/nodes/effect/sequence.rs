//! Sequence - places elements on a shared timeline.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement};

/// Plays each item shifted by its own offset and sums the results.
///
/// Frame 0 of an item lands at its offset. Items may overlap in time.
pub struct Sequence {
    items: Vec<(Pe, i64)>,
    channels: usize,
}

impl Sequence {
    /// Build a sequence from `(element, offset)` pairs.
    ///
    /// A `None` offset places the item where the previous one ends (0 for
    /// the first item). That requires the previous item to have a finite end.
    pub fn new(items: impl IntoIterator<Item = (Pe, Option<i64>)>) -> Result<Self> {
        let mut placed: Vec<(Pe, i64)> = Vec::new();
        for (pe, offset) in items {
            let offset = match (offset, placed.last()) {
                (Some(o), _) => o,
                (None, None) => 0,
                (None, Some((prev, prev_offset))) => match prev.extent().end() {
                    Some(end) => end + prev_offset,
                    None => {
                        return Err(Error::Extent {
                            operation: "sequencing after an item",
                            extent: prev.extent(),
                        })
                    }
                },
            };
            placed.push((pe, offset));
        }
        Ok(Self::at(placed))
    }

    /// Build a sequence from explicit offsets.
    pub fn at(items: impl IntoIterator<Item = (Pe, i64)>) -> Self {
        let items: Vec<(Pe, i64)> = items.into_iter().collect();
        let channels = items
            .iter()
            .map(|(pe, _)| pe.channel_count())
            .max()
            .unwrap_or(1);
        Self { items, channels }
    }

    /// Items and their resolved offsets.
    pub fn items(&self) -> impl Iterator<Item = (&Pe, i64)> {
        self.items.iter().map(|(pe, o)| (pe, *o))
    }
}

impl ProcessingElement for Sequence {
    fn extent(&self) -> Extent {
        self.items
            .iter()
            .fold(Extent::empty(), |acc, (pe, offset)| {
                acc.union(&pe.extent().offset(*offset))
            })
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = Buffer::zeros(self.channels, count);
        for (pe, offset) in &self.items {
            let placed = pe.extent().offset(*offset);
            let Some((at, frames)) = placed.overlap(start, count) else {
                continue;
            };
            let local = start + at as i64 - offset;
            out.add_from(&pe.render(local, frames)?, at);
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.items.iter().for_each(|(pe, _)| pe.reset());
    }
}
