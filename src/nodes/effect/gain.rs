//! Gain/volume control effect

use crate::buffer::Buffer;
use crate::control::Control;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement};

/// Scales every channel of `source` by a gain.
///
/// The gain is a [`Control`]: a constant, or a control stream read one value
/// per frame (e.g. an envelope). Where a gain stream has no samples the
/// output is silent.
pub struct Gain {
    source: Pe,
    gain: Control,
}

impl Gain {
    /// Create a new gain node with the specified gain value or control stream
    pub fn new(source: impl Into<Pe>, gain: impl Into<Control>) -> Self {
        Self {
            source: source.into(),
            gain: gain.into(),
        }
    }

    #[inline]
    pub fn gain(&self) -> &Control {
        &self.gain
    }
}

impl ProcessingElement for Gain {
    fn extent(&self) -> Extent {
        self.source.extent().intersection(&self.gain.extent())
    }

    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = self.source.render_window(start, count)?;
        match &self.gain {
            Control::Const(g) => out.scale(*g),
            Control::Stream(_) => {
                let gains = self.gain.values(start, count)?;
                for (i, g) in gains.into_iter().enumerate() {
                    out.frame_mut(i).iter_mut().for_each(|s| *s *= g);
                }
            }
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.gain.reset();
    }
}
