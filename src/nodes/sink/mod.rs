//! Destinations for rendered blocks.
//!
//! A [`Sink`] receives the blocks a [`Renderer`](crate::Renderer) pulls from
//! the root element, in order and without gaps.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::node::ProcessContext;

mod memory;
mod rtrb_sink;
mod wav;

#[cfg(feature = "cpal_sink")]
mod cpal_sink;

pub use memory::*;
pub use rtrb_sink::*;
pub use wav::*;

pub(crate) use wav::create_writer;

#[cfg(feature = "cpal_sink")]
pub use cpal_sink::*;

/// Consumer of rendered audio.
pub trait Sink {
    /// Prepare for a session of `channels`-channel blocks. Called once per
    /// session, before the first [`write`](Self::write).
    fn open(&mut self, ctx: &ProcessContext, channels: usize) -> Result<()>;

    /// Consume one block.
    fn write(&mut self, block: &Buffer) -> Result<()>;

    /// Flush and release resources at the end of a finished session.
    fn close(&mut self) -> Result<()>;

    /// End a session that did not finish, e.g. because a render failed.
    /// Sinks that produce an artifact discard it; the default closes.
    fn abort(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!(%e, "failed to close sink");
        }
    }

    /// Whether blocks are consumed at a device's pace. Offline sinks
    /// require the root element to have a finite extent.
    fn is_realtime(&self) -> bool {
        false
    }
}
