//! Core processing element trait and context types.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;

/// Rendering parameters shared by a whole graph.
///
/// Constructed once before any element is built and passed by reference to
/// every constructor that depends on the sample rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of frames the renderer pulls per block
    pub block_size: usize,
}

impl ProcessContext {
    pub const DEFAULT_BLOCK_SIZE: usize = 512;

    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            block_size: Self::DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Reject a zero sample rate or block size.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::config("sample rate must be positive"));
        }
        if self.block_size == 0 {
            return Err(Error::config("block size must be positive"));
        }
        Ok(())
    }

    /// Round a duration in seconds to the nearest frame.
    #[inline]
    pub fn seconds_to_frames(&self, seconds: f64) -> i64 {
        (seconds * self.sample_rate as f64).round() as i64
    }

    #[inline]
    pub fn frames_to_seconds(&self, frames: i64) -> f64 {
        frames as f64 / self.sample_rate as f64
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::new(48_000)
    }
}

/// The core trait for processing elements.
///
/// An element is a time-indexed stream of samples. It reports the interval
/// over which it is defined with [`extent`](Self::extent) and produces any
/// window of samples on demand with [`render`](Self::render). Outside its
/// extent an element renders silence.
///
/// Elements can be:
/// - **Sources**: generate samples from a file, a formula or a model
/// - **Effects**: combine or transform one or more child elements
///
/// Stateful elements (filters, resamplers, envelope followers) only accept
/// contiguous, forward-moving renders. They track the next expected start
/// with a [`RenderCursor`] and fail with [`Error::NonContiguous`] otherwise.
///
/// ```
/// use gmu::{Buffer, Extent, ProcessingElement, Result};
///
/// struct Click;
///
/// impl ProcessingElement for Click {
///     fn extent(&self) -> Extent {
///         Extent::finite(0, 1)
///     }
///
///     fn channel_count(&self) -> usize {
///         1
///     }
///
///     fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
///         Ok(Buffer::from_mono((0..count as i64).map(|i| {
///             if start + i == 0 { 1.0 } else { 0.0 }
///         })))
///     }
/// }
/// ```
pub trait ProcessingElement {
    /// The interval over which this element produces samples.
    fn extent(&self) -> Extent;

    /// Number of interleaved channels in every rendered buffer.
    fn channel_count(&self) -> usize;

    /// Render `count` frames starting at absolute frame `start`.
    ///
    /// The returned buffer always holds exactly `count` frames of
    /// [`channel_count`](Self::channel_count) channels.
    fn render(&mut self, start: i64, count: usize) -> Result<Buffer>;

    /// Clear internal state so the next render may start anywhere.
    fn reset(&mut self) {}
}

/// Shared handle to a processing element.
///
/// Cloning a `Pe` shares the element; it does not copy it. The same element
/// may be referenced from several parents, and lives as long as the longest
/// lived of them.
#[derive(Clone)]
pub struct Pe(Rc<RefCell<dyn ProcessingElement>>);

impl Pe {
    pub fn new<T: ProcessingElement + 'static>(pe: T) -> Self {
        Pe(Rc::new(RefCell::new(pe)))
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.0.borrow().extent()
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.0.borrow().channel_count()
    }

    pub fn render(&self, start: i64, count: usize) -> Result<Buffer> {
        self.0.borrow_mut().render(start, count)
    }

    pub fn reset(&self) {
        self.0.borrow_mut().reset()
    }

    /// Render `[start, start + count)`, asking the element only for the part
    /// that lies inside its extent and padding the rest with silence.
    pub fn render_window(&self, start: i64, count: usize) -> Result<Buffer> {
        self.render_within(&Extent::unbounded(), start, count)
    }

    /// Like [`render_window`](Self::render_window), but also silences
    /// everything outside `limit`.
    pub fn render_within(&self, limit: &Extent, start: i64, count: usize) -> Result<Buffer> {
        let extent = self.extent().intersection(limit);
        let channels = self.channel_count();
        match extent.overlap(start, count) {
            Some((0, frames)) if frames == count => self.render(start, count),
            Some((offset, frames)) => {
                let part = self.render(start + offset as i64, frames)?;
                let mut out = Buffer::zeros(channels, count);
                out.copy_from(&part, offset);
                Ok(out)
            }
            None => Ok(Buffer::zeros(channels, count)),
        }
    }
}

impl<T: ProcessingElement + 'static> From<T> for Pe {
    fn from(pe: T) -> Self {
        Pe::new(pe)
    }
}

impl fmt::Debug for Pe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pe")
            .field("extent", &self.extent())
            .field("channels", &self.channel_count())
            .finish()
    }
}

/// Tracks the next frame a stateful element expects to render.
#[derive(Clone, Copy, Debug)]
pub struct RenderCursor {
    node: &'static str,
    next: Option<i64>,
}

impl RenderCursor {
    pub fn new(node: &'static str) -> Self {
        Self { node, next: None }
    }

    /// Accept a render of `count` frames at `start` and move past it.
    ///
    /// The first render after construction or [`reset`](Self::reset) may
    /// start anywhere. Zero-length renders leave the cursor untouched.
    pub fn advance(&mut self, start: i64, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if let Some(expected) = self.next {
            if expected != start {
                return Err(Error::NonContiguous {
                    node: self.node,
                    expected,
                    actual: start,
                });
            }
        }
        self.next = Some(start + count as i64);
        Ok(())
    }

    #[inline]
    pub fn position(&self) -> Option<i64> {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = None;
    }
}

/// Zero every frame of `buffer` (which starts at absolute frame `start`)
/// that lies outside `extent`.
pub(crate) fn silence_outside(buffer: &mut Buffer, extent: &Extent, start: i64) {
    let frames = buffer.frames();
    let (from, len) = extent.overlap(start, frames).unwrap_or((0, 0));
    for i in (0..from).chain(from + len..frames) {
        buffer.frame_mut(i).iter_mut().for_each(|s| *s = 0.0);
    }
}
