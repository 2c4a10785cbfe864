//! The render loop.
//!
//! A [`Renderer`] owns a [`Sink`] and pulls blocks from a root element into
//! it. Rendering happens inside a [`Session`], a scope guard that opens the
//! sink on start. [`Session::finish`] closes it; a session dropped without
//! finishing, for instance after a failed render, aborts it instead.
//!
//! # Example
//!
//! ```no_run
//! use gmu::{play_offline, ProcessContext, Sine, Crop};
//!
//! let ctx = ProcessContext::new(48000);
//! let tone = Crop::range(Sine::new(&ctx, 440.0), 0, 48000);
//! play_offline(&ctx, tone, "tone.wav").unwrap();
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::node::{Pe, ProcessContext};
use crate::nodes::sink::{MemorySink, Sink, WavSink};

/// Stops a running session after its current block.
///
/// Cloneable and `Send`, so it can be handed to another thread.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives a root element into a sink in blocks of the context's block size.
pub struct Renderer<S: Sink> {
    ctx: ProcessContext,
    sink: S,
    source: Option<Pe>,
    stop: StopHandle,
}

impl<S: Sink> Renderer<S> {
    pub fn new(ctx: ProcessContext, sink: S) -> Result<Self> {
        ctx.validate()?;
        Ok(Self {
            ctx,
            sink,
            source: None,
            stop: StopHandle::default(),
        })
    }

    /// Set the root element. The graph must be fully built at this point.
    pub fn set_source(&mut self, source: impl Into<Pe>) {
        self.source = Some(source.into());
    }

    pub fn with_source(mut self, source: impl Into<Pe>) -> Self {
        self.set_source(source);
        self
    }

    #[inline]
    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// A handle that ends the current (or next) session cooperatively.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Open the sink and begin a session.
    ///
    /// Offline sinks need the root to have a finite extent; this is checked
    /// before the sink is opened, so no file is created for an open stream.
    pub fn start(&mut self) -> Result<Session<'_, S>> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| Error::config("renderer has no source"))?;
        let extent = source.extent();
        if !self.sink.is_realtime() && !extent.is_finite() {
            return Err(Error::Extent {
                operation: "offline render",
                extent,
            });
        }

        self.stop.0.store(false, Ordering::Release);
        self.sink.open(&self.ctx, source.channel_count())?;
        debug!(
            %extent,
            channels = source.channel_count(),
            sample_rate = self.ctx.sample_rate,
            block_size = self.ctx.block_size,
            realtime = self.sink.is_realtime(),
            "render session started"
        );

        let cursor = extent.start().unwrap_or(0);
        Ok(Session {
            renderer: self,
            source,
            cursor,
            open: true,
        })
    }
}

/// An open render session. Aborts the sink when dropped unfinished, so a
/// failed render never leaves a truncated file behind.
pub struct Session<'a, S: Sink> {
    renderer: &'a mut Renderer<S>,
    source: Pe,
    cursor: i64,
    open: bool,
}

impl<S: Sink> Session<'_, S> {
    /// The next frame [`play`](Self::play) will render.
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Render `[start, start + count)` into the sink, block by block, and
    /// move the cursor to its end. Returns the number of frames delivered,
    /// which is less than `count` only if the session was stopped.
    pub fn render(&mut self, start: i64, count: usize) -> Result<usize> {
        let block_size = self.renderer.ctx.block_size;
        let end = start + count as i64;
        self.cursor = start;
        let mut blocks = 0usize;
        while self.cursor < end {
            if self.renderer.stop.is_stopped() {
                debug!(cursor = self.cursor, "render stopped");
                break;
            }
            let n = block_size.min((end - self.cursor) as usize);
            let block = self.source.render(self.cursor, n)?;
            self.renderer.sink.write(&block)?;
            self.cursor += n as i64;
            blocks += 1;
        }
        debug!(start, frames = self.cursor - start, blocks, "rendered");
        Ok((self.cursor - start) as usize)
    }

    /// Render `count` frames from the cursor.
    pub fn play(&mut self, count: usize) -> Result<usize> {
        self.render(self.cursor, count)
    }

    /// Render the root's whole extent. Fails for open extents.
    pub fn play_extent(&mut self) -> Result<usize> {
        let extent = self.source.extent();
        match (extent.start(), extent.duration()) {
            (Some(start), Some(duration)) => self.render(start, duration as usize),
            _ => Err(Error::Extent {
                operation: "rendering a whole extent",
                extent,
            }),
        }
    }

    /// Close the sink and report any error from doing so.
    pub fn finish(mut self) -> Result<()> {
        self.open = false;
        debug!(cursor = self.cursor, "render session finished");
        self.renderer.sink.close()
    }
}

impl<S: Sink> Drop for Session<'_, S> {
    fn drop(&mut self) {
        if self.open {
            debug!(cursor = self.cursor, "render session aborted");
            self.renderer.sink.abort();
        }
    }
}

/// Render the whole of `source` into memory.
pub fn render_to_buffer(ctx: &ProcessContext, source: impl Into<Pe>) -> Result<Buffer> {
    let mut renderer = Renderer::new(*ctx, MemorySink::new())?.with_source(source);
    let mut session = renderer.start()?;
    session.play_extent()?;
    session.finish()?;
    Ok(renderer.into_sink().into_buffer())
}

/// Render the whole of `source` to a 16-bit PCM WAV file at `path`.
///
/// Nothing is written to `path` unless the whole extent renders.
pub fn play_offline(ctx: &ProcessContext, source: impl Into<Pe>, path: impl AsRef<Path>) -> Result<()> {
    let sink = WavSink::new(path.as_ref());
    let mut renderer = Renderer::new(*ctx, sink)?.with_source(source);
    let mut session = renderer.start()?;
    session.play_extent()?;
    session.finish()
}

/// Play `source` on the default output device.
///
/// Plays the whole extent when `frames` is `None`, which requires a finite
/// extent; otherwise plays `frames` frames from the extent start.
#[cfg(feature = "cpal_sink")]
pub fn play(ctx: &ProcessContext, source: impl Into<Pe>, frames: Option<usize>) -> Result<()> {
    let device = crate::device::CpalDevice::default_output()
        .ok_or_else(|| Error::Device("no default output device".into()))?;
    let mut renderer = Renderer::new(*ctx, device.create_sink())?.with_source(source);
    let mut session = renderer.start()?;
    match frames {
        Some(frames) => session.play(frames)?,
        None => session.play_extent()?,
    };
    session.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extent::Extent;
    use crate::node::ProcessingElement;
    use crate::nodes::source::{ArraySource, Constant};

    /// Records lifecycle calls and can be made to fail.
    #[derive(Default)]
    struct Recorder {
        opened: usize,
        closed: usize,
        aborted: usize,
        blocks: Vec<usize>,
        fail_write: bool,
    }

    impl Sink for Recorder {
        fn open(&mut self, _ctx: &ProcessContext, _channels: usize) -> Result<()> {
            self.opened += 1;
            Ok(())
        }

        fn write(&mut self, block: &Buffer) -> Result<()> {
            if self.fail_write {
                return Err(Error::Device("gone".into()));
            }
            self.blocks.push(block.frames());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed += 1;
            Ok(())
        }

        fn abort(&mut self) {
            self.aborted += 1;
        }
    }

    #[test]
    fn last_block_is_truncated() {
        let ctx = ProcessContext::new(1000).with_block_size(4);
        let mut renderer = Renderer::new(ctx, Recorder::default()).unwrap();
        renderer.set_source(ArraySource::mono(vec![0.0; 10]));
        let mut session = renderer.start().unwrap();
        session.play_extent().unwrap();
        session.finish().unwrap();
        assert_eq!(renderer.sink().blocks, vec![4, 4, 2]);
        assert_eq!(renderer.sink().closed, 1);
        assert_eq!(renderer.sink().aborted, 0);
    }

    #[test]
    fn sink_aborted_when_render_fails() {
        let ctx = ProcessContext::new(1000).with_block_size(4);
        let failing = Recorder {
            fail_write: true,
            ..Recorder::default()
        };
        let mut renderer = Renderer::new(ctx, failing).unwrap();
        renderer.set_source(ArraySource::mono(vec![0.0; 10]));
        {
            let mut session = renderer.start().unwrap();
            assert!(session.play_extent().is_err());
        }
        assert_eq!(renderer.sink().opened, 1);
        assert_eq!(renderer.sink().closed, 0);
        assert_eq!(renderer.sink().aborted, 1);
    }

    #[test]
    fn open_extent_rejected_before_open() {
        let mut renderer = Renderer::new(ProcessContext::default(), Recorder::default()).unwrap();
        renderer.set_source(Constant::new(1.0));
        assert!(matches!(renderer.start(), Err(Error::Extent { .. })));
        assert_eq!(renderer.sink().opened, 0);
    }

    #[test]
    fn stop_handle_ends_session_between_blocks() {
        struct StopAfter {
            inner: Constant,
            stop: StopHandle,
            calls: usize,
        }

        impl ProcessingElement for StopAfter {
            fn extent(&self) -> Extent {
                Extent::finite(0, 100)
            }

            fn channel_count(&self) -> usize {
                1
            }

            fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
                self.calls += 1;
                if self.calls == 2 {
                    self.stop.stop();
                }
                self.inner.render(start, count)
            }
        }

        let ctx = ProcessContext::new(1000).with_block_size(10);
        let mut renderer = Renderer::new(ctx, MemorySink::new()).unwrap();
        let stop = renderer.stop_handle();
        renderer.set_source(StopAfter {
            inner: Constant::new(1.0),
            stop,
            calls: 0,
        });
        let frames = renderer.start().unwrap().play_extent().unwrap();
        assert_eq!(frames, 20);
        assert_eq!(renderer.sink().frames(), 20);
    }

    #[test]
    fn render_to_buffer_covers_extent() {
        let ctx = ProcessContext::new(1000).with_block_size(3);
        let out = render_to_buffer(&ctx, ArraySource::mono(vec![1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(out.samples(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn invalid_context_rejected() {
        let ctx = ProcessContext::new(0);
        assert!(Renderer::new(ctx, MemorySink::new()).is_err());
    }
}
