//! Pass-through element that records what flows through it.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::WavWriter as HoundWriter;
use tracing::{info, warn};

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{Pe, ProcessContext, ProcessingElement, RenderCursor};
use crate::nodes::sink::{create_writer, WavFormat};

/// Returns its source unchanged and appends every rendered block to a WAV
/// file. Renders must be contiguous.
///
/// The file is finalized by [`finalize`](Self::finalize) or on drop.
pub struct WavWriter {
    source: Pe,
    path: PathBuf,
    format: WavFormat,
    writer: Option<HoundWriter<BufWriter<File>>>,
    cursor: RenderCursor,
}

impl WavWriter {
    /// Create the file at `path` and tap `source` into it.
    pub fn new(
        ctx: &ProcessContext,
        source: impl Into<Pe>,
        path: impl Into<PathBuf>,
        format: WavFormat,
    ) -> Result<Self> {
        let source = source.into();
        let path = path.into();
        let writer = create_writer(&path, format, source.channel_count(), ctx.sample_rate)?;
        Ok(Self {
            source,
            path,
            format,
            writer: Some(writer),
            cursor: RenderCursor::new("WavWriter"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the header and close the file. Later renders still pass audio
    /// through but record nothing.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            info!(path = %self.path.display(), "finalized recording");
        }
        Ok(())
    }
}

impl ProcessingElement for WavWriter {
    fn extent(&self) -> Extent {
        self.source.extent()
    }

    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.cursor.advance(start, count)?;
        let out = self.source.render(start, count)?;
        if let Some(writer) = self.writer.as_mut() {
            self.format.write_block(writer, &out)?;
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.cursor.reset();
    }
}

impl Drop for WavWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            warn!(path = %self.path.display(), %e, "could not finalize recording");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::nodes::source::ArraySource;

    #[test]
    fn records_what_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tap.wav");
        let ctx = ProcessContext::new(44100);
        let src = ArraySource::mono(vec![0.1, 0.2, 0.3, 0.4]);
        let mut tap = WavWriter::new(&ctx, src, &path, WavFormat::Float32).unwrap();

        assert_eq!(tap.render(0, 2).unwrap().samples(), &[0.1, 0.2]);
        assert_eq!(tap.render(2, 2).unwrap().samples(), &[0.3, 0.4]);
        assert!(matches!(tap.render(0, 1), Err(Error::NonContiguous { .. })));
        tap.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        let recorded: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(recorded, vec![0.1, 0.2, 0.3, 0.4]);
    }
}
