//! WAV file export.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use dasp_sample::Sample;
use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::node::ProcessContext;

use super::Sink;

/// Sample encoding of exported files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WavFormat {
    /// 16-bit integer PCM, clipped to [-1, 1].
    #[default]
    Pcm16,
    /// 32-bit float, unclipped.
    Float32,
}

impl WavFormat {
    pub(crate) fn spec(self, channels: usize, sample_rate: u32) -> Result<WavSpec> {
        let channels = u16::try_from(channels)
            .map_err(|_| Error::config(format!("{channels} channels do not fit in a WAV header")))?;
        let (bits_per_sample, sample_format) = match self {
            WavFormat::Pcm16 => (16, SampleFormat::Int),
            WavFormat::Float32 => (32, SampleFormat::Float),
        };
        Ok(WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        })
    }

    pub(crate) fn write_block<W: Write + Seek>(
        self,
        writer: &mut WavWriter<W>,
        block: &Buffer,
    ) -> Result<()> {
        match self {
            WavFormat::Pcm16 => {
                for &s in block.samples() {
                    writer.write_sample(s.clamp(-1.0, 1.0).to_sample::<i16>())?;
                }
            }
            WavFormat::Float32 => {
                for &s in block.samples() {
                    writer.write_sample(s)?;
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn create_writer(
    path: &Path,
    format: WavFormat,
    channels: usize,
    sample_rate: u32,
) -> Result<WavWriter<BufWriter<File>>> {
    let spec = format.spec(channels, sample_rate)?;
    WavWriter::create(path, spec).map_err(|source| Error::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the rendered stream to a WAV file, 16-bit PCM unless configured
/// otherwise.
///
/// Samples are staged in a temporary file next to `path`, which is moved
/// into place when the session finishes. A session that ends with an error
/// leaves nothing at `path`.
pub struct WavSink {
    path: PathBuf,
    format: WavFormat,
    staged: Option<Staged>,
    frames: u64,
}

struct Staged {
    file: NamedTempFile,
    writer: WavWriter<BufWriter<File>>,
}

impl WavSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: WavFormat::default(),
            staged: None,
            frames: 0,
        }
    }

    pub fn with_format(mut self, format: WavFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written during the current or last session.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn stage(&self, channels: usize, sample_rate: u32) -> Result<Staged> {
        let spec = self.format.spec(channels, sample_rate)?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let file = tempfile::Builder::new()
            .prefix(".gmu-")
            .suffix(".wav")
            .tempfile_in(dir)?;
        let writer = WavWriter::new(BufWriter::new(file.reopen()?), spec).map_err(|source| {
            Error::Format {
                path: file.path().to_path_buf(),
                source,
            }
        })?;
        Ok(Staged { file, writer })
    }
}

impl Sink for WavSink {
    fn open(&mut self, ctx: &ProcessContext, channels: usize) -> Result<()> {
        let staged = self.stage(channels, ctx.sample_rate)?;
        debug!(
            path = %self.path.display(),
            staging = %staged.file.path().display(),
            channels,
            "creating wav file"
        );
        self.staged = Some(staged);
        self.frames = 0;
        Ok(())
    }

    fn write(&mut self, block: &Buffer) -> Result<()> {
        let staged = self
            .staged
            .as_mut()
            .ok_or_else(|| Error::config("wav sink written before open"))?;
        self.format.write_block(&mut staged.writer, block)?;
        self.frames += block.frames() as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(Staged { file, writer }) = self.staged.take() {
            writer.finalize()?;
            file.persist(&self.path).map_err(|e| Error::Io(e.error))?;
            info!(path = %self.path.display(), frames = self.frames, "wrote wav file");
        }
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(staged) = self.staged.take() {
            // dropping the temp file deletes it
            drop(staged);
            debug!(path = %self.path.display(), frames = self.frames, "discarded wav file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_pcm16_and_clips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let mut sink = WavSink::new(&path).with_format(WavFormat::Pcm16);
        sink.open(&ProcessContext::new(8000), 1).unwrap();
        sink.write(&Buffer::from_mono([0.0, 2.0, -2.0])).unwrap();
        sink.close().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples[0], 0);
        assert!(samples[1] >= i16::MAX - 1);
        assert_eq!(samples[2], i16::MIN);
    }

    #[test]
    fn abort_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.wav");
        let mut sink = WavSink::new(&path);
        sink.open(&ProcessContext::new(8000), 1).unwrap();
        sink.write(&Buffer::from_mono([0.5; 64])).unwrap();
        assert!(!path.exists());
        sink.abort();
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn default_format_is_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.wav");
        let mut sink = WavSink::new(&path);
        sink.open(&ProcessContext::new(8000), 2).unwrap();
        sink.write(&Buffer::zeros(2, 10)).unwrap();
        sink.close().unwrap();

        let spec = hound::WavReader::open(&path).unwrap().spec();
        assert_eq!(spec.sample_format, SampleFormat::Int);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.channels, 2);
    }

    #[test]
    fn write_before_open_fails() {
        let mut sink = WavSink::new("never.wav");
        assert!(sink.write(&Buffer::zeros(1, 1)).is_err());
        assert!(sink.close().is_ok());
    }
}
