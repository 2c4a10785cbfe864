//! WAV file source.

use std::path::Path;

use delegate::delegate;
use tracing::{info, warn};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{ProcessContext, ProcessingElement};

use super::ArraySource;

/// Plays a PCM or floating-point WAV file decoded into memory.
///
/// Integer samples of any depth up to 32 bits are scaled by their
/// `bits_per_sample`, so full scale maps to [-1, 1).
///
/// The file is decoded once on [`open`](Self::open). If its sample rate
/// differs from the graph's, a warning is logged and the samples are played
/// as they are, without conversion.
#[derive(Clone, Debug)]
pub struct WavReader {
    data: ArraySource,
    file_sample_rate: u32,
}

impl WavReader {
    pub fn open(ctx: &ProcessContext, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format_err = |source| Error::Format {
            path: path.to_path_buf(),
            source,
        };

        let reader = hound::WavReader::open(path).map_err(format_err)?;
        let spec = reader.spec();
        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>(),
            (hound::SampleFormat::Int, bits @ 1..=32) => {
                let scale = int_scale(bits);
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect()
            }
            _ => Err(hound::Error::Unsupported),
        }
        .map_err(format_err)?;

        let data = ArraySource::new(samples, spec.channels as usize);
        info!(
            path = %path.display(),
            channels = spec.channels,
            frames = data.frames(),
            sample_rate = spec.sample_rate,
            "opened wav file"
        );
        if spec.sample_rate != ctx.sample_rate {
            warn!(
                path = %path.display(),
                file_rate = spec.sample_rate,
                graph_rate = ctx.sample_rate,
                "sample rate mismatch, playing without conversion"
            );
        }

        Ok(Self {
            data,
            file_sample_rate: spec.sample_rate,
        })
    }

    /// The sample rate stored in the file header.
    #[inline]
    pub fn file_sample_rate(&self) -> u32 {
        self.file_sample_rate
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.data.frames()
    }
}

/// Factor taking a `bits`-deep integer sample to [-1, 1).
fn int_scale(bits: u16) -> f32 {
    1.0 / (1u64 << (bits - 1)) as f32
}

impl ProcessingElement for WavReader {
    delegate! {
        to self.data {
            fn extent(&self) -> Extent;
            fn channel_count(&self) -> usize;
            fn render(&mut self, start: i64, count: usize) -> Result<Buffer>;
        }
    }
}
