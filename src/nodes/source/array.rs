//! In-memory sample source.

use std::rc::Rc;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::ProcessingElement;

/// Plays interleaved samples held in memory.
///
/// The samples are shared, so cloning an `ArraySource` is cheap and every
/// clone reads the same data. Frame 0 of the data sits at absolute frame 0.
#[derive(Clone, Debug)]
pub struct ArraySource {
    samples: Rc<[f32]>,
    channels: usize,
}

impl ArraySource {
    /// Create a source from interleaved audio samples.
    ///
    /// - `samples` - Interleaved audio data (L, R, L, R, ... for stereo)
    /// - `channels` - Number of channels in the audio data
    pub fn new(samples: Vec<f32>, channels: usize) -> Self {
        let channels = channels.max(1);
        let mut samples = samples;
        samples.truncate(samples.len() / channels * channels);
        Self {
            samples: samples.into(),
            channels,
        }
    }

    pub fn mono(samples: Vec<f32>) -> Self {
        Self::new(samples, 1)
    }

    pub fn from_buffer(buffer: Buffer) -> Self {
        let channels = buffer.channels();
        Self::new(buffer.into_samples(), channels)
    }

    /// Number of frames held.
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }
}

impl ProcessingElement for ArraySource {
    fn extent(&self) -> Extent {
        Extent::finite(0, self.frames() as i64)
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = Buffer::zeros(self.channels, count);
        if let Some((offset, frames)) = self.extent().overlap(start, count) {
            let from = (start + offset as i64) as usize * self.channels;
            let to = from + frames * self.channels;
            let dst = offset * self.channels;
            out.samples_mut()[dst..dst + (to - from)].copy_from_slice(&self.samples[from..to]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_data_and_silence_around_it() {
        let mut src = ArraySource::new(vec![1.0, -1.0, 2.0, -2.0], 2);
        assert_eq!(src.extent(), Extent::finite(0, 2));
        let out = src.render(-1, 4).unwrap();
        assert_eq!(out.samples(), &[0.0, 0.0, 1.0, -1.0, 2.0, -2.0, 0.0, 0.0]);
    }

    #[test]
    fn renders_are_repeatable() {
        let mut src = ArraySource::mono((0..10).map(|i| i as f32).collect());
        let a = src.render(3, 4).unwrap();
        let _ = src.render(0, 10).unwrap();
        assert_eq!(src.render(3, 4).unwrap(), a);
    }
}
