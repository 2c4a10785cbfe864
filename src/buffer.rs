//! Interleaved sample blocks returned by every render call.

/// A block of `frames` x `channels` samples, stored interleaved.
///
/// Buffers are produced fresh by each `render()` call and owned by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer {
    channels: usize,
    samples: Vec<f32>,
}

impl Buffer {
    /// A silent buffer.
    pub fn zeros(channels: usize, frames: usize) -> Self {
        Self {
            channels,
            samples: vec![0.0; channels * frames],
        }
    }

    /// Wrap interleaved samples. Trailing samples that do not fill a whole
    /// frame are dropped.
    pub fn from_interleaved(channels: usize, mut samples: Vec<f32>) -> Self {
        let channels = channels.max(1);
        samples.truncate(samples.len() / channels * channels);
        Self { channels, samples }
    }

    /// Build a mono buffer from a sample iterator.
    pub fn from_mono(samples: impl IntoIterator<Item = f32>) -> Self {
        Self {
            channels: 1,
            samples: samples.into_iter().collect(),
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    #[inline]
    pub fn get(&self, frame: usize, channel: usize) -> f32 {
        self.samples[frame * self.channels + channel]
    }

    #[inline]
    pub fn set(&mut self, frame: usize, channel: usize, value: f32) {
        self.samples[frame * self.channels + channel] = value;
    }

    /// All channels of one frame.
    #[inline]
    pub fn frame(&self, frame: usize) -> &[f32] {
        &self.samples[frame * self.channels..(frame + 1) * self.channels]
    }

    #[inline]
    pub fn frame_mut(&mut self, frame: usize) -> &mut [f32] {
        let channels = self.channels;
        &mut self.samples[frame * channels..(frame + 1) * channels]
    }

    /// Iterate over frames.
    pub fn iter_frames(&self) -> impl Iterator<Item = &[f32]> {
        self.samples.chunks_exact(self.channels.max(1))
    }

    /// One channel, de-interleaved.
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        self.iter_frames().map(|f| f[channel]).collect()
    }

    /// Sample of `frame` as heard on output channel `channel`.
    ///
    /// A mono buffer feeds every output channel. Otherwise channels beyond
    /// the buffer's own count read the last channel.
    #[inline]
    pub fn mapped(&self, frame: usize, channel: usize) -> f32 {
        let ch = if self.channels == 1 {
            0
        } else {
            channel.min(self.channels - 1)
        };
        self.get(frame, ch)
    }

    /// Sum `other` into this buffer starting at `offset` frames, mapping
    /// channels with [`Buffer::mapped`].
    pub fn add_from(&mut self, other: &Buffer, offset: usize) {
        if other.channels == 0 {
            return;
        }
        let frames = other.frames().min(self.frames().saturating_sub(offset));
        for i in 0..frames {
            for ch in 0..self.channels {
                let v = other.mapped(i, ch);
                self.samples[(offset + i) * self.channels + ch] += v;
            }
        }
    }

    /// Copy `other` into this buffer starting at `offset` frames.
    pub fn copy_from(&mut self, other: &Buffer, offset: usize) {
        if other.channels == 0 {
            return;
        }
        let frames = other.frames().min(self.frames().saturating_sub(offset));
        for i in 0..frames {
            for ch in 0..self.channels {
                let v = other.mapped(i, ch);
                self.samples[(offset + i) * self.channels + ch] = v;
            }
        }
    }

    /// Multiply every sample.
    pub fn scale(&mut self, gain: f32) {
        self.samples.iter_mut().for_each(|s| *s *= gain);
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Frames `[start, start + len)` as a new buffer.
    pub fn slice(&self, start: usize, len: usize) -> Buffer {
        let from = (start * self.channels).min(self.samples.len());
        let to = ((start + len) * self.channels).min(self.samples.len());
        Buffer {
            channels: self.channels,
            samples: self.samples[from..to].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_feeds_every_channel() {
        let mono = Buffer::from_mono([1.0, 2.0]);
        let mut stereo = Buffer::zeros(2, 3);
        stereo.add_from(&mono, 1);
        assert_eq!(stereo.samples(), &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn extra_channels_read_the_last_one() {
        let stereo = Buffer::from_interleaved(2, vec![0.1, 0.2]);
        assert_eq!(stereo.mapped(0, 3), 0.2);
    }

    #[test]
    fn add_from_clips_to_destination() {
        let src = Buffer::from_mono([1.0; 8]);
        let mut dst = Buffer::zeros(1, 4);
        dst.add_from(&src, 2);
        assert_eq!(dst.samples(), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn partial_frames_are_dropped() {
        let b = Buffer::from_interleaved(2, vec![1.0, 2.0, 3.0]);
        assert_eq!(b.frames(), 1);
        assert_eq!(b.channel(1), vec![2.0]);
    }
}
