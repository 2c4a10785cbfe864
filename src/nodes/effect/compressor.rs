//! Dynamics: hard-knee compressor and envelope detector.

use crate::buffer::Buffer;
use crate::dsp::{db_to_ratio, ratio_to_db, EnvelopeFollower};
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{silence_outside, Pe, ProcessContext, ProcessingElement, RenderCursor};

/// Envelope levels below this are reported as this, in dB.
const DB_FLOOR: f32 = -120.0;

/// A feed-forward compressor.
///
/// A peak envelope follower tracks the loudest channel. Above `threshold_db`
/// the level is reduced by `ratio` (hard knee); below it gain is unity.
/// All channels receive the same gain.
///
/// Gain is recomputed every frame rather than once per block, so the output
/// does not depend on the block size it is rendered with.
///
/// [`with_envelope`](Self::with_envelope) replaces the follower with an
/// external envelope, typically an [`EnvDetect`] in [`EnvUnits::Db`].
pub struct Compressor {
    source: Pe,
    threshold_db: f32,
    ratio: f32,
    makeup_db: f32,
    detector: Detector,
    cursor: RenderCursor,
}

enum Detector {
    Follower {
        follower: EnvelopeFollower,
        sample_rate: u32,
    },
    External {
        envelope: Pe,
        units: EnvUnits,
    },
}

impl Compressor {
    /// A compressor with a -20 dB threshold, 4:1 ratio, 10 ms attack and
    /// 100 ms release.
    pub fn new(ctx: &ProcessContext, source: impl Into<Pe>) -> Self {
        let (attack, release) = (0.01, 0.1);
        Self::with_detector(
            source.into(),
            Detector::Follower {
                follower: EnvelopeFollower::new(attack, release, ctx.sample_rate),
                sample_rate: ctx.sample_rate,
            },
        )
    }

    /// A compressor driven by the level in `envelope` instead of its own
    /// follower, with the same default curve as [`new`](Self::new).
    ///
    /// `envelope` is rendered alongside `source` over the same frames; a
    /// multichannel envelope is reduced to its loudest channel. Outside the
    /// envelope's extent the level counts as silence. `source` and
    /// `envelope` may both read one stateless element, such as a
    /// [`WavReader`](crate::WavReader).
    pub fn with_envelope(source: impl Into<Pe>, envelope: impl Into<Pe>, units: EnvUnits) -> Self {
        Self::with_detector(
            source.into(),
            Detector::External {
                envelope: envelope.into(),
                units,
            },
        )
    }

    fn with_detector(source: Pe, detector: Detector) -> Self {
        Self {
            source,
            threshold_db: -20.0,
            ratio: 4.0,
            makeup_db: 0.0,
            detector,
            cursor: RenderCursor::new("Compressor"),
        }
    }

    /// Set threshold and ratio. The ratio must be at least 1.
    pub fn with_curve(mut self, threshold_db: f32, ratio: f32) -> Result<Self> {
        if !(ratio >= 1.0) {
            return Err(Error::config(format!("compressor ratio must be >= 1, got {ratio}")));
        }
        self.threshold_db = threshold_db;
        self.ratio = ratio;
        Ok(self)
    }

    /// Attack and release times in seconds. Has no effect when the level
    /// comes from an external envelope.
    pub fn with_times(mut self, attack: f32, release: f32) -> Self {
        if let Detector::Follower {
            follower,
            sample_rate,
        } = &mut self.detector
        {
            *follower = EnvelopeFollower::new(attack, release, *sample_rate);
        }
        self
    }

    pub fn with_makeup_db(mut self, makeup_db: f32) -> Self {
        self.makeup_db = makeup_db;
        self
    }

    /// Gain in dB applied for an envelope at `level_db`, before makeup.
    pub fn gain_reduction_db(&self, level_db: f32) -> f32 {
        if level_db > self.threshold_db {
            let target = self.threshold_db + (level_db - self.threshold_db) / self.ratio;
            target - level_db
        } else {
            0.0
        }
    }

    /// Level in dB for every frame of `block`, which starts at `start`.
    fn levels_db(&mut self, block: &Buffer, start: i64) -> Result<Vec<f32>> {
        match &mut self.detector {
            Detector::Follower { follower, .. } => Ok(block
                .iter_frames()
                .map(|f| {
                    let env = follower.process(peak(f));
                    ratio_to_db(env).max(DB_FLOOR)
                })
                .collect()),
            Detector::External { envelope, units } => {
                let extent = envelope.extent();
                let env = envelope.render_window(start, block.frames())?;
                Ok(env
                    .iter_frames()
                    .enumerate()
                    .map(|(i, f)| {
                        if !extent.contains(start + i as i64) {
                            return DB_FLOOR;
                        }
                        let level = match units {
                            EnvUnits::Linear => ratio_to_db(peak(f)),
                            EnvUnits::Db => f.iter().copied().fold(f32::NEG_INFINITY, f32::max),
                        };
                        level.max(DB_FLOOR)
                    })
                    .collect())
            }
        }
    }
}

fn peak(frame: &[f32]) -> f32 {
    frame.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

impl ProcessingElement for Compressor {
    fn extent(&self) -> Extent {
        self.source.extent()
    }

    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.cursor.advance(start, count)?;
        let mut out = self.source.render_window(start, count)?;
        let levels = self.levels_db(&out, start)?;

        for (frame, level_db) in levels.into_iter().enumerate() {
            let gain = db_to_ratio(self.gain_reduction_db(level_db) + self.makeup_db);
            out.frame_mut(frame).iter_mut().for_each(|s| *s *= gain);
        }

        silence_outside(&mut out, &self.source.extent(), start);
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.cursor.reset();
        match &mut self.detector {
            Detector::Follower { follower, .. } => follower.reset(),
            Detector::External { envelope, .. } => envelope.reset(),
        }
    }
}

/// Units of an [`EnvDetect`] output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EnvUnits {
    #[default]
    Linear,
    /// Decibels relative to full scale, floored at -120 dB.
    Db,
}

/// Follows the peak level of `source` and outputs it as a mono control
/// stream.
///
/// Pair it with [`Transform`](super::Transform) and [`Gain`](super::Gain) to
/// build custom dynamics.
pub struct EnvDetect {
    source: Pe,
    units: EnvUnits,
    follower: EnvelopeFollower,
    cursor: RenderCursor,
}

impl EnvDetect {
    pub fn new(
        ctx: &ProcessContext,
        source: impl Into<Pe>,
        attack: f32,
        release: f32,
        units: EnvUnits,
    ) -> Self {
        Self {
            source: source.into(),
            units,
            follower: EnvelopeFollower::new(attack, release, ctx.sample_rate),
            cursor: RenderCursor::new("EnvDetect"),
        }
    }
}

impl ProcessingElement for EnvDetect {
    fn extent(&self) -> Extent {
        self.source.extent()
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.cursor.advance(start, count)?;
        let input = self.source.render_window(start, count)?;

        let mut out = Buffer::from_mono(input.iter_frames().map(|f| {
            let env = self.follower.process(peak(f));
            match self.units {
                EnvUnits::Linear => env,
                EnvUnits::Db => ratio_to_db(env).max(DB_FLOOR),
            }
        }));
        silence_outside(&mut out, &self.source.extent(), start);
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.cursor.reset();
        self.follower.reset();
    }
}
