//! Random control signals.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::buffer::Buffer;
use crate::dsp::slew;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{ProcessingElement, RenderCursor};

/// How a [`Random`] source picks new values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RandomMode {
    /// A fresh uniform value every frame.
    Noise,
    /// A fresh uniform value every `interval` frames, held in between.
    SampleHold { interval: i64 },
    /// Every `interval` frames the value moves by a uniform step of at most
    /// `step` times the range, staying inside the range.
    Walk { interval: i64, step: f32 },
}

impl RandomMode {
    /// A walk taking a step of up to 5% of the range every 64 frames.
    pub fn walk() -> Self {
        RandomMode::Walk {
            interval: 64,
            step: 0.05,
        }
    }
}

/// A mono stream of random values in `[min, max]`.
///
/// Values only depend on the seed and on how many frames have been rendered,
/// so two renders of the same graph with the same seed are identical. The
/// generator is stateful and requires contiguous renders.
pub struct Random {
    min: f32,
    max: f32,
    mode: RandomMode,
    slew: Option<f32>,
    rng: StdRng,
    cursor: RenderCursor,
    target: f32,
    current: f32,
}

impl Random {
    pub fn new(min: f32, max: f32, mode: RandomMode) -> Result<Self> {
        if !(min <= max) {
            return Err(Error::config(format!("random range [{min}, {max}] is empty")));
        }
        match mode {
            RandomMode::SampleHold { interval } | RandomMode::Walk { interval, .. }
                if interval <= 0 =>
            {
                return Err(Error::config("random interval must be positive"));
            }
            _ => {}
        }
        Ok(Self {
            min,
            max,
            mode,
            slew: None,
            rng: StdRng::from_entropy(),
            cursor: RenderCursor::new("Random"),
            target: 0.0,
            current: 0.0,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Limit the change per frame to `slew * (max - min)`.
    pub fn with_slew(mut self, slew: f32) -> Self {
        self.slew = Some(slew.abs());
        self
    }

    fn uniform(&mut self) -> f32 {
        self.rng.gen_range(self.min..=self.max)
    }

    fn next_target(&mut self, t: i64, first: bool) -> f32 {
        match self.mode {
            RandomMode::Noise => self.uniform(),
            RandomMode::SampleHold { interval } => {
                if first || t.rem_euclid(interval) == 0 {
                    self.uniform()
                } else {
                    self.target
                }
            }
            RandomMode::Walk { interval, step } => {
                if first {
                    0.5 * (self.min + self.max)
                } else if t.rem_euclid(interval) == 0 {
                    let reach = step.abs() * (self.max - self.min);
                    let delta = self.rng.gen_range(-reach..=reach);
                    (self.target + delta).clamp(self.min, self.max)
                } else {
                    self.target
                }
            }
        }
    }
}

impl ProcessingElement for Random {
    fn extent(&self) -> Extent {
        Extent::unbounded()
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut first = self.cursor.position().is_none();
        self.cursor.advance(start, count)?;

        let max_delta = self.slew.map(|s| s * (self.max - self.min));
        let mut out = Buffer::zeros(1, count);
        for i in 0..count {
            let t = start + i as i64;
            self.target = self.next_target(t, first);
            self.current = match max_delta {
                Some(d) if !first => slew(self.current, self.target, d),
                _ => self.target,
            };
            first = false;
            out.set(i, 0, self.current);
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.cursor.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_in_range() {
        let mut noise = Random::new(-2.0, 3.0, RandomMode::Noise).unwrap().with_seed(7);
        let out = noise.render(0, 4096).unwrap();
        assert!(out.samples().iter().all(|v| (-2.0..=3.0).contains(v)));
    }

    #[test]
    fn same_seed_same_stream_regardless_of_block_size() {
        let make = || {
            Random::new(0.0, 1.0, RandomMode::walk())
                .unwrap()
                .with_seed(42)
                .with_slew(0.01)
        };
        let whole = make().render(0, 1000).unwrap();
        let mut blocky = make();
        let mut pieces = Vec::new();
        for start in (0..1000).step_by(100) {
            pieces.extend_from_slice(blocky.render(start, 100).unwrap().samples());
        }
        assert_eq!(whole.samples(), &pieces[..]);
    }

    #[test]
    fn sample_hold_changes_only_on_interval_boundaries() {
        let mut sh = Random::new(0.0, 1.0, RandomMode::SampleHold { interval: 10 })
            .unwrap()
            .with_seed(1);
        let out = sh.render(5, 30).unwrap();
        let s = out.samples();
        // frames 5..10, 10..20, 20..30, 30..35
        assert!(s[..5].iter().all(|&v| v == s[0]));
        assert!(s[5..15].iter().all(|&v| v == s[5]));
        assert!(s[15..25].iter().all(|&v| v == s[15]));
    }

    #[test]
    fn slew_bounds_per_frame_change() {
        let mut r = Random::new(-80.0, 80.0, RandomMode::Noise)
            .unwrap()
            .with_seed(3)
            .with_slew(0.001);
        let out = r.render(0, 2000).unwrap();
        let limit = 0.001 * 160.0 + 1e-4;
        for w in out.samples().windows(2) {
            assert!((w[1] - w[0]).abs() <= limit);
        }
    }

    #[test]
    fn requires_contiguous_renders() {
        let mut r = Random::new(0.0, 1.0, RandomMode::Noise).unwrap().with_seed(0);
        r.render(0, 10).unwrap();
        assert!(matches!(r.render(20, 10), Err(Error::NonContiguous { .. })));
    }

    #[test]
    fn rejects_empty_range_and_bad_interval() {
        assert!(Random::new(1.0, 0.0, RandomMode::Noise).is_err());
        assert!(Random::new(0.0, 1.0, RandomMode::SampleHold { interval: 0 }).is_err());
    }
}
