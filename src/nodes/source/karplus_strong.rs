//! Plucked-string synthesis (Karplus-Strong).

use dasp_ring_buffer::Fixed;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{ProcessContext, ProcessingElement, RenderCursor};

/// What the delay line holds when the string is plucked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Excitation {
    /// Uniform white noise in `[-amplitude, amplitude]`.
    #[default]
    Noise,
    /// A single sample of `amplitude` followed by silence.
    Impulse,
}

/// A plucked string: a delay line of `round(sample_rate / frequency)`
/// samples fed back on itself, scaled by `rho` on every trip.
///
/// The string is plucked at frame 0 and rings forever, so the extent is
/// `[0, inf)`; wrap it in a crop to bound it. Use
/// [`rho_for_decay_db`](crate::dsp::rho_for_decay_db) to pick `rho` from a
/// decay time.
pub struct KarplusStrong {
    period: usize,
    rho: f32,
    amplitude: f32,
    excitation: Excitation,
    seed: u64,
    smoothing: bool,
    line: Fixed<Vec<f32>>,
    /// Frames generated since the pluck.
    position: i64,
    cursor: RenderCursor,
}

impl KarplusStrong {
    pub fn new(ctx: &ProcessContext, frequency: f32, rho: f32, amplitude: f32) -> Result<Self> {
        if !(frequency > 0.0) {
            return Err(Error::config(format!(
                "plucked string frequency must be positive, got {frequency}"
            )));
        }
        let period = (ctx.sample_rate as f64 / frequency as f64).round() as usize;
        if period < 2 {
            return Err(Error::config(format!(
                "plucked string frequency {frequency} Hz is too high for {} Hz",
                ctx.sample_rate
            )));
        }
        let mut ks = Self {
            period,
            rho,
            amplitude,
            excitation: Excitation::Noise,
            seed: rand::random(),
            smoothing: false,
            line: Fixed::from(vec![0.0; period]),
            position: 0,
            cursor: RenderCursor::new("KarplusStrong"),
        };
        ks.pluck();
        Ok(ks)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.pluck();
        self
    }

    pub fn with_excitation(mut self, excitation: Excitation) -> Self {
        self.excitation = excitation;
        self.pluck();
        self
    }

    /// Average each sample with its successor before feeding it back. This
    /// darkens the tone as it decays.
    pub fn with_smoothing(mut self, smoothing: bool) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Delay line length in samples.
    #[inline]
    pub fn period(&self) -> usize {
        self.period
    }

    #[inline]
    pub fn rho(&self) -> f32 {
        self.rho
    }

    fn pluck(&mut self) {
        let burst: Vec<f32> = match self.excitation {
            Excitation::Noise => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                (0..self.period)
                    .map(|_| rng.gen_range(-1.0f32..=1.0) * self.amplitude)
                    .collect()
            }
            Excitation::Impulse => (0..self.period)
                .map(|i| if i == 0 { self.amplitude } else { 0.0 })
                .collect(),
        };
        self.line = Fixed::from(burst);
        self.position = 0;
    }

    #[inline]
    fn tick(&mut self) -> f32 {
        let out = *self.line.get(0);
        let fed = if self.smoothing {
            0.5 * (out + *self.line.get(1))
        } else {
            out
        };
        self.line.push(self.rho * fed);
        self.position += 1;
        out
    }
}

impl ProcessingElement for KarplusStrong {
    fn extent(&self) -> Extent {
        Extent::starting_at(0)
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.cursor.advance(start, count)?;

        // A late first render skips ahead to its start.
        while self.position < start {
            self.tick();
        }

        let mut out = Buffer::zeros(1, count);
        for i in 0..count {
            if start + (i as i64) >= 0 {
                let v = self.tick();
                out.set(i, 0, v);
            }
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.pluck();
        self.cursor.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::rho_for_decay_db;

    #[test]
    fn decays_by_the_requested_amount() {
        let ctx = ProcessContext::new(44_100);
        let rho = rho_for_decay_db(2.0, 220.0, 44_100, -60.0) as f32;
        let mut ks = KarplusStrong::new(&ctx, 220.0, rho, 1.0).unwrap().with_seed(11);
        let n = ks.period();
        assert_eq!(n, 200);

        let frames = ctx.seconds_to_frames(2.0) as usize;
        let out = ks.render(0, frames).unwrap();
        let first = out.slice(0, n).peak();
        let last = out.slice(frames - n, n).peak();

        let expected = 10f32.powf(-60.0 / 20.0);
        let ratio = last / first;
        assert!(
            (ratio - expected).abs() < 0.1 * expected,
            "decayed to {ratio}, expected about {expected}"
        );
    }

    #[test]
    fn impulse_repeats_every_period() {
        let ctx = ProcessContext::new(1000);
        let mut ks = KarplusStrong::new(&ctx, 250.0, 0.5, 1.0)
            .unwrap()
            .with_excitation(Excitation::Impulse);
        let out = ks.render(0, 12).unwrap();
        assert_eq!(
            out.samples(),
            &[1.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.25, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn smoothing_spreads_the_impulse() {
        let ctx = ProcessContext::new(1000);
        let mut ks = KarplusStrong::new(&ctx, 250.0, 1.0, 1.0)
            .unwrap()
            .with_excitation(Excitation::Impulse)
            .with_smoothing(true);
        let out = ks.render(0, 8).unwrap();
        assert_eq!(&out.samples()[4..], &[0.5, 0.0, 0.0, 0.25]);
        assert_eq!(ks.render(8, 1).unwrap().samples(), &[0.25]);
    }

    #[test]
    fn late_first_render_matches_continuous_render() {
        let ctx = ProcessContext::new(8000);
        let make = || KarplusStrong::new(&ctx, 440.0, 0.99, 0.8).unwrap().with_seed(5);
        let whole = make().render(0, 300).unwrap();
        let tail = make().render(100, 200).unwrap();
        assert_eq!(&whole.samples()[100..], tail.samples());
    }

    #[test]
    fn reset_replays_the_same_pluck() {
        let ctx = ProcessContext::new(8000);
        let mut ks = KarplusStrong::new(&ctx, 440.0, 0.99, 0.8).unwrap().with_seed(5);
        let a = ks.render(0, 64).unwrap();
        assert!(ks.render(0, 64).is_err());
        ks.reset();
        assert_eq!(ks.render(0, 64).unwrap(), a);
    }

    #[test]
    fn rejects_unplayable_frequencies() {
        let ctx = ProcessContext::new(8000);
        assert!(KarplusStrong::new(&ctx, 0.0, 0.9, 1.0).is_err());
        assert!(KarplusStrong::new(&ctx, 6000.0, 0.9, 1.0).is_err());
    }
}
