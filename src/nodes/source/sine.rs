//! Sine wave oscillator.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{ProcessContext, ProcessingElement};

/// A mono sine oscillator.
///
/// The phase is derived from the absolute frame index, so any window can be
/// rendered in any order and the oscillator never drifts.
#[derive(Clone, Copy, Debug)]
pub struct Sine {
    frequency: f64,
    amplitude: f32,
    phase: f64,
    sample_rate: f64,
}

impl Sine {
    pub fn new(ctx: &ProcessContext, frequency: f32) -> Self {
        Self {
            frequency: frequency.max(0.0) as f64,
            amplitude: 0.25, // -12dB, safe default
            phase: 0.0,
            sample_rate: ctx.sample_rate as f64,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Starting phase in cycles (0.0 - 1.0) at frame 0.
    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase as f64;
        self
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency as f32
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
}

impl ProcessingElement for Sine {
    fn extent(&self) -> Extent {
        Extent::unbounded()
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let inc = self.frequency / self.sample_rate;
        Ok(Buffer::from_mono((0..count as i64).map(|i| {
            let cycles = ((start + i) as f64 * inc + self.phase).rem_euclid(1.0);
            (cycles * core::f64::consts::TAU).sin() as f32 * self.amplitude
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dasp_signal::{self as signal, Signal};

    #[test]
    fn matches_a_reference_oscillator() {
        let ctx = ProcessContext::new(48_000);
        let mut sine = Sine::new(&ctx, 440.0).with_amplitude(1.0);
        let out = sine.render(0, 256).unwrap();

        let mut reference = signal::rate(48_000.0).const_hz(440.0).sine();
        for (i, &s) in out.samples().iter().enumerate() {
            let r = reference.next() as f32;
            assert!((s - r).abs() < 1e-4, "frame {i}: {s} vs {r}");
        }
    }

    #[test]
    fn windows_are_order_independent() {
        let ctx = ProcessContext::new(44_100);
        let mut sine = Sine::new(&ctx, 1000.0);
        let whole = sine.render(-64, 128).unwrap();
        let late = sine.render(0, 64).unwrap();
        let early = sine.render(-64, 64).unwrap();
        assert_eq!(&whole.samples()[..64], early.samples());
        assert_eq!(&whole.samples()[64..], late.samples());
    }
}
