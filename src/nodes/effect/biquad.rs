//! Biquad filter
//!
//! Second-order IIR sections with coefficients from the RBJ audio EQ
//! cookbook. Cascade two sections at the same cutoff for a 4th-order slope.

use core::f64::consts::TAU;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{silence_outside, Pe, ProcessContext, ProcessingElement, RenderCursor};

/// Filter response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterMode {
    LowPass,
    HighPass,
    /// Constant 0 dB peak gain at the center frequency.
    BandPass,
    Notch,
    AllPass,
    Peaking { gain_db: f32 },
    LowShelf { gain_db: f32 },
    HighShelf { gain_db: f32 },
}

/// Normalized coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Coefficients {
    /// Design a section. `frequency` must lie strictly between 0 and Nyquist
    /// and `q` must be positive.
    pub fn design(mode: FilterMode, frequency: f32, q: f32, sample_rate: u32) -> Result<Self> {
        let nyquist = sample_rate as f32 / 2.0;
        if !(frequency > 0.0 && frequency < nyquist) {
            return Err(Error::config(format!(
                "filter frequency {frequency} Hz must lie in (0, {nyquist})"
            )));
        }
        if !(q > 0.0) {
            return Err(Error::config(format!("filter Q must be positive, got {q}")));
        }

        let w0 = TAU * frequency as f64 / sample_rate as f64;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q as f64);
        let shelf_gain = |db: f32| 10f64.powf(db as f64 / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match mode {
            FilterMode::LowPass => {
                let b = (1.0 - cos) / 2.0;
                (b, 1.0 - cos, b, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterMode::HighPass => {
                let b = (1.0 + cos) / 2.0;
                (b, -(1.0 + cos), b, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterMode::BandPass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos, 1.0 - alpha),
            FilterMode::Notch => (1.0, -2.0 * cos, 1.0, 1.0 + alpha, -2.0 * cos, 1.0 - alpha),
            FilterMode::AllPass => (
                1.0 - alpha,
                -2.0 * cos,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos,
                1.0 - alpha,
            ),
            FilterMode::Peaking { gain_db } => {
                let a = shelf_gain(gain_db);
                (
                    1.0 + alpha * a,
                    -2.0 * cos,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos,
                    1.0 - alpha / a,
                )
            }
            FilterMode::LowShelf { gain_db } => {
                let a = shelf_gain(gain_db);
                let k = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos + k),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
                    a * ((a + 1.0) - (a - 1.0) * cos - k),
                    (a + 1.0) + (a - 1.0) * cos + k,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos),
                    (a + 1.0) + (a - 1.0) * cos - k,
                )
            }
            FilterMode::HighShelf { gain_db } => {
                let a = shelf_gain(gain_db);
                let k = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos + k),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
                    a * ((a + 1.0) + (a - 1.0) * cos - k),
                    (a + 1.0) - (a - 1.0) * cos + k,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos),
                    (a + 1.0) - (a - 1.0) * cos - k,
                )
            }
        };

        Ok(Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        })
    }
}

/// Direct form I history: last two inputs and outputs.
#[derive(Debug, Clone, Copy, Default)]
struct History {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl History {
    #[inline]
    fn process(&mut self, c: &Coefficients, x: f64) -> f64 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// A biquad filter over every channel of `source`.
///
/// Filter history persists between renders, so renders must be contiguous.
pub struct Biquad {
    source: Pe,
    mode: FilterMode,
    coefficients: Coefficients,
    history: Vec<History>,
    cursor: RenderCursor,
}

impl Biquad {
    pub fn new(
        ctx: &ProcessContext,
        source: impl Into<Pe>,
        mode: FilterMode,
        frequency: f32,
        q: f32,
    ) -> Result<Self> {
        let source = source.into();
        let coefficients = Coefficients::design(mode, frequency, q, ctx.sample_rate)?;
        Ok(Self {
            history: vec![History::default(); source.channel_count()],
            source,
            mode,
            coefficients,
            cursor: RenderCursor::new("Biquad"),
        })
    }

    pub fn lowpass(ctx: &ProcessContext, source: impl Into<Pe>, frequency: f32, q: f32) -> Result<Self> {
        Self::new(ctx, source, FilterMode::LowPass, frequency, q)
    }

    pub fn highpass(ctx: &ProcessContext, source: impl Into<Pe>, frequency: f32, q: f32) -> Result<Self> {
        Self::new(ctx, source, FilterMode::HighPass, frequency, q)
    }

    pub fn bandpass(ctx: &ProcessContext, source: impl Into<Pe>, frequency: f32, q: f32) -> Result<Self> {
        Self::new(ctx, source, FilterMode::BandPass, frequency, q)
    }

    #[inline]
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    #[inline]
    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }
}

impl ProcessingElement for Biquad {
    fn extent(&self) -> Extent {
        self.source.extent()
    }

    fn channel_count(&self) -> usize {
        self.history.len()
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.cursor.advance(start, count)?;
        let mut out = self.source.render_window(start, count)?;

        let c = self.coefficients;
        for frame in 0..count {
            for (ch, h) in self.history.iter_mut().enumerate() {
                let y = h.process(&c, out.get(frame, ch) as f64);
                out.set(frame, ch, y as f32);
            }
        }

        silence_outside(&mut out, &self.source.extent(), start);
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.cursor.reset();
        self.history.iter_mut().for_each(|h| *h = History::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::source::ArraySource;

    const SR: u32 = 48_000;

    fn impulse(len: usize) -> Pe {
        let mut v = vec![0.0; len];
        v[0] = 1.0;
        Pe::new(ArraySource::mono(v))
    }

    /// Magnitude of the DFT of `h` at `freq`.
    fn magnitude(h: &[f32], freq: f64) -> f64 {
        let w = TAU * freq / SR as f64;
        let (re, im) = h.iter().enumerate().fold((0.0, 0.0), |(re, im), (n, &x)| {
            let phase = w * n as f64;
            (re + x as f64 * phase.cos(), im - x as f64 * phase.sin())
        });
        (re * re + im * im).sqrt()
    }

    fn butterworth(freq: f64, cutoff: f64) -> f64 {
        let t = |f: f64| (core::f64::consts::PI * f / SR as f64).tan();
        1.0 / (1.0 + (t(freq) / t(cutoff)).powi(4)).sqrt()
    }

    #[test]
    fn lowpass_matches_closed_form_response() {
        let ctx = ProcessContext::new(SR);
        let fc = 1000.0;
        let mut lp = Biquad::lowpass(&ctx, impulse(8192), fc as f32, 0.707).unwrap();
        let h = lp.render(0, 8192).unwrap().channel(0);

        for f in [fc / 2.0, fc, 2.0 * fc] {
            let got = magnitude(&h, f);
            let want = butterworth(f, fc);
            assert!(
                (got - want).abs() < 0.01,
                "at {f} Hz: got {got:.4}, expected {want:.4}"
            );
        }
    }

    #[test]
    fn cascade_squares_the_response() {
        let ctx = ProcessContext::new(SR);
        let first = Biquad::lowpass(&ctx, impulse(8192), 1000.0, 0.707).unwrap();
        let mut second = Biquad::lowpass(&ctx, first, 1000.0, 0.707).unwrap();
        let h = second.render(0, 8192).unwrap().channel(0);
        let want = butterworth(2000.0, 1000.0).powi(2);
        assert!((magnitude(&h, 2000.0) - want).abs() < 0.01);
    }

    #[test]
    fn highpass_blocks_dc() {
        let ctx = ProcessContext::new(SR);
        let dc = crate::nodes::source::Constant::new(1.0);
        let mut hp = Biquad::highpass(&ctx, dc, 200.0, 0.707).unwrap();
        let out = hp.render(0, 48_000).unwrap();
        assert!(out.get(47_999, 0).abs() < 1e-4);
    }

    #[test]
    fn history_carries_across_blocks() {
        let ctx = ProcessContext::new(SR);
        let whole = Biquad::bandpass(&ctx, impulse(512), 3000.0, 2.0)
            .unwrap()
            .render(0, 512)
            .unwrap();
        let mut split = Biquad::bandpass(&ctx, impulse(512), 3000.0, 2.0).unwrap();
        let mut pieces = split.render(0, 100).unwrap().into_samples();
        pieces.extend(split.render(100, 412).unwrap().into_samples());
        assert_eq!(whole.samples(), &pieces[..]);
        assert!(matches!(split.render(0, 1), Err(Error::NonContiguous { .. })));
    }

    #[test]
    fn rejects_bad_parameters() {
        let ctx = ProcessContext::new(SR);
        assert!(Biquad::lowpass(&ctx, impulse(4), 1000.0, 0.0).is_err());
        assert!(Biquad::lowpass(&ctx, impulse(4), 0.0, 0.7).is_err());
        assert!(Biquad::lowpass(&ctx, impulse(4), 24_000.0, 0.7).is_err());
    }

    #[test]
    fn peaking_boosts_at_center() {
        let c = Coefficients::design(FilterMode::Peaking { gain_db: 6.0 }, 1000.0, 1.0, SR).unwrap();
        let w = TAU * 1000.0 / SR as f64;
        let z1 = (w.cos(), -w.sin());
        let z2 = ((2.0 * w).cos(), -(2.0 * w).sin());
        let num = (c.b0 + c.b1 * z1.0 + c.b2 * z2.0, c.b1 * z1.1 + c.b2 * z2.1);
        let den = (1.0 + c.a1 * z1.0 + c.a2 * z2.0, c.a1 * z1.1 + c.a2 * z2.1);
        let gain = (num.0.hypot(num.1) / den.0.hypot(den.1)).log10() * 20.0;
        assert!((gain - 6.0).abs() < 1e-6);
    }
}
