//! Convolution reverb.
//!
//! Short impulse responses are convolved directly in the time domain.
//! Longer ones use uniformly partitioned overlap-save convolution: the IR is
//! cut into blocks of [`PARTITION`] samples whose spectra are multiplied
//! against a frequency-domain delay line of past input blocks.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{silence_outside, Pe, ProcessingElement, RenderCursor};

/// IRs up to this many taps are convolved directly.
pub const DIRECT_MAX_TAPS: usize = 64;

/// Block length of the partitioned convolver.
pub const PARTITION: usize = 256;

/// Time-domain FIR convolution for short IRs.
struct Direct {
    taps: Vec<f32>,
    /// Last `taps.len() - 1` inputs, oldest first.
    history: Vec<f32>,
}

impl Direct {
    fn new(taps: Vec<f32>) -> Self {
        let keep = taps.len().saturating_sub(1);
        Self {
            taps,
            history: vec![0.0; keep],
        }
    }

    fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let keep = self.history.len();
        let mut ext = std::mem::take(&mut self.history);
        ext.extend_from_slice(input);

        let out = (0..input.len())
            .map(|i| {
                self.taps
                    .iter()
                    .enumerate()
                    .map(|(k, h)| h * ext[keep + i - k])
                    .sum()
            })
            .collect();

        self.history = ext.split_off(ext.len() - keep);
        out
    }
}

/// Uniformly partitioned overlap-save convolution.
struct Partitioned {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Spectra of the zero-padded IR partitions.
    partitions: Vec<Vec<Complex<f32>>>,
    /// Spectra of recent input blocks, newest first.
    delay_line: VecDeque<Vec<Complex<f32>>>,
    previous: Vec<f32>,
}

impl Partitioned {
    fn new(taps: &[f32]) -> Self {
        let size = 2 * PARTITION;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        let partitions: Vec<Vec<Complex<f32>>> = taps
            .chunks(PARTITION)
            .map(|chunk| {
                let mut spectrum = vec![Complex::new(0.0, 0.0); size];
                for (bin, &h) in spectrum.iter_mut().zip(chunk) {
                    bin.re = h;
                }
                fft.process(&mut spectrum);
                spectrum
            })
            .collect();
        let delay_line = (0..partitions.len())
            .map(|_| vec![Complex::new(0.0, 0.0); size])
            .collect();

        Self {
            fft,
            ifft,
            partitions,
            delay_line,
            previous: vec![0.0; PARTITION],
        }
    }

    /// Convolve exactly one block of [`PARTITION`] samples.
    fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let size = 2 * PARTITION;
        let mut spectrum: Vec<Complex<f32>> = self
            .previous
            .iter()
            .chain(input)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        self.fft.process(&mut spectrum);
        self.delay_line.pop_back();
        self.delay_line.push_front(spectrum);

        let mut acc = vec![Complex::new(0.0, 0.0); size];
        for (x, h) in self.delay_line.iter().zip(&self.partitions) {
            for ((a, x), h) in acc.iter_mut().zip(x).zip(h) {
                *a += x * h;
            }
        }
        self.ifft.process(&mut acc);
        self.previous.copy_from_slice(input);

        let norm = 1.0 / size as f32;
        acc[PARTITION..].iter().map(|c| c.re * norm).collect()
    }
}

enum Convolver {
    Direct(Direct),
    Partitioned(Partitioned),
}

impl Convolver {
    fn new(taps: Vec<f32>) -> Self {
        if taps.len() <= DIRECT_MAX_TAPS {
            Convolver::Direct(Direct::new(taps))
        } else {
            Convolver::Partitioned(Partitioned::new(&taps))
        }
    }

    /// Input frames consumed per call, if fixed.
    fn block(&self) -> Option<usize> {
        match self {
            Convolver::Direct(_) => None,
            Convolver::Partitioned(_) => Some(PARTITION),
        }
    }

    fn process(&mut self, input: &[f32]) -> Vec<f32> {
        match self {
            Convolver::Direct(d) => d.process(input),
            Convolver::Partitioned(p) => p.process(input),
        }
    }
}

/// Convolves `source` with an impulse response and blends the result with
/// the dry signal: `out = (1 - mix) * dry + mix * wet`.
///
/// The IR is rendered once at construction and must have a finite, non-empty
/// extent. Output channel `c` uses IR channel `c % ir_channels`, so a stereo
/// IR turns a mono source into a stereo one. The output extent is the dry
/// extent with the convolution tail (`ir_len - 1` frames) added at the end.
///
/// Renders must be contiguous. The source is read ahead in whole partitions.
pub struct Reverb {
    source: Pe,
    mix: f32,
    ir_len: usize,
    channels: usize,
    convolvers: Vec<Convolver>,
    cursor: RenderCursor,
    /// Interleaved dry and wet frames already computed, from the cursor on.
    dry: VecDeque<f32>,
    wet: VecDeque<f32>,
    /// One past the last source frame pulled.
    pulled: i64,
}

impl Reverb {
    pub fn new(source: impl Into<Pe>, ir: impl Into<Pe>, mix: f32) -> Result<Self> {
        let source = source.into();
        let ir = ir.into();
        let extent = ir.extent();
        let (Some(ir_start), Some(ir_len)) = (extent.start(), extent.duration()) else {
            return Err(Error::Extent {
                operation: "using an impulse response",
                extent,
            });
        };
        if ir_len <= 0 {
            return Err(Error::config("impulse response is empty"));
        }
        let ir_len = ir_len as usize;
        let response = ir.render(ir_start, ir_len)?;

        let channels = source.channel_count().max(response.channels());
        let convolvers = (0..channels)
            .map(|c| Convolver::new(response.channel(c % response.channels())))
            .collect();

        Ok(Self {
            source,
            mix: mix.clamp(0.0, 1.0),
            ir_len,
            channels,
            convolvers,
            cursor: RenderCursor::new("Reverb"),
            dry: VecDeque::new(),
            wet: VecDeque::new(),
            pulled: 0,
        })
    }

    /// Fully wet convolution.
    pub fn convolve(source: impl Into<Pe>, ir: impl Into<Pe>) -> Result<Self> {
        Self::new(source, ir, 1.0)
    }

    #[inline]
    pub fn ir_len(&self) -> usize {
        self.ir_len
    }

    #[inline]
    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Pull and convolve source frames until frame `until` is available.
    fn pull_to(&mut self, until: i64) -> Result<()> {
        while self.pulled < until {
            let frames = self
                .convolvers
                .first()
                .and_then(Convolver::block)
                .unwrap_or((until - self.pulled) as usize);
            let block = self.source.render_window(self.pulled, frames)?;

            let wet: Vec<Vec<f32>> = self
                .convolvers
                .iter_mut()
                .enumerate()
                .map(|(c, conv)| {
                    let input: Vec<f32> = (0..frames).map(|i| block.mapped(i, c)).collect();
                    conv.process(&input)
                })
                .collect();

            for i in 0..frames {
                for (c, w) in wet.iter().enumerate() {
                    self.dry.push_back(block.mapped(i, c));
                    self.wet.push_back(w[i]);
                }
            }
            self.pulled += frames as i64;
        }
        Ok(())
    }
}

impl ProcessingElement for Reverb {
    fn extent(&self) -> Extent {
        let dry = self.source.extent();
        Extent::new(dry.start(), dry.end().map(|e| e + self.ir_len as i64 - 1))
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        if self.cursor.position().is_none() {
            self.pulled = start;
        }
        self.cursor.advance(start, count)?;
        self.pull_to(start + count as i64)?;

        let (dry_gain, wet_gain) = (1.0 - self.mix, self.mix);
        let samples = self
            .dry
            .drain(..count * self.channels)
            .zip(self.wet.drain(..count * self.channels))
            .map(|(d, w)| dry_gain * d + wet_gain * w)
            .collect();
        let mut out = Buffer::from_interleaved(self.channels, samples);
        silence_outside(&mut out, &self.extent(), start);
        Ok(out)
    }

    fn reset(&mut self) {
        self.source.reset();
        self.cursor.reset();
        self.dry.clear();
        self.wet.clear();
        for conv in &mut self.convolvers {
            match conv {
                Convolver::Direct(d) => d.history.iter_mut().for_each(|x| *x = 0.0),
                Convolver::Partitioned(p) => {
                    p.previous.iter_mut().for_each(|x| *x = 0.0);
                    for spectrum in p.delay_line.iter_mut() {
                        spectrum.iter_mut().for_each(|x| *x = Complex::new(0.0, 0.0));
                    }
                }
            }
        }
    }
}
