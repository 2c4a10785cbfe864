//! Mix - sums several elements sample by sample.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement};

/// Sums its inputs over the same absolute window.
///
/// The output has as many channels as the widest input. A mono input is
/// copied to every output channel; an input with fewer channels than the
/// output repeats its last channel. Inputs are silent outside their own
/// extents, so the mix covers the union of their extents.
pub struct Mix {
    inputs: Vec<Pe>,
    channels: usize,
}

impl Mix {
    pub fn new(inputs: impl IntoIterator<Item = Pe>) -> Self {
        let inputs: Vec<Pe> = inputs.into_iter().collect();
        let channels = inputs.iter().map(Pe::channel_count).max().unwrap_or(1);
        Self { inputs, channels }
    }
}

impl ProcessingElement for Mix {
    fn extent(&self) -> Extent {
        self.inputs
            .iter()
            .fold(Extent::empty(), |acc, pe| acc.union(&pe.extent()))
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = Buffer::zeros(self.channels, count);
        for input in &self.inputs {
            if input.extent().overlap(start, count).is_none() {
                continue;
            }
            out.add_from(&input.render_window(start, count)?, 0);
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.inputs.iter().for_each(Pe::reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::source::{ArraySource, Constant, Sine};
    use crate::ProcessContext;
    use proptest::prelude::*;

    #[test]
    fn upmixes_mono_inputs() {
        let mono = Pe::new(ArraySource::mono(vec![1.0, 1.0]));
        let stereo = Pe::new(ArraySource::new(vec![0.5, -0.5, 0.5, -0.5], 2));
        let mut mix = Mix::new([mono, stereo]);
        assert_eq!(mix.channel_count(), 2);
        let out = mix.render(0, 2).unwrap();
        assert_eq!(out.samples(), &[1.5, 0.5, 1.5, 0.5]);
    }

    #[test]
    fn extent_is_union_and_gaps_are_silent() {
        let a = Pe::new(Constant::new(1.0).with_extent(Extent::finite(0, 2)));
        let b = Pe::new(Constant::new(2.0).with_extent(Extent::finite(4, 6)));
        let mut mix = Mix::new([a, b]);
        assert_eq!(mix.extent(), Extent::finite(0, 6));
        let out = mix.render(0, 6).unwrap();
        assert_eq!(out.samples(), &[1.0, 1.0, 0.0, 0.0, 2.0, 2.0]);
    }

    #[test]
    fn empty_mix_is_silent() {
        let mut mix = Mix::new(Vec::<Pe>::new());
        assert!(mix.extent().is_empty());
        assert_eq!(mix.render(0, 3).unwrap().samples(), &[0.0; 3]);
    }

    proptest! {
        #[test]
        fn commutative_and_associative(f1 in 50.0f32..2000.0, f2 in 50.0f32..2000.0, f3 in 50.0f32..2000.0, start in -10_000i64..10_000) {
            let ctx = ProcessContext::new(48_000);
            let a = Pe::new(Sine::new(&ctx, f1));
            let b = Pe::new(Sine::new(&ctx, f2));
            let c = Pe::new(Sine::new(&ctx, f3));

            let abc = Mix::new([a.clone(), b.clone(), c.clone()]).render(start, 64).unwrap();
            let cba = Mix::new([c.clone(), b.clone(), a.clone()]).render(start, 64).unwrap();
            let nested = Mix::new([Pe::new(Mix::new([a, b])), c]).render(start, 64).unwrap();

            for i in 0..64 {
                prop_assert!((abc.get(i, 0) - cba.get(i, 0)).abs() < 1e-6);
                prop_assert!((abc.get(i, 0) - nested.get(i, 0)).abs() < 1e-6);
            }
        }
    }
}
