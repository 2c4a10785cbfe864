//! Trigger-driven random selection between candidate streams.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement, RenderCursor};

/// Trigger values at or above this count as high.
pub const TRIGGER_THRESHOLD: f32 = 0.5;

/// How [`RandomSelect`] reacts to the trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TriggerMode {
    /// Every rising edge picks a candidate and restarts it from its start.
    #[default]
    Retrigger,
    /// Rising edges are ignored while the current candidate is still
    /// playing.
    OneShot,
    /// Like `Retrigger`, but the output is silent while the trigger is low.
    Gated,
}

/// Plays one of several candidates, chosen uniformly at random on each
/// rising edge of a control-rate trigger.
///
/// A rising edge is a trigger frame at or above [`TRIGGER_THRESHOLD`] after
/// a frame below it; the frame before the first render counts as low. After
/// an edge at frame `e` the chosen candidate's first frame plays at `e`.
/// Between edges the candidate keeps advancing from its own cursor.
pub struct RandomSelect {
    trigger: Pe,
    candidates: Vec<Pe>,
    mode: TriggerMode,
    channels: usize,
    rng: StdRng,
    cursor: RenderCursor,
    was_high: bool,
    /// Candidate index and the frame it was started at.
    current: Option<(usize, i64)>,
    restarts: u64,
}

impl RandomSelect {
    pub fn new(
        trigger: impl Into<Pe>,
        candidates: impl IntoIterator<Item = Pe>,
        mode: TriggerMode,
    ) -> Result<Self> {
        let candidates: Vec<Pe> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(Error::config("random select needs at least one candidate"));
        }
        let channels = candidates.iter().map(Pe::channel_count).max().unwrap_or(1);
        Ok(Self {
            trigger: trigger.into(),
            candidates,
            mode,
            channels,
            rng: StdRng::from_entropy(),
            cursor: RenderCursor::new("RandomSelect"),
            was_high: false,
            current: None,
            restarts: 0,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of times a candidate has been (re)started.
    #[inline]
    pub fn restart_count(&self) -> u64 {
        self.restarts
    }

    /// Index of the candidate currently playing.
    #[inline]
    pub fn current(&self) -> Option<usize> {
        self.current.map(|(idx, _)| idx)
    }

    fn candidate_origin(&self, idx: usize) -> i64 {
        self.candidates[idx].extent().start().unwrap_or(0)
    }

    /// Whether the current candidate still has frames left at `t`.
    fn is_playing(&self, t: i64) -> bool {
        let Some((idx, started)) = self.current else {
            return false;
        };
        let local = self.candidate_origin(idx) + (t - started);
        self.candidates[idx].extent().end().map_or(true, |end| local < end)
    }

    fn restart(&mut self, t: i64) {
        let idx = self.rng.gen_range(0..self.candidates.len());
        self.candidates[idx].reset();
        self.current = Some((idx, t));
        self.restarts += 1;
    }

    /// Render the current candidate into `out[from..to]`.
    fn fill(&self, out: &mut Buffer, start: i64, from: usize, to: usize) -> Result<()> {
        let Some((idx, started)) = self.current else {
            return Ok(());
        };
        if to <= from {
            return Ok(());
        }
        let local = self.candidate_origin(idx) + (start + from as i64 - started);
        let part = self.candidates[idx].render_window(local, to - from)?;
        out.copy_from(&part, from);
        Ok(())
    }
}

impl ProcessingElement for RandomSelect {
    fn extent(&self) -> Extent {
        self.trigger.extent()
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        self.cursor.advance(start, count)?;
        let trigger = self.trigger.render_window(start, count)?.channel(0);

        let mut out = Buffer::zeros(self.channels, count);
        let mut segment = 0;
        for (i, &value) in trigger.iter().enumerate() {
            let t = start + i as i64;
            let high = value >= TRIGGER_THRESHOLD;
            let rising = high && !self.was_high;
            let falling = !high && self.was_high;
            self.was_high = high;

            let fire = match self.mode {
                TriggerMode::Retrigger | TriggerMode::Gated => rising,
                TriggerMode::OneShot => rising && !self.is_playing(t),
            };
            let stop = falling && self.mode == TriggerMode::Gated;
            if fire || stop {
                self.fill(&mut out, start, segment, i)?;
                segment = i;
                if fire {
                    self.restart(t);
                } else {
                    self.current = None;
                }
            }
        }
        self.fill(&mut out, start, segment, count)?;
        Ok(out)
    }

    fn reset(&mut self) {
        self.trigger.reset();
        self.candidates.iter().for_each(Pe::reset);
        self.cursor.reset();
        self.was_high = false;
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::effect::Loop;
    use crate::nodes::source::{Constant, Piecewise};

    const BEAT: i64 = 100;

    /// Three short pulses in a 14-beat bar.
    fn pattern() -> Pe {
        let b = |n: i64| n * BEAT;
        Pe::new(
            Piecewise::step(vec![
                (b(0), 1.0),
                (b(2) - 2, 1.0),
                (b(2) - 1, 0.0),
                (b(2), 1.0),
                (b(4) - 2, 1.0),
                (b(4) - 1, 0.0),
                (b(4), 1.0),
                (b(6) - 2, 1.0),
                (b(6) - 1, 0.0),
                (b(14) - 1, 0.0),
            ])
            .unwrap(),
        )
    }

    /// Five distinguishable one-beat candidates.
    fn candidates() -> Vec<Pe> {
        (1..=5)
            .map(|v| Pe::new(Constant::new(v as f32).with_extent(Extent::finite(0, BEAT))))
            .collect()
    }

    #[test]
    fn three_edges_three_restarts() {
        let mut sel = RandomSelect::new(pattern(), candidates(), TriggerMode::Retrigger)
            .unwrap()
            .with_seed(9);
        assert_eq!(sel.extent(), Extent::finite(0, 14 * BEAT));

        let out = sel.render(0, (14 * BEAT) as usize).unwrap();
        assert_eq!(sel.restart_count(), 3);

        for edge in [0, 2 * BEAT, 4 * BEAT] {
            let e = edge as usize;
            let v = out.get(e, 0);
            assert!((1.0..=5.0).contains(&v) && v.fract() == 0.0);
            // the candidate plays for one beat from the edge
            assert!(out.samples()[e..e + BEAT as usize].iter().all(|&s| s == v));
            assert_eq!(out.get(e + BEAT as usize, 0), 0.0);
        }
        assert!(out.samples()[6 * BEAT as usize..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn edges_found_across_block_boundaries() {
        let mut sel = RandomSelect::new(pattern(), candidates(), TriggerMode::Retrigger)
            .unwrap()
            .with_seed(4);
        for start in (0..14 * BEAT).step_by(64) {
            let n = 64.min(14 * BEAT - start) as usize;
            sel.render(start, n).unwrap();
        }
        assert_eq!(sel.restart_count(), 3);
    }

    #[test]
    fn selection_is_uniform() {
        let mut counts = [0u32; 5];
        for seed in 0..2000 {
            let mut sel = RandomSelect::new(pattern(), candidates(), TriggerMode::Retrigger)
                .unwrap()
                .with_seed(seed);
            let out = sel.render(0, (6 * BEAT) as usize).unwrap();
            for edge in [0, 2 * BEAT, 4 * BEAT] {
                counts[out.get(edge as usize, 0) as usize - 1] += 1;
            }
        }
        // 6000 picks, 1200 expected per candidate
        for (i, &c) in counts.iter().enumerate() {
            assert!((1050..=1350).contains(&c), "candidate {i} picked {c} times");
        }
    }

    #[test]
    fn looped_trigger_keeps_firing() {
        let trigger = Loop::new(pattern()).unwrap();
        let mut sel = RandomSelect::new(trigger, candidates(), TriggerMode::Retrigger)
            .unwrap()
            .with_seed(1);
        assert_eq!(sel.extent(), Extent::unbounded());
        sel.render(0, (28 * BEAT) as usize).unwrap();
        assert_eq!(sel.restart_count(), 6);
    }

    #[test]
    fn one_shot_ignores_edges_while_playing() {
        let long: Vec<Pe> = vec![Pe::new(
            Constant::new(1.0).with_extent(Extent::finite(0, 3 * BEAT)),
        )];
        let mut sel = RandomSelect::new(pattern(), long, TriggerMode::OneShot)
            .unwrap()
            .with_seed(0);
        sel.render(0, (14 * BEAT) as usize).unwrap();
        // fires at 0, ignores 2 beats (still playing), fires again at 4
        assert_eq!(sel.restart_count(), 2);
    }

    #[test]
    fn gated_mode_silences_while_low() {
        let held: Vec<Pe> = vec![Pe::new(Constant::new(1.0))];
        let mut sel = RandomSelect::new(pattern(), held, TriggerMode::Gated)
            .unwrap()
            .with_seed(0);
        let out = sel.render(0, (2 * BEAT) as usize).unwrap();
        assert_eq!(out.get(0, 0), 1.0);
        assert_eq!(out.get((2 * BEAT - 2) as usize, 0), 1.0);
        assert_eq!(out.get((2 * BEAT - 1) as usize, 0), 0.0);
    }

    #[test]
    fn needs_candidates() {
        assert!(RandomSelect::new(pattern(), Vec::new(), TriggerMode::Retrigger).is_err());
    }
}
