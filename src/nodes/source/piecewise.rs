//! Breakpoint envelopes.

use itertools::Itertools;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::ProcessingElement;

/// How a [`Piecewise`] envelope moves between two breakpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransitionType {
    /// Hold the value of the most recent breakpoint.
    Step,
    /// Straight line.
    #[default]
    Linear,
    /// Raised-cosine ease in and out.
    Smooth,
}

/// A mono envelope through a list of `(frame, value)` breakpoints.
///
/// The extent runs from the first breakpoint up to and including the last.
#[derive(Clone, Debug)]
pub struct Piecewise {
    points: Vec<(i64, f32)>,
    transition: TransitionType,
}

impl Piecewise {
    /// Breakpoints must be non-empty and sorted by time.
    pub fn new(points: Vec<(i64, f32)>, transition: TransitionType) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::config("piecewise envelope needs at least one breakpoint"));
        }
        if points.iter().tuple_windows().any(|(a, b)| b.0 < a.0) {
            return Err(Error::config("piecewise breakpoints must be sorted by time"));
        }
        Ok(Self { points, transition })
    }

    pub fn linear(points: Vec<(i64, f32)>) -> Result<Self> {
        Self::new(points, TransitionType::Linear)
    }

    pub fn step(points: Vec<(i64, f32)>) -> Result<Self> {
        Self::new(points, TransitionType::Step)
    }

    fn value_at(&self, segment: usize, t: i64) -> f32 {
        let (t0, v0) = self.points[segment];
        let Some(&(t1, v1)) = self.points.get(segment + 1) else {
            return v0;
        };
        if t1 == t0 {
            return v1;
        }
        let x = (t - t0) as f64 / (t1 - t0) as f64;
        let shaped = match self.transition {
            TransitionType::Step => 0.0,
            TransitionType::Linear => x,
            TransitionType::Smooth => 0.5 - 0.5 * (x * core::f64::consts::PI).cos(),
        };
        (v0 as f64 + (v1 - v0) as f64 * shaped) as f32
    }
}

impl ProcessingElement for Piecewise {
    fn extent(&self) -> Extent {
        let first = self.points[0].0;
        let last = self.points[self.points.len() - 1].0;
        Extent::finite(first, last + 1)
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = Buffer::zeros(1, count);
        let Some((offset, frames)) = self.extent().overlap(start, count) else {
            return Ok(out);
        };

        // Index of the last breakpoint at or before the first rendered frame.
        let first = start + offset as i64;
        let mut segment = self.points.partition_point(|p| p.0 <= first).saturating_sub(1);
        for i in offset..offset + frames {
            let t = start + i as i64;
            while segment + 1 < self.points.len() && self.points[segment + 1].0 <= t {
                segment += 1;
            }
            out.set(i, 0, self.value_at(segment, t));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_holds_latest_breakpoint() {
        let mut env = Piecewise::step(vec![(0, 1.0), (3, 0.0), (4, 1.0)]).unwrap();
        assert_eq!(env.extent(), Extent::finite(0, 5));
        let out = env.render(0, 6).unwrap();
        assert_eq!(out.samples(), &[1.0, 1.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn linear_interpolates_between_points() {
        let mut env = Piecewise::linear(vec![(10, 0.0), (14, 1.0), (16, 0.0)]).unwrap();
        let out = env.render(12, 5).unwrap();
        assert_eq!(out.samples(), &[0.5, 0.75, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn smooth_passes_through_midpoint() {
        let mut env = Piecewise::new(vec![(0, 0.0), (4, 1.0)], TransitionType::Smooth).unwrap();
        let out = env.render(0, 5).unwrap();
        assert!((out.get(2, 0) - 0.5).abs() < 1e-6);
        assert!(out.get(1, 0) < 0.25);
        assert_eq!(out.get(4, 0), 1.0);
    }

    #[test]
    fn rejects_bad_breakpoints() {
        assert!(Piecewise::linear(vec![]).is_err());
        assert!(Piecewise::linear(vec![(5, 0.0), (2, 1.0)]).is_err());
    }
}
