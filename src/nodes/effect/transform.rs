//! Transform - applies a function to every sample.

use std::fmt;

use delegate::delegate;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::extent::Extent;
use crate::node::{silence_outside, Pe, ProcessingElement};

/// Maps every sample of `source` through `f`.
///
/// Handy for unit conversions on control streams, e.g.
/// `Transform::new(envelope_db, db_to_ratio)`.
pub struct Transform {
    source: Pe,
    f: Box<dyn Fn(f32) -> f32>,
}

impl Transform {
    pub fn new(source: impl Into<Pe>, f: impl Fn(f32) -> f32 + 'static) -> Self {
        Self {
            source: source.into(),
            f: Box::new(f),
        }
    }
}

impl ProcessingElement for Transform {
    delegate! {
        to self.source {
            fn extent(&self) -> Extent;
            fn channel_count(&self) -> usize;
            fn reset(&mut self);
        }
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let mut out = self.source.render_window(start, count)?;
        out.samples_mut().iter_mut().for_each(|s| *s = (self.f)(*s));
        silence_outside(&mut out, &self.source.extent(), start);
        Ok(out)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform").field("source", &self.source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::db_to_ratio;
    use crate::nodes::source::ArraySource;

    #[test]
    fn converts_decibels_inside_the_extent_only() {
        let db = ArraySource::mono(vec![0.0, -20.0]);
        let mut t = Transform::new(db, db_to_ratio);
        let out = t.render(-1, 4).unwrap();
        assert_eq!(out.get(0, 0), 0.0);
        assert!((out.get(1, 0) - 1.0).abs() < 1e-6);
        assert!((out.get(2, 0) - 0.1).abs() < 1e-6);
        assert_eq!(out.get(3, 0), 0.0);
    }
}
