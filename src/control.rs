//! Parameters that are either fixed or driven by another element.

use crate::error::Result;
use crate::extent::Extent;
use crate::node::Pe;

/// A parameter value: a constant, or the first channel of a control stream.
#[derive(Clone, Debug)]
pub enum Control {
    Const(f32),
    Stream(Pe),
}

impl Control {
    /// Values of the parameter for each frame of `[start, start + count)`.
    ///
    /// A stream is silent (zero) outside its extent.
    pub fn values(&self, start: i64, count: usize) -> Result<Vec<f32>> {
        match self {
            Control::Const(v) => Ok(vec![*v; count]),
            Control::Stream(pe) => Ok(pe.render_window(start, count)?.channel(0)),
        }
    }

    /// Where the parameter is defined.
    pub fn extent(&self) -> Extent {
        match self {
            Control::Const(_) => Extent::unbounded(),
            Control::Stream(pe) => pe.extent(),
        }
    }

    pub fn reset(&self) {
        if let Control::Stream(pe) = self {
            pe.reset();
        }
    }
}

impl From<f32> for Control {
    fn from(v: f32) -> Self {
        Control::Const(v)
    }
}

impl From<Pe> for Control {
    fn from(pe: Pe) -> Self {
        Control::Stream(pe)
    }
}
