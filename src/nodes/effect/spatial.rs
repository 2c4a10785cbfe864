//! Panning laws and channel adaptation.

use crate::buffer::Buffer;
use crate::control::Control;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::node::{Pe, ProcessingElement};

/// Hard left and hard right, in degrees.
pub const MAX_AZIMUTH: f32 = 90.0;

/// Left/right gains for a linear pan. Loudness dips towards the center.
#[inline]
pub fn linear_pan(azimuth: f32) -> (f32, f32) {
    let p = (azimuth.clamp(-MAX_AZIMUTH, MAX_AZIMUTH) + MAX_AZIMUTH) / (2.0 * MAX_AZIMUTH);
    (1.0 - p, p)
}

/// Left/right gains with `left^2 + right^2 == 1` across the whole field.
#[inline]
pub fn constant_power_pan(azimuth: f32) -> (f32, f32) {
    let p = (azimuth.clamp(-MAX_AZIMUTH, MAX_AZIMUTH) + MAX_AZIMUTH) / (2.0 * MAX_AZIMUTH);
    let angle = p * core::f32::consts::FRAC_PI_2;
    (angle.cos(), angle.sin())
}

/// How [`Spatial`] places its source.
#[derive(Clone, Debug)]
pub enum SpatialMethod {
    /// Linear pan to a fixed azimuth in degrees (-90 left, 90 right).
    Linear { azimuth: f32 },
    /// Constant-power pan. The azimuth may be a control stream.
    ConstantPower { azimuth: Control },
    /// Convert to `channels` channels without any spatial effect.
    Adapter { channels: usize },
}

/// Places `source` in the stereo field, or adapts its channel count.
///
/// The panning laws fold the source to mono first and always output stereo.
/// The adapter duplicates a mono source to every channel, averages to mono
/// for a single output channel, and otherwise maps output channel `c` to
/// source channel `c % source_channels`.
pub struct Spatial {
    source: Pe,
    method: SpatialMethod,
}

impl Spatial {
    pub fn new(source: impl Into<Pe>, method: SpatialMethod) -> Result<Self> {
        if let SpatialMethod::Adapter { channels: 0 } = method {
            return Err(Error::config("channel adapter needs at least one channel"));
        }
        Ok(Self {
            source: source.into(),
            method,
        })
    }

    /// Duplicate or fold `source` to `channels` channels.
    pub fn adapter(source: impl Into<Pe>, channels: usize) -> Result<Self> {
        Self::new(source, SpatialMethod::Adapter { channels })
    }

    pub fn linear(source: impl Into<Pe>, azimuth: f32) -> Self {
        Self {
            source: source.into(),
            method: SpatialMethod::Linear { azimuth },
        }
    }

    pub fn constant_power(source: impl Into<Pe>, azimuth: impl Into<Control>) -> Self {
        Self {
            source: source.into(),
            method: SpatialMethod::ConstantPower {
                azimuth: azimuth.into(),
            },
        }
    }

    fn pan(input: &Buffer, gains: impl Iterator<Item = (f32, f32)>) -> Buffer {
        let channels = input.channels().max(1) as f32;
        let mut out = Buffer::zeros(2, input.frames());
        for ((i, frame), (l, r)) in input.iter_frames().enumerate().zip(gains) {
            let mono = frame.iter().sum::<f32>() / channels;
            out.set(i, 0, mono * l);
            out.set(i, 1, mono * r);
        }
        out
    }
}

impl ProcessingElement for Spatial {
    fn extent(&self) -> Extent {
        self.source.extent()
    }

    fn channel_count(&self) -> usize {
        match self.method {
            SpatialMethod::Adapter { channels } => channels,
            _ => 2,
        }
    }

    fn render(&mut self, start: i64, count: usize) -> Result<Buffer> {
        let input = self.source.render_window(start, count)?;
        match &self.method {
            SpatialMethod::Linear { azimuth } => {
                let gains = linear_pan(*azimuth);
                Ok(Self::pan(&input, std::iter::repeat(gains)))
            }
            SpatialMethod::ConstantPower { azimuth } => {
                let azimuths = azimuth.values(start, count)?;
                Ok(Self::pan(&input, azimuths.into_iter().map(constant_power_pan)))
            }
            SpatialMethod::Adapter { channels } => {
                let src = input.channels();
                if src == *channels {
                    return Ok(input);
                }
                let mut out = Buffer::zeros(*channels, count);
                for (i, frame) in input.iter_frames().enumerate() {
                    if *channels == 1 {
                        out.set(i, 0, frame.iter().sum::<f32>() / src as f32);
                    } else {
                        for c in 0..*channels {
                            out.set(i, c, frame[c % src]);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    fn reset(&mut self) {
        self.source.reset();
        if let SpatialMethod::ConstantPower { azimuth } = &self.method {
            azimuth.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::source::{ArraySource, Constant, Ramp};

    #[test]
    fn constant_power_keeps_loudness() {
        for az in [-90.0, -45.0, -10.0, 0.0, 30.0, 75.0, 90.0] {
            let (l, r) = constant_power_pan(az);
            assert!((l * l + r * r - 1.0).abs() < 1e-6, "azimuth {az}");
        }
        let (l, r) = constant_power_pan(0.0);
        assert!((l - r).abs() < 1e-6);
    }

    #[test]
    fn linear_law_endpoints() {
        assert_eq!(linear_pan(-90.0), (1.0, 0.0));
        assert_eq!(linear_pan(0.0), (0.5, 0.5));
        assert_eq!(linear_pan(90.0), (0.0, 1.0));
        assert_eq!(linear_pan(400.0), (0.0, 1.0));
    }

    #[test]
    fn linear_pan_of_stereo_folds_to_mono() {
        let src = ArraySource::new(vec![1.0, 0.0], 2);
        let mut sp = Spatial::linear(src, -90.0);
        assert_eq!(sp.channel_count(), 2);
        assert_eq!(sp.render(0, 1).unwrap().samples(), &[0.5, 0.0]);
    }

    #[test]
    fn animated_azimuth_sweeps_across() {
        let sweep = Pe::new(Ramp::new(-90.0, 90.0, 0, 4));
        let mut sp = Spatial::constant_power(Constant::new(1.0), sweep);
        let out = sp.render(0, 4).unwrap();
        assert!((out.get(0, 0) - 1.0).abs() < 1e-6 && out.get(0, 1).abs() < 1e-6);
        assert!(out.get(3, 1) > out.get(3, 0));
    }

    #[test]
    fn adapter_duplicates_and_folds() {
        let mut up = Spatial::adapter(ArraySource::mono(vec![0.5]), 2).unwrap();
        assert_eq!(up.render(0, 1).unwrap().samples(), &[0.5, 0.5]);

        let mut down = Spatial::adapter(ArraySource::new(vec![1.0, 0.0], 2), 1).unwrap();
        assert_eq!(down.render(0, 1).unwrap().samples(), &[0.5]);

        let mut wide = Spatial::adapter(ArraySource::new(vec![1.0, 2.0], 2), 4).unwrap();
        assert_eq!(wide.render(0, 1).unwrap().samples(), &[1.0, 2.0, 1.0, 2.0]);

        assert!(Spatial::adapter(ArraySource::mono(vec![]), 0).is_err());
    }
}
