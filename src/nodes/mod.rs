//! Built-in processing elements and sinks.
//!
//! Elements are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! Generate audio from nothing but their parameters:
//! - [`ArraySource`] - Play an in-memory sample array
//! - [`WavReader`] - Decode a WAV file into memory
//! - [`Sine`] - Phase-exact sine oscillator
//! - [`Constant`], [`Ramp`], [`Piecewise`] - Control curves
//! - [`Random`] - Noise, sample & hold and random walks
//! - [`KarplusStrong`] - Plucked string synthesis
//!
//! ## Effects ([`effect`])
//!
//! Combine or transform other elements:
//! - [`Mix`], [`Sequence`] - Sum children, or place them on a timeline
//! - [`Delay`], [`Crop`], [`Slice`], [`SetExtent`], [`Loop`], [`TimeWarp`] - Move and cut in time
//! - [`Gain`], [`Transform`], [`SlewLimiter`] - Per-sample shaping
//! - [`Biquad`] - Second-order filters
//! - [`Compressor`], [`EnvDetect`] - Dynamics
//! - [`Reverb`] - Convolution with an impulse response
//! - [`RandomSelect`] - Trigger-driven choice between streams
//! - [`Spatial`] - Panning and channel adaptation
//! - [`WavWriter`] - Record a stream while passing it through
//!
//! ## Sinks ([`sink`])
//!
//! Consume rendered blocks; driven by a [`Renderer`](crate::Renderer):
//! - [`MemorySink`] - Collect into a [`Buffer`](crate::Buffer)
//! - [`WavSink`] - Write a WAV file
//! - [`RtrbSink`] - Write to a ring buffer
//! - [`CpalSink`] - Output to a system audio device (requires `cpal_sink` feature)

pub mod effect;
pub mod sink;
pub mod source;

// Re-export common types at the top level for convenience
pub use effect::*;
pub use sink::*;
pub use source::*;
