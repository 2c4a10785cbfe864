mod biquad;
mod compressor;
mod crop;
mod delay;
mod gain;
mod looping;
mod mix;
mod random_select;
mod reverb;
mod sequence;
mod set_extent;
mod slew_limiter;
mod spatial;
mod time_warp;
mod transform;
mod wav_writer;

pub use biquad::*;
pub use compressor::*;
pub use crop::*;
pub use delay::*;
pub use gain::*;
pub use looping::*;
pub use mix::*;
pub use random_select::*;
pub use reverb::*;
pub use sequence::*;
pub use set_extent::*;
pub use slew_limiter::*;
pub use spatial::*;
pub use time_warp::*;
pub use transform::*;
pub use wav_writer::*;
