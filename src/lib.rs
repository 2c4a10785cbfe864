//! gmu - pull-based audio graphs
//!
//! Design principles:
//! - A graph is a tree of processing elements, rendered on demand by frame range
//! - Every element has an [`Extent`], the frame range where it is non-silent
//! - Stateful elements must be rendered contiguously, and check it
//! - The graph lives on one thread; only finished blocks cross to the device
//! - Offline and real-time renders of a seeded graph are bit-identical
//!
//! # Example
//!
//! ```no_run
//! use gmu::{play_offline, KarplusStrong, Crop, Mix, Pe, ProcessContext};
//!
//! let ctx = ProcessContext::new(48000);
//! let chord: Vec<Pe> = [220.0, 277.2, 329.6]
//!     .iter()
//!     .map(|&f| {
//!         let pluck = KarplusStrong::new(&ctx, f, 0.996, 0.3).unwrap();
//!         Pe::new(Crop::range(pluck, 0, 2 * 48000))
//!     })
//!     .collect();
//! play_offline(&ctx, Mix::new(chord), "chord.wav").unwrap();
//! ```

mod buffer;
mod control;
pub mod dsp;
mod error;
mod extent;
mod node;
pub mod nodes;
mod renderer;

#[cfg(feature = "cpal_sink")]
mod device;

pub use buffer::Buffer;
pub use control::Control;
pub use error::{Error, Result};
pub use extent::Extent;
pub use node::{Pe, ProcessContext, ProcessingElement, RenderCursor};
pub use nodes::*;
pub use renderer::{play_offline, render_to_buffer, Renderer, Session, StopHandle};

#[cfg(feature = "cpal_sink")]
pub use device::CpalDevice;
#[cfg(feature = "cpal_sink")]
pub use renderer::play;

pub use dsp::{db_to_ratio, freq_to_pitch, pitch_to_freq, ratio_to_db, rho_for_decay_db};
