//! CPAL device discovery and sink creation.
//!
//! This module provides [`CpalDevice`] for discovering and selecting audio output devices.
//!
//! # Example: List and Select a Device
//!
//! ```no_run
//! use gmu::{CpalDevice, ProcessContext, Renderer, Sine};
//!
//! // List all available output devices
//! let devices = CpalDevice::list_outputs();
//! for (i, device) in devices.iter().enumerate() {
//!     println!("[{}] {} ({} Hz, {} ch)",
//!         i, device.name(), device.sample_rate(), device.channels());
//! }
//!
//! // Use a specific device
//! let device = &devices[0];
//! let ctx = ProcessContext::new(device.sample_rate());
//! let mut renderer = Renderer::new(ctx, device.create_sink())
//!     .unwrap()
//!     .with_source(Sine::new(&ctx, 440.0));
//! let mut session = renderer.start().unwrap();
//! session.play(ctx.sample_rate as usize).unwrap();
//! session.finish().unwrap();
//! ```

use cpal::traits::{DeviceTrait, HostTrait};
use tracing::debug;

use crate::nodes::sink::CpalSink;

/// A discovered audio output device.
///
/// Use [`CpalDevice::default_output`] to get the system default, or
/// [`CpalDevice::list_outputs`] to enumerate all available devices.
///
/// Once you have a device, use [`create_sink`](Self::create_sink) to create
/// a [`CpalSink`] for a [`Renderer`](crate::Renderer).
pub struct CpalDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    name: String,
}

impl CpalDevice {
    fn from_device(device: cpal::Device) -> Option<Self> {
        let config = device.default_output_config().ok()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Some(Self {
            device,
            config,
            name,
        })
    }

    /// Get the system's default output device.
    ///
    /// Returns `None` if no audio device is available.
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        let device = Self::from_device(host.default_output_device()?)?;
        debug!(
            name = device.name(),
            sample_rate = device.sample_rate(),
            channels = device.channels(),
            "default output device"
        );
        Some(device)
    }

    /// List all available audio output devices.
    ///
    /// Returns an empty list if no devices are found or if enumeration fails.
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(Self::from_device).collect())
            .unwrap_or_default()
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device's sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    /// Get the number of output channels.
    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    /// Create a sink that outputs audio to this device.
    ///
    /// The stream starts when a render session opens the sink. If the graph
    /// runs at a different rate than the device, a warning is logged and
    /// playback is pitched accordingly.
    pub fn create_sink(&self) -> CpalSink {
        CpalSink::new(&self.device, &self.config)
    }
}
