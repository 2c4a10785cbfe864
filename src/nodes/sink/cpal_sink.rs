//! CPAL audio output sink

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, SupportedStreamConfig};
use rtrb::{Consumer, RingBuffer};
use tracing::{debug, error, warn};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::node::ProcessContext;

use super::{RtrbSink, Sink};

/// Longest we wait for queued audio to play out on close.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A sink that outputs audio to a CPAL device
///
/// The CPAL stream runs on its own thread, started when a session opens and
/// stopped when it closes. Rendered blocks go through a ring buffer that the
/// stream consumes; writes wait while the ring is full, so rendering is paced
/// by the device.
pub struct CpalSink {
    device: cpal::Device,
    config: SupportedStreamConfig,
    /// Tracks how many samples CPAL has consumed
    samples_consumed: Arc<AtomicUsize>,
    /// Tracks underrun state for diagnostics
    had_underrun: Arc<AtomicBool>,
    running: Option<Running>,
}

struct Running {
    ring: RtrbSink,
    shutdown: Arc<AtomicBool>,
    thread: JoinHandle<()>,
    underruns: UnderrunWatch,
}

/// Reads the flag the stream callback raises when it finds the ring empty.
///
/// The stream starts before the first block arrives, so nothing counts until
/// a block has been written. Once the final drain begins the ring is meant
/// to run dry, so the last check happens before it.
struct UnderrunWatch {
    flag: Arc<AtomicBool>,
    primed: bool,
}

impl UnderrunWatch {
    fn new(flag: Arc<AtomicBool>) -> Self {
        flag.store(false, Ordering::Relaxed);
        Self { flag, primed: false }
    }

    /// Whether the device ran dry since the last check.
    fn check(&mut self) -> bool {
        let hit = self.flag.swap(false, Ordering::Relaxed);
        hit && self.primed
    }

    fn after_write(&mut self) -> bool {
        let hit = self.check();
        self.primed = true;
        hit
    }
}

impl CpalSink {
    /// Create a new sink for the given device and config
    pub fn new(device: &cpal::Device, config: &SupportedStreamConfig) -> Self {
        Self {
            device: device.clone(),
            config: config.clone(),
            samples_consumed: Arc::new(AtomicUsize::new(0)),
            had_underrun: Arc::new(AtomicBool::new(false)),
            running: None,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.config.channels() as usize
    }

    /// Returns how many samples have been played
    #[inline]
    pub fn samples_consumed(&self) -> usize {
        self.samples_consumed.load(Ordering::Relaxed)
    }

    /// Check and clear the underrun flag
    pub fn check_underrun(&self) -> bool {
        self.had_underrun.swap(false, Ordering::Relaxed)
    }

    fn spawn_stream(&self, consumer: Consumer<f32>, shutdown: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let device = self.device.clone();
        let sample_format = self.config.sample_format();
        let stream_config = self.config.config();
        let samples_consumed = self.samples_consumed.clone();
        let had_underrun = self.had_underrun.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<(), String>>(1);

        // The stream is not Send, so it lives and dies on this thread
        let thread = std::thread::Builder::new()
            .name("gmu-cpal-output".into())
            .spawn(move || {
                let stream = match build_stream(
                    &device,
                    sample_format,
                    &stream_config,
                    consumer,
                    samples_consumed,
                    had_underrun,
                ) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                while !shutdown.load(Ordering::Acquire) {
                    std::thread::park_timeout(Duration::from_millis(50));
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(thread),
            Ok(Err(msg)) => {
                let _ = thread.join();
                Err(Error::Device(msg))
            }
            Err(_) => Err(Error::Device("output stream thread exited early".into())),
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: SampleFormat,
    stream_config: &cpal::StreamConfig,
    consumer: Consumer<f32>,
    samples_consumed: Arc<AtomicUsize>,
    had_underrun: Arc<AtomicBool>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError> {
    match sample_format {
        SampleFormat::F32 => build_typed::<f32>(device, stream_config, consumer, samples_consumed, had_underrun),
        SampleFormat::I16 => build_typed::<i16>(device, stream_config, consumer, samples_consumed, had_underrun),
        SampleFormat::U16 => build_typed::<u16>(device, stream_config, consumer, samples_consumed, had_underrun),
        SampleFormat::I32 => build_typed::<i32>(device, stream_config, consumer, samples_consumed, had_underrun),
        other => {
            error!(format = ?other, "unsupported output sample format");
            Err(cpal::BuildStreamError::StreamConfigNotSupported)
        }
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut consumer: Consumer<f32>,
    samples_consumed: Arc<AtomicUsize>,
    had_underrun: Arc<AtomicBool>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    device.build_output_stream(
        stream_config,
        move |data: &mut [T], _| {
            let mut underrun = false;
            for sample in data.iter_mut() {
                let s = consumer.pop().unwrap_or_else(|_| {
                    underrun = true;
                    0.0
                });
                *sample = T::from_sample(s.clamp(-1.0, 1.0));
            }
            if underrun {
                had_underrun.store(true, Ordering::Relaxed);
            }
            samples_consumed.fetch_add(data.len(), Ordering::Relaxed);
        },
        |err| error!(%err, "cpal stream error"),
        None,
    )
}

impl Sink for CpalSink {
    fn open(&mut self, ctx: &ProcessContext, channels: usize) -> Result<()> {
        if self.running.is_some() {
            self.close()?;
        }
        let device_rate = self.sample_rate();
        if ctx.sample_rate != device_rate {
            warn!(
                graph = ctx.sample_rate,
                device = device_rate,
                "graph sample rate differs from the device, playback will be pitched"
            );
        }

        let device_channels = self.channels();
        // Ring buffer sized for ~100ms of audio to handle scheduling jitter
        let buffer_samples = ((device_rate as f32 * 0.1) as usize) * device_channels;
        let buffer_size = buffer_samples
            .max(ctx.block_size * device_channels)
            .next_power_of_two()
            .max(8192);
        let (producer, consumer) = RingBuffer::<f32>::new(buffer_size);

        let shutdown = Arc::new(AtomicBool::new(false));
        let underruns = UnderrunWatch::new(self.had_underrun.clone());
        let thread = self.spawn_stream(consumer, shutdown.clone())?;
        debug!(channels, device_channels, buffer_size, "output stream started");

        self.running = Some(Running {
            ring: RtrbSink::new(producer, device_channels),
            shutdown,
            thread,
            underruns,
        });
        Ok(())
    }

    fn write(&mut self, block: &Buffer) -> Result<()> {
        let running = self
            .running
            .as_mut()
            .ok_or_else(|| Error::Device("output stream is not open".into()))?;
        running.ring.write(block)?;
        if running.underruns.after_write() {
            warn!("output underrun, rendering is falling behind the device");
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };
        if running.underruns.check() {
            warn!("output underrun after the last block was written");
        }
        if !running.ring.drain(DRAIN_TIMEOUT) {
            warn!("output stream did not drain before close");
        }
        running.shutdown.store(true, Ordering::Release);
        running.thread.thread().unpark();
        running
            .thread
            .join()
            .map_err(|_| Error::Device("output stream thread panicked".into()))?;
        debug!(samples = self.samples_consumed(), "output stream stopped");
        Ok(())
    }

    fn is_realtime(&self) -> bool {
        true
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!(%e, "failed to stop output stream");
        }
    }
}
