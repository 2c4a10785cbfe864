//! Real-time playback: random plucks on a looping trigger pattern
//!
//! Run with: cargo run --example karplus_reverb
//!
//! Plays on the default output device for ten seconds.

use gmu::{
    pitch_to_freq, rho_for_decay_db, ArraySource, CpalDevice, Crop, KarplusStrong, Loop, Pe,
    Piecewise, ProcessContext, RandomSelect, Renderer, Reverb, Spatial, TriggerMode,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> gmu::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(device) = CpalDevice::default_output() else {
        eprintln!("No audio output devices found!");
        return Ok(());
    };
    info!(name = device.name(), rate = device.sample_rate(), "using output device");

    let ctx = ProcessContext::new(device.sample_rate());
    let beat = ctx.seconds_to_frames(0.25);

    // One short pulse on beats 0, 1, 3 and 6 of an eight-beat bar
    let mut points = Vec::new();
    for b in [0, 1, 3, 6] {
        points.push((b * beat, 1.0));
        points.push((b * beat + 1, 0.0));
    }
    points.push((8 * beat - 1, 0.0));
    let trigger = Loop::new(Piecewise::step(points)?)?;

    let candidates: Vec<Pe> = [60.0, 63.0, 67.0, 70.0, 74.0]
        .iter()
        .enumerate()
        .map(|(i, &pitch)| {
            let freq = pitch_to_freq(pitch);
            let rho = rho_for_decay_db(1.0, freq as f64, ctx.sample_rate, -60.0) as f32;
            KarplusStrong::new(&ctx, freq, rho, 0.25)
                .map(|ks| Pe::new(Crop::range(ks.with_seed(i as u64), 0, 2 * beat)))
        })
        .collect::<gmu::Result<_>>()?;
    let melody = RandomSelect::new(trigger, candidates, TriggerMode::Retrigger)?;

    // A stereo pair of sparse echoes
    let mut taps = vec![0.0f32; 2 * 4800];
    for (i, delay) in [900usize, 2300, 4100].iter().enumerate() {
        taps[2 * delay] = 0.4 / (i + 1) as f32;
        taps[2 * (delay + 350) + 1] = 0.4 / (i + 1) as f32;
    }
    let echoes = ArraySource::new(taps, 2);
    let output = Reverb::new(Spatial::adapter(melody, 2)?, echoes, 0.35)?;

    let mut renderer = Renderer::new(ctx, device.create_sink())?.with_source(output);
    let mut session = renderer.start()?;
    session.play(ctx.seconds_to_frames(10.0) as usize)?;
    session.finish()
}
