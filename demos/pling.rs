//! Offline render: a stack of plucked strings through a convolution reverb
//!
//! Run with: cargo run --example pling [output.wav]
//!
//! Writes a stereo 16-bit WAV file. Set `RUST_LOG=gmu=debug` to watch
//! the render session.

use gmu::{
    pitch_to_freq, play_offline, rho_for_decay_db, Crop, Gain, KarplusStrong, Pe,
    ProcessContext, Ramp, Random, RandomMode, Reverb, Sequence, Spatial,
};
use tracing_subscriber::EnvFilter;

const NOTES: [f32; 5] = [57.0, 64.0, 69.0, 72.0, 76.0];

fn main() -> gmu::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "pling.wav".into());
    let ctx = ProcessContext::new(48000);
    let note_length = ctx.seconds_to_frames(3.0);
    let stagger = ctx.seconds_to_frames(0.12);

    // Strum: each string starts a little after the previous one
    let mut strings = Vec::new();
    for (i, &pitch) in NOTES.iter().enumerate() {
        let freq = pitch_to_freq(pitch);
        let rho = rho_for_decay_db(2.5, freq as f64, ctx.sample_rate, -60.0) as f32;
        let pluck = KarplusStrong::new(&ctx, freq, rho, 0.2)?
            .with_seed(i as u64)
            .with_smoothing(true);
        let voice = Crop::range(pluck, 0, note_length);
        strings.push((Pe::new(voice), i as i64 * stagger));
    }
    let strum = Spatial::adapter(Sequence::at(strings), 2)?;

    // Exponentially decaying noise makes a serviceable room
    let ir_length = ctx.seconds_to_frames(1.5);
    let noise = Crop::range(Random::new(-1.0, 1.0, RandomMode::Noise)?.with_seed(42), 0, ir_length);
    let envelope = Pe::new(Ramp::new(0.05, 0.0, 0, ir_length));
    let ir = Gain::new(noise, envelope);

    let room = Reverb::new(strum, ir, 0.3)?;
    play_offline(&ctx, room, &path)?;
    println!("wrote {path}");
    Ok(())
}
