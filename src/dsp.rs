//! Unit conversions and small DSP helpers.

/// Convert decibels to a linear amplitude ratio.
#[inline]
pub fn db_to_ratio(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Convert a linear amplitude ratio to decibels. Silence maps to `-inf`.
#[inline]
pub fn ratio_to_db(ratio: f32) -> f32 {
    20.0 * ratio.abs().log10()
}

/// Frequency in Hz of a MIDI pitch (A4 = 69 = 440 Hz). Fractional pitches
/// are allowed.
#[inline]
pub fn pitch_to_freq(pitch: f32) -> f32 {
    440.0 * 2f32.powf((pitch - 69.0) / 12.0)
}

/// MIDI pitch of a frequency in Hz.
#[inline]
pub fn freq_to_pitch(freq: f32) -> f32 {
    69.0 + 12.0 * (freq / 440.0).log2()
}

/// Per-period feedback coefficient of a plucked string that decays by `db`
/// decibels (negative) after `seconds` at `frequency`.
///
/// After `seconds * frequency` trips around the delay line the amplitude has
/// been multiplied by `rho^(seconds * frequency) = 10^(db / 20)`. The sample
/// rate only fixes the delay-line length and does not change `rho`.
pub fn rho_for_decay_db(seconds: f64, frequency: f64, _sample_rate: u32, db: f64) -> f64 {
    10f64.powf(db / (20.0 * seconds * frequency))
}

/// One-pole smoothing coefficient reaching ~63% of a step after `seconds`.
#[inline]
pub(crate) fn time_constant(seconds: f32, sample_rate: u32) -> f32 {
    let samples = seconds * sample_rate as f32;
    if samples <= 0.0 {
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}

/// Move `current` towards `target` by at most `max_delta`.
#[inline]
pub(crate) fn slew(current: f32, target: f32, max_delta: f32) -> f32 {
    current + (target - current).clamp(-max_delta, max_delta)
}

/// Peak envelope follower with separate attack and release times.
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeFollower {
    attack: f32,
    release: f32,
    envelope: f32,
}

impl EnvelopeFollower {
    pub fn new(attack_seconds: f32, release_seconds: f32, sample_rate: u32) -> Self {
        Self {
            attack: time_constant(attack_seconds, sample_rate),
            release: time_constant(release_seconds, sample_rate),
            envelope: 0.0,
        }
    }

    /// Feed one rectified level and return the updated envelope.
    #[inline]
    pub fn process(&mut self, level: f32) -> f32 {
        let coeff = if level > self.envelope {
            self.attack
        } else {
            self.release
        };
        self.envelope = level + coeff * (self.envelope - level);
        self.envelope
    }

    #[inline]
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
