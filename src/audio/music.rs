//! Procedural ambient music bed.
//!
//! A low E2 drone with three overtones. Each layer fades in and out over two
//! seconds, the sum is slowly swelled by a 0.1 Hz LFO, and the whole bed
//! sits 25 dB down, plus another 5 dB once it is mixed under speech.

use super::{Pcm, db_to_gain};
use crate::error::AudioError;
use std::f64::consts::PI;
use tracing::debug;

const BASE_FREQ: f64 = 82.41;

/// `(frequency, amplitude)` for each layer.
const LAYERS: [(f64, f64); 4] = [
    (BASE_FREQ, 0.3),
    (BASE_FREQ * 2.0, 0.15),
    (BASE_FREQ * 3.0, 0.08),
    (BASE_FREQ * 1.5, 0.1),
];

const FADE_SECS: f64 = 2.0;
const LFO_HZ: f64 = 0.1;
const BED_LEVEL_DB: f32 = -25.0;
const DUCK_DB: f32 = -5.0;

/// Attenuation for a layer of relative amplitude `amp`, in dB.
fn layer_attenuation_db(amp: f64) -> f64 {
    20.0 - (20.0 * amp).floor()
}

/// Generate `len` samples of the ambient bed at `sample_rate`.
pub fn ambient_bed(len: usize, sample_rate: u32) -> Result<Pcm, AudioError> {
    if len == 0 || sample_rate == 0 {
        return Err(AudioError::EmptyClip);
    }

    let rate = sample_rate as f64;
    let total_secs = len as f64 / rate;
    let layers: Vec<(f64, f64)> = LAYERS
        .iter()
        .map(|&(freq, amp)| (2.0 * PI * freq, 10f64.powf(-layer_attenuation_db(amp) / 20.0)))
        .collect();
    let level = db_to_gain(BED_LEVEL_DB) as f64;

    let samples = (0..len)
        .map(|i| {
            let t = i as f64 / rate;
            let fade = (t / FADE_SECS).min((total_secs - t) / FADE_SECS).clamp(0.0, 1.0);
            let tone: f64 = layers
                .iter()
                .map(|(omega, gain)| gain * (omega * t).sin())
                .sum();
            let lfo = 0.9 + 0.1 * (2.0 * PI * LFO_HZ * t).sin();
            (tone * fade * lfo * level) as f32
        })
        .collect();

    Ok(Pcm::new(samples, sample_rate))
}

/// Overlay `bed` under `speech`, looping or trimming it to fit and ducking it.
pub fn mix_under(speech: &Pcm, bed: &Pcm) -> Result<Pcm, AudioError> {
    if bed.is_empty() {
        return Err(AudioError::EmptyClip);
    }
    let duck = db_to_gain(DUCK_DB);
    let samples = speech
        .samples
        .iter()
        .zip(bed.samples.iter().cycle())
        .map(|(s, m)| s + m * duck)
        .collect();
    Ok(Pcm::new(samples, speech.sample_rate))
}

/// Speech with the ambient bed mixed underneath.
pub fn add_background(speech: &Pcm) -> Result<Pcm, AudioError> {
    let bed = ambient_bed(speech.len(), speech.sample_rate)?;
    debug!(samples = bed.len(), peak = bed.peak(), "Generated ambient bed");
    mix_under(speech, &bed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_attenuation() {
        assert_eq!(layer_attenuation_db(0.3), 14.0);
        assert_eq!(layer_attenuation_db(0.15), 17.0);
        assert_eq!(layer_attenuation_db(0.08), 19.0);
        assert_eq!(layer_attenuation_db(0.1), 18.0);
    }

    #[test]
    fn test_bed_is_quiet_and_faded() {
        let rate = 8_000;
        let bed = ambient_bed(rate as usize * 10, rate).unwrap();
        assert_eq!(bed.len(), 80_000);
        assert_eq!(bed.samples[0], 0.0);
        // Layers sum below 0.6 before the -25 dB bed level.
        assert!(bed.peak() < 0.6 * db_to_gain(-25.0));
        assert!(bed.peak() > 0.0);
        // Fade-out reaches (near) silence at the end.
        assert!(bed.samples.last().unwrap().abs() < 1e-3);
    }

    #[test]
    fn test_mix_loops_short_bed() {
        let speech = Pcm::new(vec![0.0; 5], 1_000);
        let bed = Pcm::new(vec![1.0, -1.0], 1_000);
        let mixed = mix_under(&speech, &bed).unwrap();
        let duck = db_to_gain(-5.0);
        assert_eq!(mixed.len(), 5);
        assert_eq!(mixed.samples, vec![duck, -duck, duck, -duck, duck]);
    }

    #[test]
    fn test_mix_trims_long_bed() {
        let speech = Pcm::new(vec![0.25; 3], 1_000);
        let bed = Pcm::new(vec![0.0; 100], 1_000);
        let mixed = mix_under(&speech, &bed).unwrap();
        assert_eq!(mixed.samples, vec![0.25; 3]);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(ambient_bed(0, 44_100).is_err());
        let speech = Pcm::new(vec![0.1; 3], 1_000);
        assert!(mix_under(&speech, &Pcm::new(Vec::new(), 1_000)).is_err());
    }
}
