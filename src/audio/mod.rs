//! Episode audio: decode clips, lay them out, add the music bed, export.
//!
//! All mixing happens on mono `f32` PCM in memory ([`Pcm`]). Only the
//! MP3 boundaries (decoding engine output, encoding the final episode) go
//! through ffmpeg, see [`codec`].

pub mod assemble;
pub mod codec;
pub mod music;

use crate::config::AudioConfig;
use crate::error::PipelineError;
use crate::models::Speaker;
use crate::speech::NarratedTurn;
use codec::Ffmpeg;
use std::path::Path;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{info, instrument, warn};

/// Mono PCM samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Pcm {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn silence(duration_ms: u64, sample_rate: u32) -> Self {
        Self::new(vec![0.0; samples_for_ms(duration_ms, sample_rate)], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn append(&mut self, other: &Pcm) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// Scale by `db` decibels (negative attenuates).
    pub fn apply_gain_db(&mut self, db: f32) {
        let gain = db_to_gain(db);
        self.samples.iter_mut().for_each(|s| *s *= gain);
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Scale so the loudest sample sits `headroom_db` below full scale.
    /// Silence is left alone.
    pub fn normalize(&mut self, headroom_db: f32) {
        let peak = self.peak();
        if peak <= f32::EPSILON {
            return;
        }
        let target = db_to_gain(-headroom_db);
        let gain = target / peak;
        self.samples.iter_mut().for_each(|s| *s *= gain);
    }
}

pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

pub fn samples_for_ms(duration_ms: u64, sample_rate: u32) -> usize {
    (duration_ms as u128 * sample_rate as u128 / 1000) as usize
}

/// Peak target after normalization, in dB below full scale.
const NORMALIZE_HEADROOM_DB: f32 = 0.1;

/// Decode, assemble, score and export an episode to `output`.
///
/// Clips that fail to decode are skipped. Returns the episode length in
/// seconds.
#[instrument(level = "info", skip_all, fields(turns = narrated.len(), output = %output.display()))]
pub async fn render_episode(
    narrated: &[NarratedTurn],
    ffmpeg: &Ffmpeg,
    config: &AudioConfig,
    output: &Path,
) -> Result<f64, PipelineError> {
    let t0 = Instant::now();
    let scratch = TempDir::new()?;

    let mut clips: Vec<(Speaker, Pcm)> = Vec::with_capacity(narrated.len());
    for turn in narrated {
        match ffmpeg.decode(&turn.audio, scratch.path(), turn.index).await {
            Ok(pcm) => clips.push((turn.speaker, pcm)),
            Err(e) => warn!(index = turn.index, error = %e, "Could not decode clip; skipping"),
        }
    }
    if clips.is_empty() {
        return Err(PipelineError::NoAudio);
    }

    let mut episode = assemble::assemble(&clips, config, ffmpeg.sample_rate());

    if config.background_music {
        match music::add_background(&episode) {
            Ok(mixed) => episode = mixed,
            Err(e) => warn!(error = %e, "Could not add background music; continuing without it"),
        }
    }

    episode.normalize(NORMALIZE_HEADROOM_DB);
    let duration = episode.duration_secs();

    ffmpeg
        .encode(&episode, scratch.path(), output, &config.bitrate)
        .await?;

    info!(
        clips = clips.len(),
        duration_secs = duration,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Episode exported"
    );
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_length() {
        let pcm = Pcm::silence(300, 44_100);
        assert_eq!(pcm.len(), 13_230);
        assert!((pcm.duration_secs() - 0.3).abs() < 1e-9);
        assert_eq!(pcm.peak(), 0.0);
    }

    #[test]
    fn test_gain_and_normalize() {
        let mut pcm = Pcm::new(vec![0.5, -0.25, 0.1], 44_100);
        pcm.apply_gain_db(-6.0);
        assert!((pcm.samples[0] - 0.2506).abs() < 1e-3);

        pcm.normalize(0.1);
        assert!((pcm.peak() - db_to_gain(-0.1)).abs() < 1e-6);
        // Relative levels preserved.
        assert!((pcm.samples[1] / pcm.samples[0] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_leaves_silence() {
        let mut pcm = Pcm::silence(10, 44_100);
        pcm.normalize(0.1);
        assert_eq!(pcm.peak(), 0.0);
    }
}
