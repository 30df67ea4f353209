//! Text-to-speech for dialogue scripts.
//!
//! - [`SpeechEngine`]: one synthesis request, text in, MP3 bytes out
//! - [`edge::EdgeTts`]: the Edge read-aloud websocket engine
//! - [`retry::RetrySpeech`]: decorator adding timeouts and backoff to any engine
//! - [`text::prepare_for_speech`]: rewrites text so it reads well aloud
//! - [`Narrator`]: walks a [`Script`], tolerating per-turn failures

pub mod edge;
pub mod retry;
pub mod text;

use crate::config::PodcastConfig;
use crate::error::{PipelineError, SynthesisError};
use crate::models::{Script, Speaker};
use serde::Deserialize;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

pub use retry::{RetryPolicy, RetrySpeech};

/// A named neural voice with its baseline prosody offsets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceProfile {
    pub name: String,
    /// Speaking-rate offset in percent.
    #[serde(default)]
    pub rate: i32,
    /// Pitch offset in Hz.
    #[serde(default)]
    pub pitch: i32,
}

impl VoiceProfile {
    pub fn new(name: &str, rate: i32, pitch: i32) -> Self {
        Self {
            name: name.to_string(),
            rate,
            pitch,
        }
    }
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self::new("en-US-GuyNeural", 0, 0)
    }
}

/// Rate/pitch offsets applied to one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Prosody {
    #[serde(default)]
    pub rate: i32,
    #[serde(default)]
    pub pitch: i32,
}

impl Prosody {
    pub fn new(rate: i32, pitch: i32) -> Self {
        Self { rate, pitch }
    }

    /// The voice baseline shifted by an emotion offset.
    ///
    /// Emotion prosody is an offset, not an absolute value: with the stock
    /// config a neutral host1 line goes out at -5Hz (baseline -3, neutral -2)
    /// and host2 at -4Hz.
    pub fn for_voice(voice: &VoiceProfile, emotion: Prosody) -> Self {
        Self {
            rate: voice.rate + emotion.rate,
            pitch: voice.pitch + emotion.pitch,
        }
    }

    /// SSML rate attribute, e.g. `+5%`.
    pub fn rate_attr(&self) -> String {
        format!("{:+}%", self.rate)
    }

    /// SSML pitch attribute, e.g. `-3Hz`.
    pub fn pitch_attr(&self) -> String {
        format!("{:+}Hz", self.pitch)
    }
}

/// A text-to-speech backend.
pub trait SpeechEngine {
    /// Synthesize `text` with `voice` at `prosody`, returning encoded MP3 bytes.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        prosody: &Prosody,
    ) -> Result<Vec<u8>, SynthesisError>;
}

/// Synthesized audio for one script turn.
#[derive(Debug, Clone)]
pub struct NarratedTurn {
    /// Position of the turn in the script.
    pub index: usize,
    pub speaker: Speaker,
    /// Encoded MP3 bytes as returned by the engine.
    pub audio: Vec<u8>,
}

/// Drives a [`SpeechEngine`] over a whole script.
#[derive(Debug)]
pub struct Narrator<E> {
    engine: E,
    config: PodcastConfig,
}

impl<E> Narrator<E>
where
    E: SpeechEngine,
{
    pub fn new(engine: E, config: &PodcastConfig) -> Self {
        Self {
            engine,
            config: config.clone(),
        }
    }

    fn voice_for(&self, speaker: Speaker) -> &VoiceProfile {
        match speaker {
            Speaker::Host1 => &self.config.voices.host1,
            Speaker::Host2 => &self.config.voices.host2,
        }
    }

    /// Synthesize every turn in order.
    ///
    /// Turns that fail after the engine's own retries are logged and skipped.
    /// Fails only when no turn produced audio.
    #[instrument(level = "info", skip_all, fields(turns = script.len()))]
    pub async fn narrate(&self, script: &Script) -> Result<Vec<NarratedTurn>, PipelineError> {
        let t0 = Instant::now();
        let mut narrated = Vec::with_capacity(script.len());

        for (index, turn) in script.iter().enumerate() {
            let spoken = text::prepare_for_speech(&turn.text);
            if spoken.is_empty() {
                warn!(index, "Turn has no speakable text; skipping");
                continue;
            }

            let voice = self.voice_for(turn.speaker);
            let prosody = Prosody::for_voice(voice, self.config.prosody_for(turn.emotion));
            info!(
                index,
                total = script.len(),
                speaker = %turn.speaker,
                emotion = %turn.emotion,
                "Synthesizing turn"
            );

            match self.engine.synthesize(&spoken, voice, &prosody).await {
                Ok(audio) => narrated.push(NarratedTurn {
                    index,
                    speaker: turn.speaker,
                    audio,
                }),
                Err(e) => {
                    error!(index, speaker = %turn.speaker, error = %e, "Turn failed after retries; skipping")
                }
            }
        }

        info!(
            synthesized = narrated.len(),
            skipped = script.len() - narrated.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Narration finished"
        );

        if narrated.is_empty() {
            return Err(PipelineError::NoAudio);
        }
        Ok(narrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DialogueTurn, Emotion};
    use std::sync::Mutex;

    /// Records every request and fails for texts containing "FAIL".
    #[derive(Default)]
    struct RecordingEngine {
        requests: Mutex<Vec<(String, String, Prosody)>>,
    }

    impl SpeechEngine for RecordingEngine {
        async fn synthesize(
            &self,
            text: &str,
            voice: &VoiceProfile,
            prosody: &Prosody,
        ) -> Result<Vec<u8>, SynthesisError> {
            self.requests
                .lock()
                .unwrap()
                .push((text.to_string(), voice.name.clone(), *prosody));
            if text.contains("FAIL") {
                Err(SynthesisError::Connection("refused".into()))
            } else {
                Ok(text.as_bytes().to_vec())
            }
        }
    }

    fn script() -> Script {
        vec![
            DialogueTurn::new(Speaker::Host1, "Welcome to the show.", Emotion::Neutral),
            DialogueTurn::new(Speaker::Host2, "FAIL on this one.", Emotion::Excited),
            DialogueTurn::new(Speaker::Host2, "[laughs]", Emotion::Amused),
            DialogueTurn::new(Speaker::Host1, "See you tomorrow.", Emotion::Optimistic),
        ]
    }

    #[test]
    fn test_prosody_attributes() {
        let voice = VoiceProfile::new("en-US-GuyNeural", 0, -3);
        let prosody = Prosody::for_voice(&voice, Prosody::new(5, 2));
        assert_eq!(prosody.rate_attr(), "+5%");
        assert_eq!(prosody.pitch_attr(), "-1Hz");
        assert_eq!(Prosody::default().rate_attr(), "+0%");
    }

    #[test]
    fn test_stock_voices_stay_distinct_under_same_emotion() {
        let config = PodcastConfig::default();
        let neutral = config.prosody_for(Emotion::Neutral);

        let host1 = Prosody::for_voice(&config.voices.host1, neutral);
        let host2 = Prosody::for_voice(&config.voices.host2, neutral);
        assert_eq!(host1, Prosody::new(0, -5));
        assert_eq!(host2, Prosody::new(2, -4));
        assert_ne!(host1, host2);
    }

    #[tokio::test]
    async fn test_narrate_skips_failed_and_unspeakable_turns() {
        let config = PodcastConfig::default();
        let narrator = Narrator::new(RecordingEngine::default(), &config);

        let narrated = narrator.narrate(&script()).await.unwrap();
        let indexes: Vec<usize> = narrated.iter().map(|n| n.index).collect();
        assert_eq!(indexes, vec![0, 3]);
        assert_eq!(narrated[1].speaker, Speaker::Host1);

        let requests = narrator.engine.requests.lock().unwrap();
        // The bracket-only turn never reaches the engine.
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].1, "en-US-AriaNeural");
        // host2 baseline (+2%, -2Hz) plus excited (+5%, +2Hz)
        assert_eq!(requests[1].2, Prosody::new(7, 0));
    }

    #[tokio::test]
    async fn test_narrate_fails_when_nothing_synthesizes() {
        let config = PodcastConfig::default();
        let narrator = Narrator::new(RecordingEngine::default(), &config);
        let script = vec![
            DialogueTurn::new(Speaker::Host1, "FAIL one", Emotion::Neutral),
            DialogueTurn::new(Speaker::Host2, "FAIL two", Emotion::Neutral),
        ];
        let err = narrator.narrate(&script).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoAudio));
    }
}
