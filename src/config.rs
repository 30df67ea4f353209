//! Runtime configuration for the podcast pipeline.
//!
//! Every tunable the pipeline needs (show metadata, feed list, keyword tiers,
//! voices, retry policy, audio layout, LLM sampling) lives in
//! [`PodcastConfig`]. Defaults reproduce the stock "Oil Field Insights" show;
//! an optional YAML file overrides any subset of keys. Credentials are never
//! part of this struct; they come from the CLI/environment (see [`crate::cli`]).
//!
//! ```yaml
//! show:
//!   title: Oil Field Insights Daily
//!   base_url: https://podcasts.example.com/oil
//! selection:
//!   max_articles: 10
//! ```

use crate::error::ConfigError;
use crate::models::Emotion;
use crate::speech::{Prosody, RetryPolicy, VoiceProfile};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};

/// Top-level configuration. Missing keys fall back to [`Default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PodcastConfig {
    pub show: ShowInfo,
    /// Filename prefix for episodes: `<prefix>_<YYYYMMDD>.mp3`.
    pub episode_prefix: String,
    pub feeds: Vec<FeedSource>,
    pub scoring: ScoringConfig,
    pub selection: SelectionConfig,
    pub hosts: HostNames,
    pub voices: VoiceConfig,
    pub emotions: HashMap<Emotion, Prosody>,
    pub tts: TtsConfig,
    pub audio: AudioConfig,
    pub llm: LlmConfig,
    pub market: MarketConfig,
}

/// Channel-level metadata for the RSS feed and HTML page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShowInfo {
    pub title: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub category: String,
    pub language: String,
    /// Public URL the output directory is served from, without trailing slash.
    pub base_url: String,
    /// Cover art URL; defaults to `<base_url>/podcast-cover.jpg`.
    pub image: Option<String>,
    /// Directory under `base_url` holding the MP3 files.
    pub episodes_path: String,
    /// Prefix used for per-episode item titles.
    pub episode_title: String,
}

/// A news feed to poll.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedSource {
    pub url: String,
    /// Overrides the channel title as the article's source name.
    #[serde(default)]
    pub name: Option<String>,
}

impl FeedSource {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            name: None,
        }
    }
}

/// Keyword tiers for relevance scoring (weights 3, 2 and 1) plus exclusions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub critical: Vec<String>,
    pub important: Vec<String>,
    pub relevant: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub max_articles: usize,
    pub per_source_cap: usize,
    /// Entries read from the top of each feed.
    pub entries_per_feed: usize,
    /// Summary truncation, in characters.
    pub summary_chars: usize,
    /// Dated articles at or beyond this age are dropped.
    pub max_age_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostNames {
    pub host1: String,
    pub host2: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub host1: VoiceProfile,
    pub host2: VoiceProfile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub output_format: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// ffmpeg bitrate string, e.g. `192k`.
    pub bitrate: String,
    pub sample_rate: u32,
    pub speaker_change_gap_ms: u64,
    pub same_speaker_gap_ms: u64,
    pub intro_padding_ms: u64,
    pub outro_padding_ms: u64,
    /// Mix the ambient bed under speech.
    pub background_music: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            show: ShowInfo::default(),
            episode_prefix: "oil_news".to_string(),
            feeds: default_feeds(),
            scoring: ScoringConfig::default(),
            selection: SelectionConfig::default(),
            hosts: HostNames::default(),
            voices: VoiceConfig::default(),
            emotions: default_emotions(),
            tts: TtsConfig::default(),
            audio: AudioConfig::default(),
            llm: LlmConfig::default(),
            market: MarketConfig::default(),
        }
    }
}

impl Default for ShowInfo {
    fn default() -> Self {
        Self {
            title: "Oil Field Insights Daily".to_string(),
            description: "Your daily automated podcast for oil and gas industry news".to_string(),
            author: "Oil Field Insights".to_string(),
            email: "podcast@example.com".to_string(),
            category: "Business".to_string(),
            language: "en-us".to_string(),
            base_url: "https://example.github.io/oil-podcast-generator".to_string(),
            image: None,
            episodes_path: "episodes".to_string(),
            episode_title: "Oil Field Insights".to_string(),
        }
    }
}

impl ShowInfo {
    pub fn image_url(&self) -> String {
        self.image
            .clone()
            .unwrap_or_else(|| format!("{}/podcast-cover.jpg", self.base_url))
    }
}

fn default_feeds() -> Vec<FeedSource> {
    [
        "https://www.rigzone.com/news/rss/rigzone_latest.aspx",
        "https://www.worldoil.com/rss",
        "https://www.oilandgas360.com/feed/",
        "https://www.upstreamonline.com/rss",
        "https://www.oilprice.com/rss/main",
        "https://www.spglobal.com/commodityinsights/en/rss-feed/oil",
        "https://www.reuters.com/markets/commodities/rss",
    ]
    .into_iter()
    .map(FeedSource::new)
    .collect()
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            critical: words(&[
                "drilling",
                "extraction",
                "production",
                "discovery",
                "oil rig",
                "fracking",
                "offshore",
                "onshore",
                "barrel",
            ]),
            important: words(&[
                "OPEC",
                "crude",
                "pipeline",
                "refinery",
                "exploration",
                "reserves",
                "shale",
                "deepwater",
                "upstream",
            ]),
            relevant: words(&[
                "energy",
                "petroleum",
                "fossil",
                "oil price",
                "oil market",
                "oil company",
                "drilling technology",
                "oil field",
            ]),
            exclude: words(&["renewable", "solar", "wind power", "electric vehicle"]),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_articles: 7,
            per_source_cap: 2,
            entries_per_feed: 10,
            summary_chars: 500,
            max_age_hours: 48,
        }
    }
}

impl Default for HostNames {
    fn default() -> Self {
        Self {
            host1: "Alex".to_string(),
            host2: "Sam".to_string(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            host1: VoiceProfile::new("en-US-GuyNeural", 0, -3),
            host2: VoiceProfile::new("en-US-AriaNeural", 2, -2),
        }
    }
}

fn default_emotions() -> HashMap<Emotion, Prosody> {
    HashMap::from([
        (Emotion::Neutral, Prosody::new(0, -2)),
        (Emotion::Excited, Prosody::new(5, 2)),
        (Emotion::Thoughtful, Prosody::new(-5, -3)),
        (Emotion::Concerned, Prosody::new(-3, -4)),
        (Emotion::Optimistic, Prosody::new(3, 1)),
        (Emotion::Amused, Prosody::new(2, 1)),
        (Emotion::Surprised, Prosody::new(4, 3)),
        (Emotion::Skeptical, Prosody::new(-4, -5)),
    ])
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 30_000,
            max_jitter_ms: 1_000,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0".to_string(),
            output_format: "audio-24khz-48kbitrate-mono-mp3".to_string(),
        }
    }
}

impl TtsConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            rate_limit_delay: Duration::from_millis(self.base_delay_ms.saturating_mul(3)),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
            attempt_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bitrate: "192k".to_string(),
            sample_rate: 44_100,
            speaker_change_gap_ms: 300,
            same_speaker_gap_ms: 100,
            intro_padding_ms: 1_000,
            outro_padding_ms: 1_500,
            background_music: true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.9,
            top_p: 0.95,
            max_output_tokens: 4_000,
            timeout_secs: 90,
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.alphavantage.co/query".to_string(),
            timeout_secs: 15,
        }
    }
}

impl PodcastConfig {
    /// Load configuration from an optional YAML file.
    ///
    /// With no path, returns the defaults.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!(path, feeds = config.feeds.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Prosody for an emotion, falling back to `neutral` and then to no offset.
    pub fn prosody_for(&self, emotion: Emotion) -> Prosody {
        self.emotions
            .get(&emotion)
            .or_else(|| self.emotions.get(&Emotion::Neutral))
            .copied()
            .unwrap_or_default()
    }
}
