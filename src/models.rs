//! Data models shared across the episode pipeline.
//!
//! - [`Article`]: a scored news item selected for discussion
//! - [`MarketSnapshot`]: the day's crude benchmark quotes
//! - [`DialogueTurn`]: one line of the two-host script, see [`Script`]
//! - [`Speaker`] and [`Emotion`]: the closed sets a turn is tagged with

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A news article that survived relevance filtering.
///
/// Built once per feed entry during selection and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Headline as published by the feed.
    pub title: String,
    /// Plain-text summary, HTML stripped and truncated.
    pub summary: String,
    /// Feed channel title, or the link's host when the feed has none.
    pub source: String,
    /// Link to the full article.
    pub link: String,
    /// Relevance score including the recency bonus.
    pub score: i32,
    /// Publication time; "now" when the feed did not provide one.
    pub published: DateTime<Utc>,
    /// Human label such as `"3 hours ago"` or `"Recently"`.
    pub age_label: String,
}

/// Crude oil benchmark quotes for the episode's market segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub wti_crude: f64,
    pub brent_crude: f64,
    /// Day-over-day change, formatted like `+1.2%`.
    pub change_wti: String,
    pub change_brent: String,
}

/// One of the two show hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "host1")]
    Host1,
    #[serde(rename = "host2")]
    Host2,
}

impl Speaker {
    /// The other host.
    pub fn other(self) -> Speaker {
        match self {
            Speaker::Host1 => Speaker::Host2,
            Speaker::Host2 => Speaker::Host1,
        }
    }

    /// Stable identifier used in scripts and transcripts.
    pub fn id(self) -> &'static str {
        match self {
            Speaker::Host1 => "host1",
            Speaker::Host2 => "host2",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Delivery tone for a turn. Each maps to a prosody offset in the voice config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Excited,
    Thoughtful,
    Concerned,
    Optimistic,
    Amused,
    Surprised,
    Skeptical,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Neutral,
        Emotion::Excited,
        Emotion::Thoughtful,
        Emotion::Concerned,
        Emotion::Optimistic,
        Emotion::Amused,
        Emotion::Surprised,
        Emotion::Skeptical,
    ];

    /// Parse a free-form label, coercing anything unrecognized to `Neutral`.
    pub fn from_label(label: &str) -> Emotion {
        match label.trim().to_lowercase().as_str() {
            "excited" => Emotion::Excited,
            "thoughtful" => Emotion::Thoughtful,
            "concerned" => Emotion::Concerned,
            "optimistic" => Emotion::Optimistic,
            "amused" => Emotion::Amused,
            "surprised" => Emotion::Surprised,
            "skeptical" => Emotion::Skeptical,
            _ => Emotion::Neutral,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Excited => "excited",
            Emotion::Thoughtful => "thoughtful",
            Emotion::Concerned => "concerned",
            Emotion::Optimistic => "optimistic",
            Emotion::Amused => "amused",
            Emotion::Surprised => "surprised",
            Emotion::Skeptical => "skeptical",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single line of dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: Speaker,
    pub text: String,
    pub emotion: Emotion,
}

impl DialogueTurn {
    pub fn new(speaker: Speaker, text: impl Into<String>, emotion: Emotion) -> Self {
        Self {
            speaker,
            text: text.into(),
            emotion,
        }
    }
}

/// The ordered turns for one episode.
pub type Script = Vec<DialogueTurn>;
