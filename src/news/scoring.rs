//! Relevance scoring for feed entries.
//!
//! A score is the sum, over every configured keyword, of
//! `weight * occurrences`, where critical keywords weigh 3, important 2 and
//! relevant 1. Matching is case-insensitive and whole-word. Any exclusion
//! term found anywhere in the text forces [`EXCLUDED_SCORE`].
//!
//! Recency is applied separately by [`recency`]: fresh dated articles earn a
//! bonus, dated articles past the age limit are dropped, and undated
//! articles pass with no bonus.

use crate::config::ScoringConfig;
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use regex::Regex;

/// Score given to text containing an exclusion term.
pub const EXCLUDED_SCORE: i32 = -1;

const CRITICAL_WEIGHT: i32 = 3;
const IMPORTANT_WEIGHT: i32 = 2;
const RELEVANT_WEIGHT: i32 = 1;

/// Label used when the feed gave no publication date.
pub const UNDATED_LABEL: &str = "Recently";

#[derive(Debug, Clone)]
struct WeightedKeyword {
    pattern: Regex,
    weight: i32,
}

/// Keyword-density scorer built from a [`ScoringConfig`].
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    keywords: Vec<WeightedKeyword>,
    exclusions: Vec<String>,
}

impl RelevanceScorer {
    pub fn new(config: &ScoringConfig) -> Result<Self, ConfigError> {
        let tiers = [
            (&config.critical, CRITICAL_WEIGHT),
            (&config.important, IMPORTANT_WEIGHT),
            (&config.relevant, RELEVANT_WEIGHT),
        ];

        let mut keywords = Vec::new();
        for (words, weight) in tiers {
            for word in words.iter().map(|w| w.trim()).filter(|w| !w.is_empty()) {
                let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))?;
                keywords.push(WeightedKeyword { pattern, weight });
            }
        }

        let exclusions = config
            .exclude
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        Ok(Self {
            keywords,
            exclusions,
        })
    }

    /// Keyword score for `text`, or [`EXCLUDED_SCORE`] if an exclusion term appears.
    pub fn score(&self, text: &str) -> i32 {
        let lowered = text.to_lowercase();
        if self.exclusions.iter().any(|term| lowered.contains(term)) {
            return EXCLUDED_SCORE;
        }
        self.keywords
            .iter()
            .map(|k| k.weight * k.pattern.find_iter(text).count() as i32)
            .sum()
    }
}

/// Outcome of the recency check for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recency {
    /// Keep the entry, adding `bonus` to its score.
    Keep { bonus: i32, label: String },
    /// Dated, and older than the age limit.
    TooOld,
}

/// Recency bonus and age label for an entry published at `published`.
pub fn recency(published: Option<DateTime<Utc>>, now: DateTime<Utc>, max_age_hours: i64) -> Recency {
    let Some(published) = published else {
        return Recency::Keep {
            bonus: 0,
            label: UNDATED_LABEL.to_string(),
        };
    };

    // Clock skew between feeds and us: treat future dates as brand new.
    let age = (now - published).max(chrono::Duration::zero());
    let hours = age.num_minutes() as f64 / 60.0;

    if hours >= max_age_hours as f64 {
        return Recency::TooOld;
    }

    let bonus = match hours {
        h if h < 6.0 => 10,
        h if h < 12.0 => 7,
        h if h < 24.0 => 5,
        h if h < 48.0 => 2,
        _ => 0,
    };
    Recency::Keep {
        bonus,
        label: age_label(age),
    }
}

/// Human label for an age, e.g. `"Just now"`, `"1 hour ago"`, `"2 days ago"`.
pub fn age_label(age: chrono::Duration) -> String {
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();
    match () {
        _ if minutes < 1 => "Just now".to_string(),
        _ if minutes < 60 => plural(minutes, "minute"),
        _ if hours < 24 => plural(hours, "hour"),
        _ => plural(days, "day"),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
