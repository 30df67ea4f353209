//! JSON transcript sidecar written next to each episode.
//!
//! ```text
//! docs/episodes/
//! ├── oil_news_20261017.mp3
//! └── oil_news_20261017.json   # script, articles, market, duration
//! ```
//!
//! The feed publisher reads `duration_secs` back for `itunes:duration`.

use crate::error::PipelineError;
use crate::models::{Article, MarketSnapshot, Script};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub title: String,
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    /// `template` or `ai`.
    pub strategy: String,
    pub duration_secs: f64,
    pub market: Option<MarketSnapshot>,
    pub articles: Vec<Article>,
    pub script: Script,
}

/// `episodes/foo.mp3` → `episodes/foo.json`.
pub fn sidecar_path(episode: &Path) -> PathBuf {
    episode.with_extension("json")
}

/// Write `transcript` beside the episode file.
#[instrument(level = "info", skip_all, fields(episode = %episode.display()))]
pub async fn write_transcript(
    transcript: &Transcript,
    episode: &Path,
) -> Result<PathBuf, PipelineError> {
    let json = serde_json::to_string_pretty(transcript)?;
    let path = sidecar_path(episode);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    fs::write(&path, json).await?;
    info!(path = %path.display(), turns = transcript.script.len(), "Wrote transcript");
    Ok(path)
}

/// Measured duration from the episode's sidecar, if there is a readable one.
pub async fn read_duration(episode: &Path) -> Option<f64> {
    let path = sidecar_path(episode);
    let raw = fs::read_to_string(&path).await.ok()?;
    match serde_json::from_str::<Transcript>(&raw) {
        Ok(t) if t.duration_secs.is_finite() && t.duration_secs > 0.0 => Some(t.duration_secs),
        Ok(_) => None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unreadable transcript sidecar");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DialogueTurn, Emotion, Speaker};

    fn transcript(duration_secs: f64) -> Transcript {
        Transcript {
            title: "Oil Field Insights - October 17, 2026".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            generated_at: DateTime::parse_from_rfc3339("2026-10-17T06:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            strategy: "template".to_string(),
            duration_secs,
            market: None,
            articles: Vec::new(),
            script: vec![DialogueTurn::new(Speaker::Host1, "Hello", Emotion::Neutral)],
        }
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("docs/episodes/oil_news_20261017.mp3")),
            PathBuf::from("docs/episodes/oil_news_20261017.json")
        );
    }

    #[tokio::test]
    async fn test_write_then_read_duration() {
        let tmp = tempfile::tempdir().unwrap();
        let episode = tmp.path().join("episodes").join("oil_news_20261017.mp3");

        let path = write_transcript(&transcript(245.6), &episode).await.unwrap();
        assert!(path.exists());
        assert_eq!(read_duration(&episode).await, Some(245.6));

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Transcript = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, transcript(245.6));
    }

    #[tokio::test]
    async fn test_missing_or_bad_sidecar_has_no_duration() {
        let tmp = tempfile::tempdir().unwrap();
        let episode = tmp.path().join("oil_news_20261017.mp3");
        assert_eq!(read_duration(&episode).await, None);

        std::fs::write(sidecar_path(&episode), "{not json").unwrap();
        assert_eq!(read_duration(&episode).await, None);
    }
}
