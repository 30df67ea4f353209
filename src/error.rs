//! Error types for each stage of the episode pipeline.
//!
//! Stage errors are kept separate so the pipeline can decide per stage whether
//! a failure is fatal ([`PipelineError`]) or degrades gracefully (market data,
//! AI scripts, music, individual feeds and turns).

use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`crate::config::PodcastConfig`].
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A keyword could not be compiled into a matcher.
    #[error("invalid keyword pattern: {0}")]
    Keyword(#[from] regex::Error),
}

/// Errors raised while fetching or parsing a single news feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed returned status {status}: {url}")]
    Status { status: u16, url: String },

    #[error("not an RSS or Atom document: {0}")]
    Parse(String),
}

/// Errors raised while fetching commodity quotes.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Carries no URL: the query string holds the API key.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("quote service refused the request: {0}")]
    Refused(String),

    #[error("unexpected quote payload: {0}")]
    Payload(String),
}

/// Errors raised by the LLM completion client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Carries no URL, like [`MarketError::Request`].
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion contained no text")]
    EmptyCompletion,
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        MarketError::Request(e.without_url())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Request(e.without_url())
    }
}

/// Errors raised by a speech engine for a single request.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The attempt did not finish within the per-attempt timeout.
    #[error("synthesis timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The service answered 403/429 or otherwise signalled throttling.
    #[error("rate limited or forbidden: {0}")]
    RateLimited(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// The service closed the turn without sending any audio.
    #[error("no audio received")]
    EmptyAudio,
}

impl SynthesisError {
    /// Whether the failure looks like throttling and deserves the longer wait.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SynthesisError::RateLimited(_))
    }
}

/// Errors raised while decoding, mixing or exporting audio.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffmpeg failed ({status}): {stderr}")]
    Ffmpeg { status: String, stderr: String },

    #[error("decoded clip contained no samples")]
    EmptyClip,

    #[error("invalid duration: {0} ms")]
    InvalidDuration(u64),
}

/// Top-level errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Nothing survived relevance filtering.
    #[error("no relevant articles found")]
    NoArticles,

    /// Every turn failed synthesis.
    #[error("speech synthesis produced no usable clips")]
    NoAudio,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write feed: {0}")]
    Feed(#[from] rss::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classification() {
        assert!(SynthesisError::RateLimited("403".into()).is_rate_limited());
        assert!(!SynthesisError::Connection("reset".into()).is_rate_limited());
        assert!(!SynthesisError::Timeout(std::time::Duration::from_secs(30)).is_rate_limited());
    }

    #[test]
    fn test_pipeline_error_messages() {
        assert_eq!(PipelineError::NoArticles.to_string(), "no relevant articles found");
        assert_eq!(
            PipelineError::NoAudio.to_string(),
            "speech synthesis produced no usable clips"
        );
    }
}
