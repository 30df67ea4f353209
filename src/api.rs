//! LLM API interaction with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for "prompt in, completion text out"
//! - [`GeminiClient`]: Google Gemini `generateContent` over REST
//! - [`RetryAsk`]: decorator adding retries to any `AskAsync`
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Trait for async LLM interaction.
pub trait AskAsync {
    /// Send a prompt and receive the completion text.
    async fn ask(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
pub struct RetryAsk<T> {
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Google Gemini client implementing [`AskAsync`].
pub struct GeminiClient {
    client: Client,
    config: LlmConfig,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

impl AskAsync for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.config.model))]
    async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        let t0 = Instant::now();
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = api_error_message(&raw).unwrap_or(raw);
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                message = %truncate_for_log(&message, 300),
                "API call failed"
            );
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = completion_text(parsed).ok_or(LlmError::EmptyCompletion)?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.len(),
            "Completion received"
        );
        debug!(preview = %truncate_for_log(&text, 200), "Completion preview");
        Ok(text)
    }
}

fn completion_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

/// `error.message` from a Gemini error body, if present.
fn api_error_message(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyLlm {
        failures: usize,
        calls: AtomicUsize,
    }

    impl AskAsync for FlakyLlm {
        async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(LlmError::Api {
                    status: 503,
                    message: "overloaded".into(),
                })
            } else {
                Ok(format!("echo: {prompt}"))
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let llm = RetryAsk::new(
            FlakyLlm {
                failures: 2,
                calls: AtomicUsize::new(0),
            },
            3,
            StdDuration::ZERO,
        );
        assert_eq!(llm.ask("hi").await.unwrap(), "echo: hi");
        assert_eq!(llm.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let llm = RetryAsk::new(
            FlakyLlm {
                failures: 10,
                calls: AtomicUsize::new(0),
            },
            1,
            StdDuration::ZERO,
        );
        assert!(matches!(
            llm.ask("hi").await,
            Err(LlmError::Api { status: 503, .. })
        ));
        assert_eq!(llm.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                top_p: 0.95,
                max_output_tokens: 4000,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 4000);
        assert!(json["generationConfig"].get("topP").is_some());
    }

    #[test]
    fn test_completion_text_extraction() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"[{\"speaker\":"},{"text":"\"host1\"}]"}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(completion_text(parsed).unwrap(), r#"[{"speaker":"host1"}]"#);

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(completion_text(empty).is_none());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(completion_text(blocked).is_none());
    }

    #[test]
    fn test_api_error_message() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(raw).as_deref(), Some("API key not valid."));
        assert_eq!(api_error_message("<html>"), None);
    }

    #[tokio::test]
    async fn test_request_error_hides_api_key() {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:1/v1beta".to_string(),
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        let client = GeminiClient::new(&config, "SECRET-GEMINI-KEY".to_string()).unwrap();

        let err = client.ask("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Request(_)));
        assert!(!err.to_string().contains("SECRET-GEMINI-KEY"));
        assert!(!format!("{err:?}").contains("SECRET-GEMINI-KEY"));
    }
}
