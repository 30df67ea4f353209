//! Retry decorator for speech engines.
//!
//! [`RetrySpeech`] wraps any [`SpeechEngine`] and bounds each attempt with a
//! timeout. Failed attempts are retried with exponential backoff plus random
//! jitter. Failures that look like throttling (403/429) wait an extra
//! `rate_limit_delay` before the next attempt.
//!
//! ```text
//! delay = min(base_delay * 2^attempt, max_delay)
//!       + rate_limit_delay (throttled only)
//!       + random_jitter(0..=max_jitter)
//! ```

use super::{Prosody, SpeechEngine, VoiceProfile};
use crate::error::SynthesisError;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{error, info, instrument, warn};

/// Attempt bounds and delays for [`RetrySpeech`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Extra wait after a throttled attempt.
    pub rate_limit_delay: Duration,
    pub max_jitter: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Deterministic part of the wait after failed attempt number `attempt`
    /// (1-based), so the first retry waits `2 * base_delay`.
    pub fn backoff(&self, attempt: usize, rate_limited: bool) -> Duration {
        let exp = attempt.min(16) as u32;
        let mut delay = self.base_delay.saturating_mul(1 << exp);
        if delay > self.max_delay {
            delay = self.max_delay;
        }
        if rate_limited {
            delay += self.rate_limit_delay;
        }
        delay
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rng().random_range(0..=max_ms))
    }
}

/// Wraps a [`SpeechEngine`] with per-attempt timeouts and backoff.
pub struct RetrySpeech<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetrySpeech<T>
where
    T: SpeechEngine,
{
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetrySpeech<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySpeech")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T> SpeechEngine for RetrySpeech<T>
where
    T: SpeechEngine,
{
    #[instrument(level = "debug", skip_all, fields(voice = %voice.name))]
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        prosody: &Prosody,
    ) -> Result<Vec<u8>, SynthesisError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let attempt_t0 = Instant::now();
            let outcome = timeout(
                self.policy.attempt_timeout,
                self.inner.synthesize(text, voice, prosody),
            )
            .await
            .unwrap_or(Err(SynthesisError::Timeout(self.policy.attempt_timeout)));

            let e = match outcome {
                Ok(audio) => {
                    info!(attempt, bytes = audio.len(), "Synthesis succeeded");
                    return Ok(audio);
                }
                Err(e) => e,
            };

            let attempt_dt = attempt_t0.elapsed();
            let total_dt = total_t0.elapsed();

            if attempt >= self.policy.max_attempts {
                error!(
                    attempt,
                    max = self.policy.max_attempts,
                    elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                    elapsed_ms_total = total_dt.as_millis() as u64,
                    error = %e,
                    "synthesize() exhausted retries"
                );
                return Err(e);
            }

            let delay = self.policy.backoff(attempt, e.is_rate_limited()) + self.policy.jitter();
            warn!(
                attempt,
                max = self.policy.max_attempts,
                elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                elapsed_ms_total = total_dt.as_millis() as u64,
                rate_limited = e.is_rate_limited(),
                ?delay,
                error = %e,
                "synthesize() attempt failed; backing off"
            );
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed sequence of outcomes, one per call.
    struct ScriptedEngine {
        outcomes: Mutex<VecDeque<Result<Vec<u8>, SynthesisError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new(outcomes: Vec<Result<Vec<u8>, SynthesisError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SpeechEngine for ScriptedEngine {
        async fn synthesize(
            &self,
            _text: &str,
            _voice: &VoiceProfile,
            _prosody: &Prosody,
        ) -> Result<Vec<u8>, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SynthesisError::EmptyAudio))
        }
    }

    struct SlowEngine;

    impl SpeechEngine for SlowEngine {
        async fn synthesize(
            &self,
            _text: &str,
            _voice: &VoiceProfile,
            _prosody: &Prosody,
        ) -> Result<Vec<u8>, SynthesisError> {
            sleep(Duration::from_secs(5)).await;
            Ok(vec![1])
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            rate_limit_delay: Duration::from_secs(6),
            max_jitter: Duration::from_millis(1000),
            attempt_timeout: Duration::from_secs(30),
        };
        assert_eq!(policy.backoff(1, false), Duration::from_secs(4));
        assert_eq!(policy.backoff(2, false), Duration::from_secs(8));
        assert_eq!(policy.backoff(3, false), Duration::from_secs(16));
        assert_eq!(policy.backoff(4, false), Duration::from_secs(30));
        assert_eq!(policy.backoff(10, false), Duration::from_secs(30));
        assert_eq!(policy.backoff(2, true), Duration::from_secs(14));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            max_jitter: Duration::from_millis(250),
            ..fast_policy()
        };
        for _ in 0..100 {
            assert!(policy.jitter() <= Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_success() {
        let engine = ScriptedEngine::new(vec![
            Err(SynthesisError::RateLimited("403 Forbidden".into())),
            Err(SynthesisError::RateLimited("403 Forbidden".into())),
            Ok(vec![0xff, 0xfb]),
        ]);
        let retry = RetrySpeech::new(engine, fast_policy());

        let audio = retry
            .synthesize("hello", &VoiceProfile::default(), &Prosody::default())
            .await
            .unwrap();
        assert_eq!(audio, vec![0xff, 0xfb]);
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let engine = ScriptedEngine::new(vec![
            Err(SynthesisError::Connection("reset".into())),
            Err(SynthesisError::Connection("reset".into())),
            Err(SynthesisError::Connection("reset".into())),
            Ok(vec![1]),
        ]);
        let retry = RetrySpeech::new(engine, fast_policy());

        let err = retry
            .synthesize("hello", &VoiceProfile::default(), &Prosody::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Connection(_)));
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_reported() {
        let policy = RetryPolicy {
            max_attempts: 1,
            attempt_timeout: Duration::from_millis(20),
            ..fast_policy()
        };
        let retry = RetrySpeech::new(SlowEngine, policy);
        let err = retry
            .synthesize("hello", &VoiceProfile::default(), &Prosody::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::Timeout(_)));
    }
}
