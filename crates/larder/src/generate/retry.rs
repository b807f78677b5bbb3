//! Retrying generator calls with exponential backoff.
//!
//! Provider errors are plain strings. They are classified by content:
//! rate limits, 5xx responses and network failures are retried, client
//! errors are not. An unrecognized error counts as transient.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff settings for generator calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = fail immediately).
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Shave a fixed per-attempt fraction off each delay so concurrent
    /// callers do not retry in lockstep.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// A config that retries `retries` times without waiting.
    pub fn immediate(retries: u32) -> Self {
        Self {
            max_retries: retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        if !self.jitter {
            return Duration::from_secs_f64(capped);
        }
        // Fixed jitter table, cycled by attempt.
        let factor = [0.75, 0.90, 0.60, 0.85][(attempt % 4) as usize];
        Duration::from_secs_f64(capped * factor)
    }
}

/// How a provider error should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying: rate limits, server errors, network trouble.
    Transient,
    /// Retrying cannot help: bad request, auth, unknown model.
    Permanent,
}

/// Classify a provider error string.
pub fn classify(error: &str) -> ErrorClass {
    const PERMANENT: [&str; 7] = [
        "HTTP 400",
        "HTTP 401",
        "HTTP 402",
        "HTTP 403",
        "HTTP 404",
        "HTTP 422",
        "not set",
    ];
    if PERMANENT.iter().any(|p| error.contains(p)) {
        ErrorClass::Permanent
    } else {
        ErrorClass::Transient
    }
}

/// Whether an error is one the retry loop should give up on immediately.
pub fn is_permanent_error(error: &str) -> bool {
    classify(error) == ErrorClass::Permanent
}

/// Run `op` until it succeeds, fails permanently, or runs out of retries.
/// Returns the last error and the number of attempts made.
pub async fn retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, (String, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if is_permanent_error(&e) => return Err((e, attempt + 1)),
            Err(e) if attempt >= config.max_retries => return Err((e, attempt + 1)),
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "Generation attempt {} failed, retrying in {:.1}s: {e}",
                    attempt + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_grows_and_caps() {
        let config = RetryConfig {
            jitter: false,
            max_delay: Duration::from_secs(2),
            ..RetryConfig::with_retries(10)
        };
        assert!(config.delay_for_attempt(1) > config.delay_for_attempt(0));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(2));
    }

    #[test]
    fn jitter_never_lengthens_delay() {
        let with = RetryConfig::with_retries(3);
        let without = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(3)
        };
        for attempt in 0..6 {
            assert!(with.delay_for_attempt(attempt) <= without.delay_for_attempt(attempt));
        }
    }

    #[test]
    fn classification() {
        assert_eq!(classify("OpenRouter API HTTP 429: slow down"), ErrorClass::Transient);
        assert_eq!(classify("OpenRouter API HTTP 503: unavailable"), ErrorClass::Transient);
        assert_eq!(classify("request failed: connection reset"), ErrorClass::Transient);
        assert_eq!(classify("OpenRouter API HTTP 401: unauthorized"), ErrorClass::Permanent);
        assert_eq!(classify("OPENROUTER_KEY not set"), ErrorClass::Permanent);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry(&RetryConfig::immediate(3), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("OpenRouter API HTTP 502: bad gateway".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_stops_immediately() {
        let result: Result<(), _> = retry(&RetryConfig::immediate(5), |_| async {
            Err("OpenRouter API HTTP 400: bad request".to_string())
        })
        .await;
        assert_eq!(result.unwrap_err().1, 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let result: Result<(), _> = retry(&RetryConfig::immediate(2), |_| async {
            Err("request failed: timed out".to_string())
        })
        .await;
        let (err, attempts) = result.unwrap_err();
        assert_eq!(attempts, 3);
        assert!(err.contains("timed out"));
    }
}
