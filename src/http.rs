//! Shared HTTP plumbing for the remote services.
//!
//! Gemini, Ollama and Qdrant clients all send through [`send_with_retry`]:
//! a bounded loop that retries transport errors and transient statuses
//! with exponential backoff, logging every retry at `warn`. A server's
//! `Retry-After` is honored up to [`MAX_RETRY_AFTER_MS`], and no retry is
//! started once it would overrun the policy's retry budget.

use crate::config::ResolvedConfig;
use crate::error::Result;
use std::time::{Duration, Instant};
use tracing::warn;

pub const BASE_BACKOFF_MS: u64 = 200;
pub const MAX_RETRY_AFTER_MS: u64 = 30_000;
pub const DEFAULT_RETRY_BUDGET_MS: u64 = 60_000;

/// Timeout and retry budget for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    /// Wall-clock limit for a call including its retries; zero is unlimited.
    pub retry_budget: Duration,
}

impl RetryPolicy {
    /// Policy for ordinary API calls.
    #[must_use]
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.http_timeout_secs.max(1)),
            max_retries: config.http_max_retries,
            retry_budget: Duration::from_millis(DEFAULT_RETRY_BUDGET_MS),
        }
    }

    /// Policy for document transcription, which may run for minutes.
    #[must_use]
    pub fn transcription(config: &ResolvedConfig) -> Self {
        let timeout = Duration::from_secs(config.transcribe_timeout_secs.max(1));
        Self {
            timeout,
            max_retries: config.http_max_retries,
            retry_budget: timeout + Duration::from_millis(DEFAULT_RETRY_BUDGET_MS),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::config::DEFAULT_HTTP_TIMEOUT_SECS),
            max_retries: crate::config::DEFAULT_HTTP_MAX_RETRIES,
            retry_budget: Duration::from_millis(DEFAULT_RETRY_BUDGET_MS),
        }
    }
}

/// A request that still failed after its retries.
#[derive(Debug, thiserror::Error)]
pub enum HttpFailure {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl HttpFailure {
    /// The HTTP status, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

/// Build a client with the policy's request timeout.
///
/// # Errors
///
/// Returns `Http` if the TLS backend cannot be initialized.
pub fn build_client(policy: &RetryPolicy) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(policy.timeout).build()?)
}

/// 409 is left out: for Qdrant it means the collection already exists.
#[must_use]
pub fn should_retry_status(status: u16) -> bool {
    status == 408 || status == 425 || status == 429 || status >= 500
}

#[must_use]
pub fn next_backoff_ms(attempt: u32) -> u64 {
    let shift = attempt.min(6);
    BASE_BACKOFF_MS.saturating_mul(1_u64 << shift)
}

#[must_use]
pub fn is_retryable_http_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Delay before the next attempt: the backoff, or the server's
/// `Retry-After` when longer, capped at [`MAX_RETRY_AFTER_MS`].
#[must_use]
pub fn retry_delay_ms(attempt: u32, retry_after_ms: Option<u64>) -> u64 {
    let requested = retry_after_ms.unwrap_or(0).min(MAX_RETRY_AFTER_MS);
    next_backoff_ms(attempt).max(requested)
}

#[must_use]
pub fn retry_budget_allows_delay(elapsed_ms: u64, delay_ms: u64, retry_budget_ms: u64) -> bool {
    if retry_budget_ms == 0 {
        return true;
    }
    elapsed_ms.saturating_add(delay_ms) <= retry_budget_ms
}

/// Honor a numeric `Retry-After` header, in milliseconds.
#[must_use]
pub fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    raw.parse::<u64>().ok().map(|secs| secs.saturating_mul(1000))
}

/// Send a request, retrying transient failures.
///
/// `build` is called once per attempt, since a `RequestBuilder` is consumed
/// by sending. Only successful responses are returned; any other status
/// is read into [`HttpFailure::Status`].
///
/// # Errors
///
/// Returns the last failure once retries are exhausted or the failure is
/// not retryable.
pub async fn send_with_retry<F>(
    service: &str,
    policy: &RetryPolicy,
    build: F,
) -> std::result::Result<reqwest::Response, HttpFailure>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let max_retries = policy.max_retries;
    let budget_ms = u64::try_from(policy.retry_budget.as_millis()).unwrap_or(u64::MAX);
    let started = Instant::now();
    let mut attempt = 0;
    let within_budget = |delay_ms: u64| {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        retry_budget_allows_delay(elapsed_ms, delay_ms, budget_ms)
    };

    loop {
        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                let retry_after_ms = parse_retry_after_ms(response.headers());
                let body = response.text().await.unwrap_or_default();
                let backoff_ms = retry_delay_ms(attempt, retry_after_ms);
                if attempt < max_retries
                    && should_retry_status(status.as_u16())
                    && within_budget(backoff_ms)
                {
                    warn!(
                        service,
                        attempt,
                        status = status.as_u16(),
                        backoff_ms,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                    continue;
                }

                return Err(HttpFailure::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            Err(error) => {
                let backoff_ms = next_backoff_ms(attempt);
                if attempt < max_retries
                    && is_retryable_http_error(&error)
                    && within_budget(backoff_ms)
                {
                    warn!(service, attempt, backoff_ms, error = %error, "Request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                    continue;
                }
                return Err(HttpFailure::Transport(error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retry_status_selection() {
        assert!(should_retry_status(429));
        assert!(should_retry_status(503));
        assert!(should_retry_status(408));
        assert!(!should_retry_status(400));
        assert!(!should_retry_status(404));
        assert!(!should_retry_status(409));
    }

    #[test]
    fn test_retry_after_is_capped() {
        assert_eq!(retry_delay_ms(0, None), 200);
        assert_eq!(retry_delay_ms(0, Some(3000)), 3000);
        assert_eq!(retry_delay_ms(3, Some(100)), 1600);
        assert_eq!(retry_delay_ms(0, Some(86_400_000)), MAX_RETRY_AFTER_MS);
    }

    #[test]
    fn test_retry_budget() {
        assert!(retry_budget_allows_delay(1_000, 2_000, 5_000));
        assert!(!retry_budget_allows_delay(4_000, 2_000, 5_000));
        assert!(retry_budget_allows_delay(u64::MAX, 2_000, 0));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(next_backoff_ms(0), 200);
        assert_eq!(next_backoff_ms(1), 400);
        assert_eq!(next_backoff_ms(2), 800);
        assert_eq!(next_backoff_ms(6), next_backoff_ms(20));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after_ms(&headers), None);
        headers.insert("retry-after", "3".parse().unwrap());
        assert_eq!(parse_retry_after_ms(&headers), Some(3000));
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried_then_reported() {
        let policy = RetryPolicy {
            timeout: Duration::from_secs(2),
            max_retries: 1,
            retry_budget: Duration::from_millis(DEFAULT_RETRY_BUDGET_MS),
        };
        let client = build_client(&policy).unwrap();
        let attempts = AtomicU32::new(0);

        let result = send_with_retry("test", &policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            client.get("http://127.0.0.1:1/")
        })
        .await;

        assert!(matches!(result, Err(HttpFailure::Transport(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
