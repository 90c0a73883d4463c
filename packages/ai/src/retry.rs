//! HTTP retry for provider calls.
//!
//! Providers build their request inside a closure so a fresh
//! [`reqwest::RequestBuilder`] can be sent on each attempt. Transient
//! failures (connection errors, timeouts, HTTP 429, HTTP 5xx) are retried
//! with exponential backoff. Any other response is handed back to the
//! provider, which owns the decoding of error bodies.
//!
//! `city_pulse_cities` has its own JSON-returning helper with a shorter
//! schedule for metrics lookups; this one returns the raw response.

use std::time::Duration;

use crate::AiError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff before retry number `attempt` (1-based): 500ms, 1s, 2s, ...
#[must_use]
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(250u64 << attempt.min(10))
}

/// Returns `true` for statuses worth retrying.
#[must_use]
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Sends the request built by `build_request`, retrying transient
/// failures up to `max_retries` times.
///
/// Returns the first response that is not retryable, or the last
/// retryable one once retries are exhausted, so the caller can report
/// the provider's own error message.
///
/// # Errors
///
/// Returns [`AiError::Http`] if the request could not be sent after all
/// retries or failed with a non-transient error.
#[allow(clippy::future_not_send)]
pub async fn send_with_retry<F>(
    build_request: F,
    max_retries: u32,
) -> Result<reqwest::Response, AiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(AiError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && attempt < max_retries {
                    log::warn!("  HTTP {status} from provider");
                    attempt += 1;
                    continue;
                }
                return Ok(response);
            }
        }
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_secs(1));
        assert_eq!(backoff(3), Duration::from_secs(2));
    }

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(reqwest::StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(reqwest::StatusCode::OK));
    }
}
