//! HTTP retry helper for metrics fetchers.
//!
//! Every metrics request goes through [`send_json`] so transient failures
//! (timeouts, connection resets, server errors, rate limiting) are retried
//! with exponential backoff.
//!
//! Unlike the provider retry in `city_pulse_ai`, this helper decodes the
//! body itself and maps every non-success status to
//! [`CitiesError::Upstream`]. A failed figure is simply left empty, so the
//! budget is smaller: two retries, 1s then 2s, against three retries
//! starting at 500ms for summarizer calls.

use std::time::Duration;

use crate::CitiesError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (1s, 2s) the total wait before giving up is
/// 3 seconds.
const MAX_RETRIES: u32 = 2;

/// Sends a GET built by `build_request` and returns the body as JSON.
///
/// `build_request` runs once per attempt; a sent builder cannot be reused.
///
/// Retries connection errors, timeouts, HTTP 429 and HTTP 5xx. Does
/// **not** retry other 4xx statuses; these are permanent.
///
/// # Errors
///
/// Returns [`CitiesError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, CitiesError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << (attempt - 1));
            log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) if is_transient(&e) && attempt < MAX_RETRIES => {
                log::warn!("  request failed ({e}), will retry");
                attempt += 1;
                continue;
            }
            Err(e) => return Err(CitiesError::Http(e)),
        };

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            if attempt < MAX_RETRIES {
                log::warn!("  HTTP {status}");
                attempt += 1;
                continue;
            }
            return Err(CitiesError::Upstream {
                message: format!("HTTP {status} after {MAX_RETRIES} retries"),
            });
        }

        if status.is_client_error() {
            return Err(CitiesError::Upstream {
                message: format!("HTTP {status}"),
            });
        }

        let text = response.text().await?;
        return Ok(serde_json::from_str(&text)?);
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}
