//! Backoff helpers for generation submission.

use std::time::Duration;

/// Retry attempts for rate-limited or transiently failing submissions.
pub const SUBMIT_RETRIES: u32 = 3;

/// Base delay for exponential backoff.
pub const SUBMIT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Cap on the backoff delay.
pub const SUBMIT_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Whether a reqwest error is worth retrying.
///
/// Connection failures, timeouts, and gateway-class status codes usually
/// clear on a later attempt; anything else is treated as permanent.
pub fn is_transient(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() || error.is_body() {
        return true;
    }

    matches!(
        error.status().map(|s| s.as_u16()),
        Some(502) | Some(503) | Some(504)
    )
}

/// Delay before retry number `attempt` (zero-based): `base * 2^attempt`,
/// capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(max)
}

/// Parse a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}
