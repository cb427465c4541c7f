use std::time::Duration;

const MAX_BACKOFF_MS: u64 = 30_000;

pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

pub(crate) fn retry_delay(
    base_delay_ms: u64,
    attempt: usize,
    retry_after: Option<Duration>,
) -> Duration {
    if let Some(delay) = retry_after {
        return delay.max(Duration::from_millis(base_delay_ms));
    }
    let exponent = attempt.saturating_sub(1).min(10) as u32;
    let scaled = base_delay_ms.saturating_mul(2_u64.saturating_pow(exponent));
    Duration::from_millis(scaled.min(MAX_BACKOFF_MS))
}

pub(crate) fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// Whether a request may be resent after the server could have acted on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryMode {
    /// Resending converges on the same remote state (GET, PATCH, PUT).
    Idempotent,
    /// A resend may duplicate a side effect (issue creation). Only failures
    /// the server cannot have acted on are retried.
    NonIdempotent,
}

impl RetryMode {
    pub(crate) fn allows_status(self, status: u16, retry_after: Option<Duration>) -> bool {
        match self {
            RetryMode::Idempotent => is_retryable_status(status),
            RetryMode::NonIdempotent => status == 429 && retry_after.is_some(),
        }
    }

    pub(crate) fn allows_transport_error(self, error: &reqwest::Error) -> bool {
        match self {
            RetryMode::Idempotent => is_retryable_transport_error(error),
            RetryMode::NonIdempotent => error.is_connect() && !error.is_timeout(),
        }
    }
}

/// Pulls the human-readable `message` out of a GitHub error body, falling
/// back to the raw (truncated) text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| truncate_for_error(body, 800))
}

pub(crate) fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
