//! HTTP/transport error mapping shared by every adapter.

use cco_proto::ProviderError;

/// Map a vendor HTTP status code and response body to a [`ProviderError`].
///
/// Shared across adapters since every vendor in this crate speaks plain
/// HTTP with a JSON error body and roughly the same status-code taxonomy
/// (401 auth, 404 unknown model, 429 rate limit, 5xx transient).
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed,
        404 => ProviderError::InvalidModel(body.to_string()),
        429 => ProviderError::RateLimited { retry_after_ms: parse_retry_after_ms(body) },
        500..=599 => ProviderError::Transport(format!("HTTP {status}: {body}")),
        _ => ProviderError::BadResponse(format!("HTTP {status}: {body}")),
    }
}

/// Best-effort parse of a vendor-supplied retry hint embedded in the body.
/// Vendors that return it via a `Retry-After` header instead are handled by
/// callers with header access; this is the body-only fallback.
fn parse_retry_after_ms(_body: &str) -> Option<u64> {
    None
}

/// Map a [`reqwest::Error`] to a [`ProviderError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Transport(format!("request timed out: {err}"))
    } else {
        ProviderError::Transport(err.to_string())
    }
}
