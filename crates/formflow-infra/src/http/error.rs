//! Normalization of transport failures into [`ServiceError`].

use reqwest::StatusCode;
use serde_json::Value;

use formflow_types::error::ServiceError;

/// A request that produced no response (connect, timeout, TLS, ...).
pub(super) fn from_send_error(err: reqwest::Error) -> ServiceError {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("could not connect to the form backend: {err}")
    } else {
        format!("HTTP request failed: {err}")
    };
    ServiceError::network(message)
}

/// A response with a non-success status. The body becomes `details` when
/// it is JSON; its `detail` or `message` key, when present, becomes the
/// message.
pub(super) fn from_status(status: StatusCode, body: &str) -> ServiceError {
    let details = serde_json::from_str::<Value>(body).ok();

    let message = details
        .as_ref()
        .and_then(|d| d.get("detail").or_else(|| d.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let reason = status.canonical_reason().unwrap_or("error");
            if body.trim().is_empty() || details.is_some() {
                format!("HTTP {}: {reason}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), body.trim())
            }
        });

    ServiceError::http(status.as_u16(), message, details)
}

/// A success response whose body could not be decoded.
pub(super) fn from_decode_error(status: StatusCode, err: reqwest::Error) -> ServiceError {
    ServiceError::http(status.as_u16(), format!("failed to parse response: {err}"), None)
}
