//! Content generator error types.

use thiserror::Error;

/// Errors that can occur when requesting generated content.
///
/// Every failure of the external service maps here; no raw transport or
/// parse error crosses the generator boundary.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP request failed (network error or timeout).
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-success status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The completion response did not have the expected shape.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    /// The room payload was unparsable or missing required fields.
    #[error("invalid room payload: {0}")]
    InvalidRoom(String),
}
