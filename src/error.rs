use std::time::Duration;

use reqwest::StatusCode;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    /// Input text was empty after trimming.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Chat-completion request could not be encoded.
    #[error("failed to serialize request: {0}")]
    Serialization(#[source] serde_json::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("AI API returned error {status}: {body}")]
    Http { status: u16, body: String },
    /// A single attempt exceeded its time budget.
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// Response body was not a valid chat-completion payload.
    #[error("decode error: {0}")]
    Decode(String),
    /// Provider answered, but without usable generated text.
    #[error("empty response from AI API: {0}")]
    EmptyResponse(String),
    /// Every allowed attempt failed; carries the last failure.
    #[error("operation failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: Box<RefineError>,
    },
    /// Cancelled while waiting between attempts.
    #[error("operation interrupted during backoff")]
    Interrupted,
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RefineError {
    /// Reports whether a failure is likely transient and worth another attempt.
    ///
    /// HTTP statuses are checked first so that 429 is accepted before the
    /// general 4xx exclusion applies.
    pub fn is_retryable(&self) -> bool {
        match self {
            RefineError::Http { status, .. } => StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            RefineError::Timeout { .. } => true,
            RefineError::Transport(err) => is_retryable_transport(err),
            RefineError::InvalidInput(_)
            | RefineError::Serialization(_)
            | RefineError::Decode(_)
            | RefineError::EmptyResponse(_)
            | RefineError::RetriesExhausted { .. }
            | RefineError::Interrupted
            | RefineError::Config(_) => false,
        }
    }

    /// Returns the innermost failure when retries were exhausted.
    pub fn last_error(&self) -> &RefineError {
        match self {
            RefineError::RetriesExhausted { source, .. } => source.last_error(),
            other => other,
        }
    }
}

/// 5xx and 429 are retryable; every other status is not.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_retryable_transport(err: &reqwest::Error) -> bool {
    // Builder, redirect and body-decode failures will not change on resend.
    !(err.is_builder() || err.is_redirect() || err.is_decode())
}
