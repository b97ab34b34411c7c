//! Relay error taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that end a single relayed request.
///
/// None of these are fatal to the process; each maps to an error response
/// for the request that raised it.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Target is not an absolute http(s) URL, or its encoding is malformed.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Outbound network or transport failure.
    #[error("{0}")]
    Fetch(String),

    /// The rewrite engine failed to initialize or to produce a response.
    #[error("rewrite engine '{engine}' failed: {message}")]
    Engine { engine: String, message: String },

    /// A page buffered by the rewrite path exceeded its size limit.
    #[error("page exceeds {limit} bytes")]
    PageTooLarge { limit: usize },
}

pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Build a fetch error carrying the whole source chain of `err`.
    pub fn fetch(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::Fetch(error_chain(err))
    }

    /// HTTP status reported to the caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidTarget { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Join an error and its sources into one readable line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
