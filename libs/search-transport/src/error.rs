//! Error types for the search transport

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, TransportError>;

/// Failures below the HTTP status level.
///
/// A response with a non-success status is not an error here; it is handed
/// back as a [`TransportResponse`](crate::TransportResponse) for the caller
/// to judge.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}
