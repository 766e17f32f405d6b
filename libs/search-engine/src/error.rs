//! Error types for the search engine

use cobalt_query::QueryError;
use cobalt_transport::{Method, TransportError};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Invalid pagination (first={page_size}, offset={offset}): {reason}")]
    InvalidPagination {
        page_size: usize,
        offset: usize,
        reason: String,
    },

    #[error("Search backend returned status {status} for {method} {path}")]
    Backend {
        status: u16,
        method: Method,
        path: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
}

impl Error {
    /// Errors caused by the caller's input, raised before any backend call.
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::Query(_) | Self::InvalidPagination { .. })
    }

    pub(crate) fn invalid_pagination(page_size: usize, offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPagination {
            page_size,
            offset,
            reason: reason.into(),
        }
    }
}
