//! Error types for query construction

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, QueryError>;

/// Query construction errors.
///
/// Raised before any backend call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Lower bound and upper bound of range parameter '{field}' can't both be null")]
    InvalidRange { field: String },

    #[error("Invalid value for parameter '{field}': {reason}")]
    InvalidParameter { field: String, reason: String },
}
