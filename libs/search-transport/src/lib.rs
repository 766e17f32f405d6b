//! Search backend transport
//!
//! The engine talks to the backend through one narrow contract,
//! [`SearchTransport`]: send `{method, path, body}`, receive
//! `{status, body}`. [`HttpTransport`] implements it over a pooled reqwest
//! client; tests implement it in memory.

pub mod error;
pub mod http;
pub mod request;

use async_trait::async_trait;
use std::sync::Arc;

pub use error::{Result, TransportError};
pub use http::{HttpTransport, HttpTransportConfig};
pub use request::{Method, TransportRequest, TransportResponse};

/// One request/response exchange with the search backend.
///
/// Implementations return non-success statuses as ordinary responses.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

#[async_trait]
impl<T: SearchTransport + ?Sized> SearchTransport for Arc<T> {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        (**self).send(request).await
    }
}
