//! Status handling shared by every backend round trip.

use crate::error::{Error, Result};
use cobalt_transport::{SearchTransport, TransportRequest};
use serde_json::Value;

/// Sends `request` and returns the body of a success response.
///
/// Any non-success status becomes [`Error::Backend`]; the body is not read.
pub(crate) async fn send_json(
    transport: &dyn SearchTransport,
    request: TransportRequest,
) -> Result<Value> {
    let method = request.method;
    let path = request.path.clone();
    let response = transport.send(request).await?;
    if !response.is_success() {
        return Err(Error::Backend {
            status: response.status,
            method,
            path,
        });
    }
    Ok(response.body)
}
