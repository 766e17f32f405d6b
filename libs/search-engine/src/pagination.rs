//! Pagination engine
//!
//! Pages inside the backend's result window are fetched directly with
//! `from`/`size`. Pages beyond it are reached by rolling a scroll cursor:
//! - the scroll batch size is the largest multiple of the page size that fits
//!   in the window, so a page never straddles two batches
//! - the cursor is advanced until more hits than `offset` have been seen
//! - the page is sliced out of the current batch
//! - the cursor is released on every exit path
//!
//! In scroll mode `offset` must be a multiple of the page size; anything else
//! is rejected before the backend is contacted.

use crate::backend::send_json;
use crate::collect::{self, FieldPairs, OutputRow};
use crate::error::{Error, Result};
use cobalt_query::QueryDocument;
use cobalt_transport::{SearchTransport, TransportRequest};
use serde_json::{json, Value};
use std::sync::Arc;

/// Scroll continuation and release endpoint.
pub const SCROLL_ENDPOINT: &str = "/_search/scroll";

/// A requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: usize,
    pub offset: usize,
}

/// How a page is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStrategy {
    Direct { from: usize, size: usize },
    Scroll { batch_size: usize, skip: usize },
}

impl PageRequest {
    pub fn new(page_size: usize, offset: usize) -> Self {
        Self { page_size, offset }
    }

    /// Picks the fetch strategy for a backend result window of `window`.
    pub fn plan(&self, window: usize) -> Result<PageStrategy> {
        let Self { page_size, offset } = *self;
        if page_size > window {
            return Err(Error::invalid_pagination(
                page_size,
                offset,
                format!("parameter 'first' must not exceed {window}"),
            ));
        }
        if page_size.saturating_add(offset) <= window {
            return Ok(PageStrategy::Direct {
                from: offset,
                size: page_size,
            });
        }
        if page_size == 0 {
            return Err(Error::invalid_pagination(
                page_size,
                offset,
                "parameter 'first' must be positive beyond the result window",
            ));
        }
        if offset % page_size != 0 {
            return Err(Error::invalid_pagination(
                page_size,
                offset,
                "'offset' must be a multiple of 'first' beyond the result window",
            ));
        }
        let batch_size = (window / page_size) * page_size;
        Ok(PageStrategy::Scroll {
            batch_size,
            skip: offset % batch_size,
        })
    }
}

/// The backend batch holding a page, and where the page starts in it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBatch {
    pub response: Value,
    pub skip: usize,
}

/// Backend-issued scroll cursor, owned by a single request.
///
/// Release it with [`ScrollCursor::release`]. A cursor dropped without
/// release (early return, panic, cancelled future) is cleared from a
/// spawned task when a tokio runtime is available.
pub struct ScrollCursor {
    transport: Arc<dyn SearchTransport>,
    scroll_id: Option<String>,
    keep_alive: String,
}

impl ScrollCursor {
    /// Runs the initial search with a scroll context and returns the cursor
    /// together with the first batch.
    pub async fn open(
        transport: Arc<dyn SearchTransport>,
        endpoint: &str,
        body: QueryDocument,
        keep_alive: &str,
    ) -> Result<(Self, Value)> {
        let request = TransportRequest::get(endpoint)
            .with_param("scroll", keep_alive)
            .with_body(body);
        let response = send_json(transport.as_ref(), request).await?;
        let scroll_id = scroll_id(&response).ok_or_else(|| {
            Error::MalformedResponse("scroll search returned no _scroll_id".to_string())
        })?;
        let cursor = Self {
            transport,
            scroll_id: Some(scroll_id),
            keep_alive: keep_alive.to_string(),
        };
        Ok((cursor, response))
    }

    pub fn id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// Fetches the next batch and renews the keep-alive.
    pub async fn advance(&mut self) -> Result<Value> {
        let Some(id) = self.scroll_id.clone() else {
            return Err(Error::MalformedResponse(
                "scroll cursor already released".to_string(),
            ));
        };
        let request = TransportRequest::post(SCROLL_ENDPOINT)
            .with_body(json!({ "scroll": self.keep_alive, "scroll_id": id }));
        let response = send_json(self.transport.as_ref(), request).await?;
        if let Some(next) = scroll_id(&response) {
            self.scroll_id = Some(next);
        }
        Ok(response)
    }

    /// Clears the cursor on the backend. Failures are logged, not returned.
    pub async fn release(mut self) {
        if let Some(id) = self.scroll_id.take() {
            clear_scroll(self.transport.as_ref(), &id).await;
        }
    }
}

impl Drop for ScrollCursor {
    fn drop(&mut self) {
        let Some(id) = self.scroll_id.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let transport = Arc::clone(&self.transport);
                handle.spawn(async move {
                    clear_scroll(transport.as_ref(), &id).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    scroll_id = %id,
                    "Scroll cursor dropped outside a runtime, leaving it to expire"
                );
            }
        }
    }
}

async fn clear_scroll(transport: &dyn SearchTransport, id: &str) {
    let request = TransportRequest::delete(SCROLL_ENDPOINT).with_body(json!({ "scroll_id": id }));
    if let Err(e) = send_json(transport, request).await {
        tracing::warn!(error = %e, "Failed to release scroll cursor");
    }
}

fn scroll_id(response: &Value) -> Option<String> {
    response
        .get("_scroll_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Fetches pages with direct windowing or a scroll cursor.
#[derive(Clone)]
pub struct PaginationEngine {
    transport: Arc<dyn SearchTransport>,
    result_window: usize,
    keep_alive: String,
}

impl PaginationEngine {
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        result_window: usize,
        keep_alive: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            result_window,
            keep_alive: keep_alive.into(),
        }
    }

    pub fn result_window(&self) -> usize {
        self.result_window
    }

    /// Rows of one logical page.
    pub async fn collect_page(
        &self,
        endpoint: &str,
        query: QueryDocument,
        fields: &FieldPairs,
        highlights: &FieldPairs,
        page: PageRequest,
    ) -> Result<Vec<OutputRow>> {
        let batch = self.fetch_page(endpoint, query, page).await?;
        collect::collect_page(&batch.response, fields, highlights, page.page_size, batch.skip)
    }

    /// The backend batch holding the requested page.
    pub async fn fetch_page(
        &self,
        endpoint: &str,
        query: QueryDocument,
        page: PageRequest,
    ) -> Result<PageBatch> {
        match page.plan(self.result_window)? {
            PageStrategy::Direct { from, size } => {
                let mut body = query;
                body.set_window(from, size);
                let request = TransportRequest::get(endpoint).with_body(body);
                let response = send_json(self.transport.as_ref(), request).await?;
                Ok(PageBatch { response, skip: 0 })
            }
            PageStrategy::Scroll { batch_size, skip } => {
                let mut body = query;
                body.remove("from");
                body.set_size(batch_size);
                let response = self.roll_to_page(endpoint, body, page.offset).await?;
                Ok(PageBatch { response, skip })
            }
        }
    }

    async fn roll_to_page(&self, endpoint: &str, body: QueryDocument, offset: usize) -> Result<Value> {
        let (mut cursor, first) =
            ScrollCursor::open(Arc::clone(&self.transport), endpoint, body, &self.keep_alive)
                .await?;
        let outcome = roll(&mut cursor, first, offset).await;
        cursor.release().await;
        outcome
    }

    /// Every value of `_source.<field>` across the whole result set.
    pub async fn collect_field(
        &self,
        endpoint: &str,
        query: QueryDocument,
        field: &str,
    ) -> Result<Vec<String>> {
        let mut body = query;
        body.remove("from");
        body.set_size(self.result_window);
        let (mut cursor, first) =
            ScrollCursor::open(Arc::clone(&self.transport), endpoint, body, &self.keep_alive)
                .await?;
        let outcome = drain_field(&mut cursor, first, field).await;
        cursor.release().await;
        outcome
    }
}

async fn roll(cursor: &mut ScrollCursor, first: Value, offset: usize) -> Result<Value> {
    let mut response = first;
    let mut batch_len = collect::hits(&response)?.len();
    let mut rolled = batch_len;
    while rolled <= offset && batch_len > 0 {
        tracing::info!(rolled, offset, "Rolling scroll cursor toward page");
        response = cursor.advance().await?;
        batch_len = collect::hits(&response)?.len();
        rolled += batch_len;
    }
    Ok(response)
}

async fn drain_field(cursor: &mut ScrollCursor, first: Value, field: &str) -> Result<Vec<String>> {
    let mut values = Vec::new();
    let mut response = first;
    loop {
        let hits = collect::hits(&response)?;
        if hits.is_empty() {
            return Ok(values);
        }
        tracing::info!(field, collected = values.len(), "Collecting field values");
        values.extend(hits.iter().filter_map(|hit| {
            match hit.get("_source").and_then(|s| s.get(field))? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }
        }));
        response = cursor.advance().await?;
    }
}
