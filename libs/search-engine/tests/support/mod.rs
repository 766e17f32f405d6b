#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use cobalt_engine::{EngineConfig, SearchEngine};
use cobalt_transport::{Method, Result, SearchTransport, TransportRequest, TransportResponse};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub use fixtures::*;

const SCROLL_PATH: &str = "/_search/scroll";

struct ScrollState {
    endpoint: String,
    position: usize,
    batch_size: usize,
}

#[derive(Default)]
struct State {
    requests: Vec<TransportRequest>,
    scrolls: HashMap<String, ScrollState>,
    opened: Vec<String>,
    cleared: Vec<String>,
    next_scroll: usize,
    scroll_hops: usize,
}

/// In-memory search backend.
///
/// - `GET <index>` windows the index's documents with `from`/`size` and
///   rejects windows beyond `result_window` with status 400
/// - `GET <index>?scroll=..` opens a scroll context; `POST` and `DELETE` on
///   `/_search/scroll` continue and clear it
/// - scripted responses answer fixed paths regardless of the body
pub struct FakeBackend {
    result_window: usize,
    indices: HashMap<String, Vec<Value>>,
    scripted: HashMap<String, TransportResponse>,
    fail_on_scroll_hop: Option<usize>,
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new(result_window: usize) -> Self {
        Self {
            result_window,
            indices: HashMap::new(),
            scripted: HashMap::new(),
            fail_on_scroll_hop: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_index(mut self, endpoint: &str, docs: Vec<Value>) -> Self {
        self.indices.insert(endpoint.to_string(), docs);
        self
    }

    pub fn with_response(mut self, path: &str, body: Value) -> Self {
        self.scripted
            .insert(path.to_string(), TransportResponse::ok(body));
        self
    }

    pub fn with_status(mut self, path: &str, status: u16) -> Self {
        self.scripted
            .insert(path.to_string(), TransportResponse::new(status, Value::Null));
        self
    }

    /// Answers the `hop`-th scroll continuation (1-based) with status 500.
    pub fn failing_on_scroll_hop(mut self, hop: usize) -> Self {
        self.fail_on_scroll_hop = Some(hop);
        self
    }

    pub fn into_engine(self, config: EngineConfig) -> (Arc<Self>, SearchEngine) {
        let backend = Arc::new(self);
        let engine = SearchEngine::new(backend.clone(), config);
        (backend, engine)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<TransportRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn opened_scrolls(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn cleared_scrolls(&self) -> Vec<String> {
        self.state.lock().unwrap().cleared.clone()
    }

    pub fn open_scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls.len()
    }

    fn hits(&self, endpoint: &str, from: usize, size: usize) -> Value {
        let docs = self.indices.get(endpoint).map(Vec::as_slice).unwrap_or_default();
        let hits: Vec<Value> = docs
            .iter()
            .enumerate()
            .skip(from)
            .take(size)
            .map(|(i, doc)| json!({"_id": i.to_string(), "_source": doc}))
            .collect();
        json!({"total": {"value": docs.len(), "relation": "eq"}, "hits": hits})
    }

    fn search(&self, request: &TransportRequest) -> TransportResponse {
        let body = request.body.clone().unwrap_or(Value::Null);
        let size = body["size"].as_u64().unwrap_or(10) as usize;
        let from = body["from"].as_u64().unwrap_or(0) as usize;

        if request.param("scroll").is_some() {
            let mut state = self.state.lock().unwrap();
            state.next_scroll += 1;
            let id = format!("scroll-{}", state.next_scroll);
            state.opened.push(id.clone());
            state.scrolls.insert(
                id.clone(),
                ScrollState {
                    endpoint: request.path.clone(),
                    position: size,
                    batch_size: size,
                },
            );
            return TransportResponse::ok(
                json!({"_scroll_id": id, "hits": self.hits(&request.path, 0, size)}),
            );
        }

        if from + size > self.result_window {
            return TransportResponse::new(
                400,
                json!({"error": {"type": "illegal_argument_exception"}}),
            );
        }
        TransportResponse::ok(json!({"hits": self.hits(&request.path, from, size)}))
    }

    fn continue_scroll(&self, request: &TransportRequest) -> TransportResponse {
        let id = request
            .body
            .as_ref()
            .and_then(|b| b["scroll_id"].as_str())
            .unwrap_or_default()
            .to_string();
        let mut state = self.state.lock().unwrap();
        state.scroll_hops += 1;
        if Some(state.scroll_hops) == self.fail_on_scroll_hop {
            return TransportResponse::new(500, Value::Null);
        }
        let Some(scroll) = state.scrolls.get_mut(&id) else {
            return TransportResponse::new(404, Value::Null);
        };
        let hits = self.hits(&scroll.endpoint, scroll.position, scroll.batch_size);
        scroll.position += scroll.batch_size;
        TransportResponse::ok(json!({"_scroll_id": id, "hits": hits}))
    }

    fn clear_scroll(&self, request: &TransportRequest) -> TransportResponse {
        let id = request
            .body
            .as_ref()
            .and_then(|b| b["scroll_id"].as_str())
            .unwrap_or_default()
            .to_string();
        let mut state = self.state.lock().unwrap();
        let found = state.scrolls.remove(&id).is_some();
        state.cleared.push(id);
        TransportResponse::ok(json!({"succeeded": found, "num_freed": usize::from(found)}))
    }
}

#[async_trait]
impl SearchTransport for FakeBackend {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.state.lock().unwrap().requests.push(request.clone());

        if let Some(response) = self.scripted.get(&request.path) {
            return Ok(response.clone());
        }
        let response = match (request.method, request.path.as_str()) {
            (Method::Post, SCROLL_PATH) => self.continue_scroll(&request),
            (Method::Delete, SCROLL_PATH) => self.clear_scroll(&request),
            (Method::Get, _) if self.indices.contains_key(&request.path) => self.search(&request),
            _ => TransportResponse::new(404, Value::Null),
        };
        Ok(response)
    }
}
