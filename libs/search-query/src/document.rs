//! Query document
//!
//! A request body in the backend's JSON query DSL. Owned by a single request
//! and mutated in place as sort, paging, aggregation and highlight sections are
//! attached.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Backend request body (`query`, `aggs`, `sort`, `size`, `from`, `highlight`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryDocument {
    body: Map<String, Value>,
}

impl QueryDocument {
    /// Document with the given `query` clause.
    pub fn with_query(query: Value) -> Self {
        let mut body = Map::new();
        body.insert("query".to_string(), query);
        Self { body }
    }

    /// `{"query": {"match_all": {}}}`
    pub fn match_all() -> Self {
        Self::with_query(json!({ "match_all": {} }))
    }

    pub fn query(&self) -> Option<&Value> {
        self.body.get("query")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.body.insert(key.into(), value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.body.remove(key)
    }

    pub fn set_size(&mut self, size: usize) -> &mut Self {
        self.set("size", json!(size))
    }

    pub fn set_from(&mut self, from: usize) -> &mut Self {
        self.set("from", json!(from))
    }

    /// Direct `from`/`size` window.
    pub fn set_window(&mut self, from: usize, size: usize) -> &mut Self {
        self.set_from(from).set_size(size)
    }

    pub fn set_sort(&mut self, sort: Value) -> &mut Self {
        self.set("sort", sort)
    }

    /// Adds one named aggregation, keeping any already present.
    pub fn insert_agg(&mut self, name: impl Into<String>, agg: Value) -> &mut Self {
        let aggs = self
            .body
            .entry("aggs")
            .or_insert_with(|| Value::Object(Map::new()));
        if !aggs.is_object() {
            *aggs = Value::Object(Map::new());
        }
        if let Value::Object(aggs) = aggs {
            aggs.insert(name.into(), agg);
        }
        self
    }

    pub fn set_highlight(&mut self, highlight: Value) -> &mut Self {
        self.set("highlight", highlight)
    }

    pub fn size(&self) -> Option<usize> {
        self.body
            .get("size")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.body)
    }
}

impl From<QueryDocument> for Value {
    fn from(doc: QueryDocument) -> Self {
        doc.into_json()
    }
}
