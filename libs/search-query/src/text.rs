//! Free-text query shapes used by global search.

use crate::document::QueryDocument;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Distinct-count aggregation attached to every global-search category.
pub const FIELD_COUNT_AGG: &str = "field_count";
/// Secondary facet aggregation collected next to the paged hits.
pub const SECONDARY_FACET_AGG: &str = "agg_field";

/// `bool.should` of one `match_phrase_prefix` clause per searchable field.
///
/// An empty input is a legal query.
pub fn phrase_prefix_query(fields: &[String], input: &str) -> QueryDocument {
    let should: Vec<Value> = fields
        .iter()
        .map(|field| json!({ "match_phrase_prefix": { field: input } }))
        .collect();
    QueryDocument::with_query(json!({ "bool": { "should": should } }))
}

/// Full-text `match` over a single field.
pub fn match_query(field: &str, input: &str) -> QueryDocument {
    QueryDocument::with_query(json!({ "match": { field: input } }))
}

/// Global-search request for one category: phrase-prefix query, distinct
/// count over `count_field`, ascending sort. The secondary facet is added by
/// the caller through [`AggregationPlanner`](crate::AggregationPlanner) so it
/// carries the terms bucket cap.
pub fn global_search_query(
    fields: &[String],
    input: &str,
    count_field: Option<&str>,
    sort_field: &str,
) -> QueryDocument {
    let mut doc = phrase_prefix_query(fields, input);
    if let Some(field) = count_field {
        doc.insert_agg(FIELD_COUNT_AGG, json!({ "cardinality": { "field": field } }));
    }
    doc.set_sort(json!({ sort_field: "asc" }));
    doc
}

/// Highlight section of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRequest {
    pub fields: Vec<String>,
    #[serde(default)]
    pub pre_tag: String,
    #[serde(default)]
    pub post_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_size: Option<u32>,
}

impl HighlightRequest {
    /// Highlight `fields` with empty tags.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            pre_tag: String::new(),
            post_tag: String::new(),
            fragment_size: None,
        }
    }

    pub fn with_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre_tag = pre.into();
        self.post_tag = post.into();
        self
    }

    pub fn with_fragment_size(mut self, size: u32) -> Self {
        self.fragment_size = Some(size);
        self
    }

    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.clone(), json!({})))
            .collect();
        let mut highlight = Map::new();
        highlight.insert("fields".to_string(), Value::Object(fields));
        highlight.insert("pre_tags".to_string(), json!([self.pre_tag]));
        highlight.insert("post_tags".to_string(), json!([self.post_tag]));
        if let Some(size) = self.fragment_size {
            highlight.insert("fragment_size".to_string(), json!(size));
        }
        Value::Object(highlight)
    }
}
