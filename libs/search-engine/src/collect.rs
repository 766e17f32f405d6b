//! Result collection
//!
//! Turns raw backend responses into output rows and aggregate rows:
//! - hits become [`OutputRow`]s through an output-name -> backend-field table
//! - highlight pairs surface only the first fragment of a field
//! - term/range buckets become [`GroupCount`] rows, in backend order
//! - stats aggregations become [`RangeStats`]
//!
//! A requested aggregation that is absent from the response collects as an
//! empty bucket list or a zero count.

use crate::error::{Error, Result};
use cobalt_query::{AggregationSpec, CountSource, CARDINALITY_AGG};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `(output name, backend field name)` pairs.
pub type FieldPairs = [(String, String)];

/// Normalized value of an output field.
///
/// Scalars are carried as their string form; `null` passes through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValue {
    Null,
    Text(String),
    List(Vec<RowValue>),
    Map(BTreeMap<String, RowValue>),
}

impl RowValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(s) => Self::Text(s.clone()),
            Value::Bool(b) => Self::Text(b.to_string()),
            Value::Number(n) => Self::Text(n.to_string()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

pub type OutputRow = BTreeMap<String, RowValue>;

/// One facet bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub group: String,
    pub count: u64,
}

/// Numeric summary of a range field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStats {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: u64,
}

/// `hits.hits` of a search response.
pub fn hits(response: &Value) -> Result<&[Value]> {
    response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| Error::MalformedResponse("missing hits.hits".to_string()))
}

/// Rows for hits `[skip, skip + page_size)` of the current batch.
pub fn collect_page(
    response: &Value,
    fields: &FieldPairs,
    highlights: &FieldPairs,
    page_size: usize,
    skip: usize,
) -> Result<Vec<OutputRow>> {
    Ok(hits(response)?
        .iter()
        .skip(skip)
        .take(page_size)
        .map(|hit| collect_row(hit, fields, highlights))
        .collect())
}

/// One output row. Highlight pairs only set a value when the hit carries
/// fragments for the field; later pairs win when they share an output name.
pub fn collect_row(hit: &Value, fields: &FieldPairs, highlights: &FieldPairs) -> OutputRow {
    let source = hit.get("_source");
    let mut row: OutputRow = fields
        .iter()
        .map(|(output, backend)| {
            let value = source
                .and_then(|s| s.get(backend))
                .map(RowValue::from_json)
                .unwrap_or(RowValue::Null);
            (output.clone(), value)
        })
        .collect();

    for (output, backend) in highlights {
        if let Some(fragment) = first_highlight(hit, backend) {
            row.insert(output.clone(), RowValue::Text(fragment.to_string()));
        }
    }
    row
}

/// First highlighted fragment of `field` on a hit.
pub fn first_highlight<'a>(hit: &'a Value, field: &str) -> Option<&'a str> {
    hit.get("highlight")?
        .get(field)?
        .as_array()?
        .first()?
        .as_str()
}

/// Every highlighted fragment of `field` on a hit.
pub fn highlights<'a>(hit: &'a Value, field: &str) -> Vec<&'a str> {
    hit.get("highlight")
        .and_then(|h| h.get(field))
        .and_then(Value::as_array)
        .map(|fragments| fragments.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn aggregations(response: &Value) -> Option<&Value> {
    response.get("aggregations")
}

fn buckets<'a>(response: &'a Value, spec: &AggregationSpec) -> &'a [Value] {
    aggregations(response)
        .and_then(|aggs| aggs.pointer(&spec.buckets_pointer()))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn bucket_key(bucket: &Value) -> Option<String> {
    if let Some(key) = bucket.get("key_as_string").and_then(Value::as_str) {
        return Some(key.to_string());
    }
    match bucket.get("key")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn as_count(value: Option<&Value>) -> u64 {
    value
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
        .unwrap_or(0)
}

/// Bucket rows of `spec`, counted per its [`CountSource`].
pub fn group_counts(response: &Value, spec: &AggregationSpec) -> Vec<GroupCount> {
    let source = spec.count_source();
    buckets(response, spec)
        .iter()
        .filter_map(|bucket| {
            let group = bucket_key(bucket)?;
            let count = match source {
                CountSource::DocCount => as_count(bucket.get("doc_count")),
                CountSource::Cardinality => {
                    as_count(bucket.get(CARDINALITY_AGG).and_then(|c| c.get("value")))
                }
            };
            Some(GroupCount { group, count })
        })
        .collect()
}

/// Bucket keys of `spec`, in backend order.
pub fn bucket_keys(response: &Value, spec: &AggregationSpec) -> Vec<String> {
    buckets(response, spec).iter().filter_map(bucket_key).collect()
}

/// Stats of `spec`. A zero count reports both bounds as `0`.
pub fn range_stats(response: &Value, spec: &AggregationSpec) -> RangeStats {
    let stats = aggregations(response).and_then(|aggs| aggs.pointer(&spec.pointer()));
    let count = as_count(stats.and_then(|s| s.get("count")));
    if count == 0 {
        return RangeStats {
            lower_bound: 0.0,
            upper_bound: 0.0,
            count: 0,
        };
    }
    let bound = |name: &str| {
        stats
            .and_then(|s| s.get(name))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };
    RangeStats {
        lower_bound: bound("min"),
        upper_bound: bound("max"),
        count,
    }
}

/// Value of a top-level metric aggregation (`aggregations.<name>.value`).
pub fn metric_value(response: &Value, name: &str) -> u64 {
    as_count(
        aggregations(response)
            .and_then(|aggs| aggs.get(name))
            .and_then(|agg| agg.get("value")),
    )
}

/// `hits.total.value`, or a bare numeric `hits.total`.
pub fn total_hits(response: &Value) -> Result<u64> {
    let total = response
        .pointer("/hits/total")
        .ok_or_else(|| Error::MalformedResponse("missing hits.total".to_string()))?;
    total
        .get("value")
        .unwrap_or(total)
        .as_u64()
        .ok_or_else(|| Error::MalformedResponse("hits.total is not a count".to_string()))
}

/// `count` of a `_count` endpoint response.
pub fn document_count(response: &Value) -> Result<u64> {
    response
        .get("count")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::MalformedResponse("missing count".to_string()))
}
