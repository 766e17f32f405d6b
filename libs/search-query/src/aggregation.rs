//! Aggregation planning.
//!
//! Turns [`AggregationSpec`]s into the backend's `aggs` subtree:
//! - `Terms`: a terms aggregation with a bucket cap far above expected
//!   cardinality, optionally restricted to an include list
//! - `RangeStats`: a `stats` aggregation (min/max/count)
//! - `NestedTerms`: a `nested{path}` wrapper around one inner terms
//!   aggregation (one level deep)
//! - `Ranges`: keyed numeric range buckets
//!
//! A cardinality sub-aggregation named [`CARDINALITY_AGG`] can be attached to
//! every bucketing kind. Callers must then read counts through
//! [`CountSource::Cardinality`]; the switch is explicit, never inferred from
//! the response.

use crate::document::QueryDocument;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Name of the distinct-count sub-aggregation inside each bucket.
pub const CARDINALITY_AGG: &str = "cardinality_count";

pub const DEFAULT_TERMS_BUCKET_CAP: usize = 100_000;
pub const DEFAULT_PRECISION_THRESHOLD: u32 = 40_000;

/// One keyed bucket of a range aggregation. Bounds are `[from, to)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBucket {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
}

impl RangeBucket {
    pub fn new(key: impl Into<String>, from: Option<f64>, to: Option<f64>) -> Self {
        Self {
            key: key.into(),
            from,
            to,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    Terms {
        field: String,
        /// `None` uses the planner's cap.
        bucket_cap: Option<usize>,
        include_only: Vec<String>,
    },
    RangeStats {
        field: String,
    },
    NestedTerms {
        path: String,
        /// Field name relative to `path`.
        field: String,
    },
    Ranges {
        field: String,
        ranges: Vec<RangeBucket>,
    },
}

/// Where a bucket's count is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    /// The bucket's raw `doc_count`.
    DocCount,
    /// `cardinality_count.value` inside the bucket.
    Cardinality,
}

/// A named aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSpec {
    pub name: String,
    pub kind: AggregationKind,
    /// Field whose distinct values are counted per bucket.
    pub cardinality: Option<String>,
}

impl AggregationSpec {
    /// Terms aggregation named after its field.
    pub fn terms(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            kind: AggregationKind::Terms {
                field,
                bucket_cap: None,
                include_only: Vec::new(),
            },
            cardinality: None,
        }
    }

    pub fn range_stats(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            kind: AggregationKind::RangeStats { field },
            cardinality: None,
        }
    }

    /// Nested terms aggregation, named by the full dotted field.
    pub fn nested_terms(path: impl Into<String>, field: impl Into<String>) -> Self {
        let path = path.into();
        let field = field.into();
        Self {
            name: format!("{path}.{field}"),
            kind: AggregationKind::NestedTerms { path, field },
            cardinality: None,
        }
    }

    /// Terms over `field`, nested when the field is dotted (`path.inner`).
    pub fn terms_or_nested(field: &str) -> Self {
        match field.split_once('.') {
            Some((path, inner)) => Self::nested_terms(path, inner),
            None => Self::terms(field),
        }
    }

    pub fn ranges(field: impl Into<String>, ranges: Vec<RangeBucket>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            kind: AggregationKind::Ranges { field, ranges },
            cardinality: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cardinality(mut self, dedup_field: impl Into<String>) -> Self {
        self.cardinality = Some(dedup_field.into());
        self
    }

    pub fn with_bucket_cap(mut self, cap: usize) -> Self {
        if let AggregationKind::Terms { bucket_cap, .. } = &mut self.kind {
            *bucket_cap = Some(cap);
        }
        self
    }

    pub fn with_include_only<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let AggregationKind::Terms { include_only, .. } = &mut self.kind {
            include_only.extend(values.into_iter().map(Into::into));
        }
        self
    }

    /// Stats aggregations have no buckets, so they never count distinct values.
    pub fn count_source(&self) -> CountSource {
        match (&self.kind, &self.cardinality) {
            (AggregationKind::RangeStats { .. }, _) | (_, None) => CountSource::DocCount,
            (_, Some(_)) => CountSource::Cardinality,
        }
    }

    /// JSON pointer of this aggregation's bucket array, relative to the
    /// response's `aggregations` object.
    pub fn buckets_pointer(&self) -> String {
        match (&self.kind, &self.cardinality) {
            (AggregationKind::NestedTerms { field, .. }, None) => format!(
                "/{}/{}/buckets",
                escape_pointer(&self.name),
                escape_pointer(field)
            ),
            _ => format!("/{}/buckets", escape_pointer(&self.name)),
        }
    }

    /// JSON pointer of the aggregation object itself.
    pub fn pointer(&self) -> String {
        format!("/{}", escape_pointer(&self.name))
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Builds aggregation subtrees and attaches them to query documents.
#[derive(Debug, Clone)]
pub struct AggregationPlanner {
    terms_bucket_cap: usize,
    precision_threshold: u32,
}

impl Default for AggregationPlanner {
    fn default() -> Self {
        Self {
            terms_bucket_cap: DEFAULT_TERMS_BUCKET_CAP,
            precision_threshold: DEFAULT_PRECISION_THRESHOLD,
        }
    }
}

impl AggregationPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terms_bucket_cap(mut self, cap: usize) -> Self {
        self.terms_bucket_cap = cap;
        self
    }

    pub fn with_precision_threshold(mut self, threshold: u32) -> Self {
        self.precision_threshold = threshold;
        self
    }

    /// Aggregation-only request: attaches `specs` and forces `size = 0`.
    pub fn plan(&self, base: QueryDocument, specs: &[AggregationSpec]) -> QueryDocument {
        let mut doc = base;
        self.attach(&mut doc, specs);
        doc.set_size(0);
        doc
    }

    /// Adds `specs` next to any aggregations already on `doc`, without
    /// touching the hit window.
    pub fn attach(&self, doc: &mut QueryDocument, specs: &[AggregationSpec]) {
        for spec in specs {
            doc.insert_agg(spec.name.clone(), self.aggregation(spec));
        }
    }

    /// Body of a single named aggregation.
    pub fn aggregation(&self, spec: &AggregationSpec) -> Value {
        let cardinality = spec.cardinality.as_deref();
        match &spec.kind {
            AggregationKind::Terms {
                field,
                bucket_cap,
                include_only,
            } => self.terms(
                field,
                bucket_cap.unwrap_or(self.terms_bucket_cap),
                include_only,
                cardinality,
            ),
            AggregationKind::NestedTerms { path, field } => {
                let full_field = format!("{path}.{field}");
                match cardinality {
                    // Distinct counts are taken over the parent document, so
                    // the nested scope is not entered.
                    Some(dedup) => {
                        self.terms(&full_field, self.terms_bucket_cap, &[], Some(dedup))
                    }
                    None => {
                        let mut inner = Map::new();
                        inner.insert(
                            field.clone(),
                            self.terms(&full_field, self.terms_bucket_cap, &[], None),
                        );
                        json!({ "nested": { "path": path }, "aggs": inner })
                    }
                }
            }
            AggregationKind::RangeStats { field } => json!({ "stats": { "field": field } }),
            AggregationKind::Ranges { field, ranges } => {
                let mut agg = Map::new();
                agg.insert(
                    "range".to_string(),
                    json!({ "field": field, "ranges": ranges }),
                );
                if let Some(dedup) = cardinality {
                    agg.insert("aggs".to_string(), self.cardinality(dedup));
                }
                Value::Object(agg)
            }
        }
    }

    fn terms(
        &self,
        field: &str,
        bucket_cap: usize,
        include_only: &[String],
        cardinality: Option<&str>,
    ) -> Value {
        let mut terms = Map::new();
        terms.insert("field".to_string(), json!(field));
        terms.insert("size".to_string(), json!(bucket_cap));
        if !include_only.is_empty() {
            terms.insert("include".to_string(), json!(include_only));
        }

        let mut agg = Map::new();
        agg.insert("terms".to_string(), Value::Object(terms));
        if let Some(dedup) = cardinality {
            agg.insert("aggs".to_string(), self.cardinality(dedup));
        }
        Value::Object(agg)
    }

    fn cardinality(&self, dedup_field: &str) -> Value {
        let mut aggs = Map::new();
        aggs.insert(
            CARDINALITY_AGG.to_string(),
            json!({
                "cardinality": {
                    "field": dedup_field,
                    "precision_threshold": self.precision_threshold
                }
            }),
        );
        Value::Object(aggs)
    }
}
