//! Filter query builder.
//!
//! Builds a filter-context query document from resolved filter parameters:
//! - term parameters become `terms` clauses
//! - range parameters become `range` clauses with `gte`/`lte`
//! - fields of a many-to-many related entity are collected into a single
//!   `nested` clause
//!
//! All clauses are combined with boolean AND in filter context (no scoring).

use crate::document::QueryDocument;
use crate::error::{QueryError, Result};
use crate::params::{FieldValue, FilterParams};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

/// What an empty term list contributes to the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyListPolicy {
    /// The field contributes no clause.
    #[default]
    Ignore,
    /// The field contributes an empty `terms` clause, which matches zero rows.
    MatchNone,
}

/// Fields stored as an embedded object array under `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedScope {
    pub path: String,
    pub fields: HashSet<String>,
}

impl NestedScope {
    pub fn new<I, S>(path: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    fn qualify(&self, field: &str) -> String {
        format!("{}.{}", self.path, field)
    }
}

/// Query builder for filter queries.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    range_fields: HashSet<String>,
    excluded_fields: HashSet<String>,
    nested: Option<NestedScope>,
    aliases: HashMap<String, String>,
    empty_list_policy: EmptyListPolicy,
    ignore_case: bool,
}

impl QueryBuilder {
    /// Facet filter semantics: empty lists and the `[""]` sentinel add nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// List lookup semantics: an empty list matches nothing, `[""]` matches all.
    pub fn list_query() -> Self {
        Self {
            empty_list_policy: EmptyListPolicy::MatchNone,
            ..Self::default()
        }
    }

    pub fn with_range_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.range_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_excluded_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.excluded_fields.insert(field.into());
        self
    }

    pub fn with_nested(mut self, scope: Option<NestedScope>) -> Self {
        self.nested = scope;
        self
    }

    /// Rename an incoming parameter key before it reaches the backend.
    pub fn with_alias(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.aliases.insert(param.into(), field.into());
        self
    }

    /// Lowercase every term value before filtering.
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn range_fields(&self) -> &HashSet<String> {
        &self.range_fields
    }

    /// Resolve a raw argument map with this builder's range set, then build.
    pub fn build_from_json(&self, args: &Map<String, Value>) -> Result<QueryDocument> {
        let params = FilterParams::from_json(args, &self.range_fields)?;
        self.build(&params)
    }

    /// Build the filter query document.
    ///
    /// Returns `{"query": {"match_all": {}}}` when no clause is produced.
    pub fn build(&self, params: &FilterParams) -> Result<QueryDocument> {
        let mut filter = Vec::new();
        let mut nested_filter = Vec::new();

        for (key, value) in params.iter() {
            if self.excluded_fields.contains(key) {
                continue;
            }
            let field = self.aliases.get(key).map(String::as_str).unwrap_or(key);

            match value {
                FieldValue::Range(lower, upper) => {
                    filter.push(range_clause(field, *lower, *upper)?);
                }
                FieldValue::Terms(_) if self.range_fields.contains(key) => {
                    return Err(QueryError::InvalidParameter {
                        field: key.to_string(),
                        reason: "expected a [lower, upper] bounds list".to_string(),
                    });
                }
                FieldValue::Terms(values) => {
                    if value.is_match_all_sentinel() {
                        continue;
                    }
                    if values.is_empty() && self.empty_list_policy == EmptyListPolicy::Ignore {
                        continue;
                    }
                    let values: Vec<String> = if self.ignore_case {
                        values.iter().map(|v| v.to_lowercase()).collect()
                    } else {
                        values.clone()
                    };
                    match &self.nested {
                        Some(scope) if scope.fields.contains(field) => {
                            nested_filter.push(terms_clause(&scope.qualify(field), values));
                        }
                        _ => filter.push(terms_clause(field, values)),
                    }
                }
            }
        }

        if let Some(scope) = &self.nested {
            if !nested_filter.is_empty() {
                filter.push(json!({
                    "nested": {
                        "path": scope.path,
                        "query": { "bool": { "filter": nested_filter } },
                        "inner_hits": {}
                    }
                }));
            }
        }

        if filter.is_empty() {
            return Ok(QueryDocument::match_all());
        }
        Ok(QueryDocument::with_query(
            json!({ "bool": { "filter": filter } }),
        ))
    }
}

fn terms_clause(field: &str, values: Vec<String>) -> Value {
    json!({ "terms": { field: values } })
}

fn range_clause(field: &str, lower: Option<f64>, upper: Option<f64>) -> Result<Value> {
    if lower.is_none() && upper.is_none() {
        return Err(QueryError::InvalidRange {
            field: field.to_string(),
        });
    }
    let mut bounds = Map::new();
    if let Some(lower) = lower {
        bounds.insert("gte".to_string(), json!(lower));
    }
    if let Some(upper) = upper {
        bounds.insert("lte".to_string(), json!(upper));
    }
    Ok(json!({ "range": { field: bounds } }))
}
