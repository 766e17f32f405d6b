//! Sort mapping
//!
//! Maps a caller-facing `order_by` key onto a backend sort field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive; anything other than `asc`/`desc` reads as ascending.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key table with a fallback field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub default_field: String,
    #[serde(default)]
    pub mapping: HashMap<String, String>,
}

impl SortSpec {
    pub fn new(default_field: impl Into<String>) -> Self {
        Self {
            default_field: default_field.into(),
            mapping: HashMap::new(),
        }
    }

    pub fn with_key(mut self, order_by: impl Into<String>, field: impl Into<String>) -> Self {
        self.mapping.insert(order_by.into(), field.into());
        self
    }

    pub fn with_keys<I, K, F>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = (K, F)>,
        K: Into<String>,
        F: Into<String>,
    {
        self.mapping
            .extend(keys.into_iter().map(|(k, f)| (k.into(), f.into())));
        self
    }

    /// Backend field for `order_by`, or the default field when unknown.
    pub fn field_for(&self, order_by: Option<&str>) -> &str {
        match order_by.and_then(|key| self.mapping.get(key)) {
            Some(field) => field,
            None => {
                tracing::info!(
                    order_by = order_by.unwrap_or_default(),
                    default = %self.default_field,
                    "Order not recognized, using default order"
                );
                &self.default_field
            }
        }
    }

    /// `{"<field>": "<direction>"}` for the request's `sort` member.
    pub fn resolve(&self, order_by: Option<&str>, direction: Option<&str>) -> Value {
        let direction = direction
            .map(SortDirection::parse_lenient)
            .unwrap_or_default();
        sort_clause(self.field_for(order_by), direction)
    }
}

pub fn sort_clause(field: &str, direction: SortDirection) -> Value {
    let mut clause = Map::new();
    clause.insert(field.to_string(), Value::String(direction.as_str().to_string()));
    Value::Object(clause)
}
