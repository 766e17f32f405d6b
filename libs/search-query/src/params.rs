//! Filter parameter parsing
//!
//! The resolver layer hands over a loosely typed argument map. It is resolved
//! into typed per-field values exactly once, here, so query construction never
//! has to inspect raw JSON shapes:
//! - fields listed in the caller's range-field set become [`FieldValue::Range`]
//! - every other field becomes [`FieldValue::Terms`]

use crate::error::{QueryError, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// A single filter parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Discrete values matched with `terms` semantics.
    Terms(Vec<String>),
    /// Inclusive numeric bounds (lower, upper).
    Range(Option<f64>, Option<f64>),
}

impl FieldValue {
    pub fn terms<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Terms(values.into_iter().map(Into::into).collect())
    }

    pub fn range(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self::Range(lower, upper)
    }

    /// `[""]` is the "no filter" sentinel: the field contributes nothing.
    pub fn is_match_all_sentinel(&self) -> bool {
        matches!(self, Self::Terms(values) if values.len() == 1 && values[0].is_empty())
    }
}

/// Field name -> value map handed to the query builder.
///
/// Keys iterate in sorted order so that generated query documents are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParams {
    fields: BTreeMap<String, FieldValue>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve a raw argument map.
    ///
    /// - `null` values are dropped (no filter)
    /// - a bare scalar in a term field is read as a one-element list
    /// - a range field with fewer than two elements contributes nothing;
    ///   elements after the first two are ignored
    pub fn from_json(args: &Map<String, Value>, range_fields: &HashSet<String>) -> Result<Self> {
        let mut params = Self::new();
        for (key, raw) in args {
            if raw.is_null() {
                continue;
            }
            let value = if range_fields.contains(key) {
                match parse_bounds(key, raw)? {
                    Some(value) => value,
                    None => {
                        tracing::debug!(field = %key, "Range parameter has fewer than two bounds, ignoring");
                        continue;
                    }
                }
            } else {
                FieldValue::Terms(parse_terms(key, raw)?)
            };
            params.fields.insert(key.clone(), value);
        }
        Ok(params)
    }
}

impl FromIterator<(String, FieldValue)> for FilterParams {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn parse_terms(field: &str, raw: &Value) -> Result<Vec<String>> {
    match raw {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                scalar_to_string(item).ok_or_else(|| QueryError::InvalidParameter {
                    field: field.to_string(),
                    reason: format!("expected a list of scalar values, found {item}"),
                })
            })
            .collect(),
        other => scalar_to_string(other)
            .map(|value| vec![value])
            .ok_or_else(|| QueryError::InvalidParameter {
                field: field.to_string(),
                reason: "expected a value list".to_string(),
            }),
    }
}

fn parse_bounds(field: &str, raw: &Value) -> Result<Option<FieldValue>> {
    let Value::Array(items) = raw else {
        return Err(QueryError::InvalidParameter {
            field: field.to_string(),
            reason: "expected a [lower, upper] bounds list".to_string(),
        });
    };
    if items.len() < 2 {
        return Ok(None);
    }
    let lower = parse_bound(field, &items[0])?;
    let upper = parse_bound(field, &items[1])?;
    Ok(Some(FieldValue::Range(lower, upper)))
}

fn parse_bound(field: &str, raw: &Value) -> Result<Option<f64>> {
    match raw {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            QueryError::InvalidParameter {
                field: field.to_string(),
                reason: format!("bound '{s}' is not a number"),
            }
        }),
        other => Err(QueryError::InvalidParameter {
            field: field.to_string(),
            reason: format!("bound {other} is not a number"),
        }),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn ranges(fields: &[&str]) -> HashSet<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn terms_and_ranges_are_resolved_by_the_range_set() {
        let params = FilterParams::from_json(
            &args(json!({
                "program": ["TCGA", "TARGET"],
                "age_at_index": [10, null],
                "representative": true,
            })),
            &ranges(&["age_at_index"]),
        )
        .unwrap();

        assert_eq!(
            params.get("program"),
            Some(&FieldValue::terms(["TCGA", "TARGET"]))
        );
        assert_eq!(
            params.get("age_at_index"),
            Some(&FieldValue::Range(Some(10.0), None))
        );
        assert_eq!(
            params.get("representative"),
            Some(&FieldValue::terms(["true"]))
        );
    }

    #[test]
    fn null_arguments_are_dropped() {
        let params =
            FilterParams::from_json(&args(json!({"program": null})), &HashSet::new()).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn short_bounds_list_contributes_nothing() {
        let params = FilterParams::from_json(
            &args(json!({"age_at_index": [5]})),
            &ranges(&["age_at_index"]),
        )
        .unwrap();
        assert!(!params.contains("age_at_index"));
    }

    #[test]
    fn both_null_bounds_survive_parsing() {
        // Rejected later by the query builder, not here.
        let params = FilterParams::from_json(
            &args(json!({"age_at_index": [null, null]})),
            &ranges(&["age_at_index"]),
        )
        .unwrap();
        assert_eq!(
            params.get("age_at_index"),
            Some(&FieldValue::Range(None, None))
        );
    }

    #[test]
    fn object_values_are_rejected() {
        let err = FilterParams::from_json(
            &args(json!({"program": [{"nested": 1}]})),
            &HashSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter { field, .. } if field == "program"));
    }

    #[test]
    fn non_numeric_bound_is_rejected() {
        let err = FilterParams::from_json(
            &args(json!({"age_at_index": ["ten", 20]})),
            &ranges(&["age_at_index"]),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter { .. }));
    }

    #[test]
    fn sentinel_detection() {
        assert!(FieldValue::terms([""]).is_match_all_sentinel());
        assert!(!FieldValue::terms(["", "x"]).is_match_all_sentinel());
        assert!(!FieldValue::Terms(Vec::new()).is_match_all_sentinel());
    }
}
