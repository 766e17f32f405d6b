use cobalt_engine::{CategoryCount, EngineConfig, GlobalSearchCategory, SecondaryFacet};
use serde_json::{json, Value};

/// `count` documents with sequential `file_id`s.
pub fn file_corpus(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "file_id": format!("F{i:05}"),
                "file_size": i * 10,
                "subject_ids": [format!("S{}", i % 7)],
            })
        })
        .collect()
}

pub fn file_fields() -> Vec<(String, String)> {
    vec![
        ("file_id".to_string(), "file_id".to_string()),
        ("subject_id".to_string(), "subject_ids".to_string()),
    ]
}

pub fn engine_config(result_window: usize) -> EngineConfig {
    EngineConfig {
        result_window,
        ..EngineConfig::default()
    }
}

/// Category counted by distinct values of `dedup_field`.
pub fn cardinality_category(tag: &str, dedup_field: &str) -> GlobalSearchCategory {
    GlobalSearchCategory {
        search_index: format!("/{tag}/_search"),
        count: CategoryCount::Cardinality {
            field: dedup_field.to_string(),
        },
        count_key: None,
        searchable_fields: vec![format!("{tag}_title.search"), format!("{tag}_abstract.search")],
        sort_field: format!("{tag}_id"),
        output_mapping: vec![
            ("id".to_string(), format!("{tag}_id")),
            ("title".to_string(), format!("{tag}_title")),
        ],
        highlight_mapping: Vec::new(),
        highlight_pre_tag: String::new(),
        highlight_post_tag: String::new(),
        highlight_fragment_size: None,
        secondary_facet: None,
        category_tag: tag.to_string(),
        result_field: None,
        combine: false,
    }
}

/// Category counted through a `_count` endpoint, sharing `result_field`.
pub fn combined_category(tag: &str, result_field: &str) -> GlobalSearchCategory {
    GlobalSearchCategory {
        search_index: format!("/{tag}/_search"),
        count: CategoryCount::CountEndpoint {
            path: format!("/{tag}/_count"),
        },
        count_key: Some(format!("{result_field}_count")),
        searchable_fields: vec![tag.to_string()],
        sort_field: format!("{tag}_kw"),
        output_mapping: vec![("name".to_string(), tag.to_string())],
        highlight_mapping: vec![("highlight".to_string(), tag.to_string())],
        highlight_pre_tag: String::new(),
        highlight_post_tag: String::new(),
        highlight_fragment_size: Some(1),
        secondary_facet: None,
        category_tag: tag.to_string(),
        result_field: Some(result_field.to_string()),
        combine: true,
    }
}

pub fn with_secondary_facet(
    mut category: GlobalSearchCategory,
    field: &str,
    result_field: &str,
) -> GlobalSearchCategory {
    category.secondary_facet = Some(SecondaryFacet {
        field: field.to_string(),
        result_field: result_field.to_string(),
    });
    category
}

/// Search response with `hits` documents of `tag` and a distinct count.
pub fn category_response(tag: &str, hits: usize, distinct: u64) -> Value {
    let hits: Vec<Value> = (0..hits)
        .map(|i| {
            json!({"_source": {
                format!("{tag}_id"): format!("{tag}-{}", i / 2),
                format!("{tag}_title"): format!("cancer study {i}"),
            }})
        })
        .collect();
    json!({
        "hits": {"total": {"value": hits.len()}, "hits": hits},
        "aggregations": {"field_count": {"value": distinct}}
    })
}
