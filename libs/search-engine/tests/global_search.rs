mod support;

use cobalt_engine::{AboutCorpus, Error, GlobalSearchConfig, PageRequest, RowValue};
use serde_json::{json, Value};
use support::*;

fn text(row: &cobalt_engine::OutputRow, key: &str) -> Option<String> {
    row.get(key).and_then(RowValue::as_str).map(str::to_string)
}

fn about_response() -> Value {
    json!({"hits": {"hits": [
        {
            "_source": {"page": "/about", "title": "About"},
            "highlight": {"content.paragraph": ["first $cancer$", "second $cancer$"]}
        },
        {
            "_source": {"page": "/resources", "title": "Resources"},
            "highlight": {"content.paragraph": ["third $cancer$"]}
        }
    ]}})
}

#[tokio::test]
async fn counts_come_from_distinct_values_not_hits() {
    let (backend, engine) = FakeBackend::new(10_000)
        .with_response("/catA/_search", category_response("catA", 5, 4))
        .with_response("/catB/_search", category_response("catB", 3, 3))
        .into_engine(engine_config(10_000));
    let config = GlobalSearchConfig {
        categories: vec![
            cardinality_category("catA", "catA_id"),
            cardinality_category("catB", "catB_id"),
        ],
        about: AboutCorpus::default(),
    };

    let result = engine
        .global_search(&config, "cancer", PageRequest::new(10, 0))
        .await
        .unwrap();

    assert_eq!(result.per_category_counts["catA"], 4);
    assert_eq!(result.per_category_counts["catB"], 3);
    assert_eq!(result.per_category_results["catA"].len(), 5);
    assert_eq!(result.per_category_results["catB"].len(), 3);
    assert!(result
        .per_category_results["catA"]
        .iter()
        .all(|row| text(row, "type").as_deref() == Some("catA")));
    assert!(result.about_page_hits.is_empty());
    assert_eq!(result.about_page_count, 0);

    let request = &backend.requests_to("/catA/_search")[0];
    let body = request.body.as_ref().unwrap();
    assert_eq!(
        body["query"],
        json!({"bool": {"should": [
            {"match_phrase_prefix": {"catA_title.search": "cancer"}},
            {"match_phrase_prefix": {"catA_abstract.search": "cancer"}}
        ]}})
    );
    assert_eq!(body["aggs"]["field_count"], json!({"cardinality": {"field": "catA_id"}}));
    assert_eq!(body["sort"], json!({"catA_id": "asc"}));
}

#[tokio::test]
async fn categories_are_paginated_by_the_shared_window() {
    let (backend, engine) = FakeBackend::new(10_000)
        .with_response("/catA/_search", category_response("catA", 5, 4))
        .with_response("/catB/_search", category_response("catB", 3, 3))
        .into_engine(engine_config(10_000));
    let config = GlobalSearchConfig {
        categories: vec![
            cardinality_category("catA", "catA_id"),
            cardinality_category("catB", "catB_id"),
        ],
        about: AboutCorpus::default(),
    };

    let result = engine
        .global_search(&config, "cancer", PageRequest::new(2, 4))
        .await
        .unwrap();

    for path in ["/catA/_search", "/catB/_search"] {
        let body = backend.requests_to(path)[0].body.clone().unwrap();
        assert_eq!(body["from"], 4);
        assert_eq!(body["size"], 2);
    }
    assert_eq!(result.per_category_results["catA"].len(), 2);
}

#[tokio::test]
async fn combined_categories_share_one_list_and_sum_counts() {
    let node_hits = json!({"hits": {"hits": [
        {"_source": {"node": "case"}, "highlight": {"node": ["case"]}},
        {"_source": {"node": "sample"}, "highlight": {"node": ["sample"]}}
    ]}});
    let property_hits = json!({"hits": {"hits": [
        {"_source": {"property": "case_id"}, "highlight": {"property": ["case", "_id"]}},
        {"_source": {"property": "sample_type"}},
        {"_source": {"property": "case_stage"}}
    ]}});
    let (backend, engine) = FakeBackend::new(10_000)
        .with_response("/node/_search", node_hits)
        .with_response("/node/_count", json!({"count": 2}))
        .with_response("/property/_search", property_hits)
        .with_response("/property/_count", json!({"count": 3}))
        .into_engine(engine_config(10_000));
    let config = GlobalSearchConfig {
        categories: vec![
            combined_category("node", "model"),
            combined_category("property", "model"),
        ],
        about: AboutCorpus::default(),
    };

    let result = engine
        .global_search(&config, "case", PageRequest::new(2, 1))
        .await
        .unwrap();

    assert_eq!(result.per_category_counts["model_count"], 5);
    let model = &result.per_category_results["model"];
    assert_eq!(model.len(), 2);
    assert_eq!(text(&model[0], "name").as_deref(), Some("sample"));
    assert_eq!(text(&model[0], "type").as_deref(), Some("node"));
    assert_eq!(text(&model[1], "name").as_deref(), Some("case_id"));
    assert_eq!(text(&model[1], "highlight").as_deref(), Some("case"));

    let search = backend.requests_to("/node/_search")[0].body.clone().unwrap();
    assert_eq!(search["from"], 0);
    assert_eq!(search["size"], 10_000);
    assert_eq!(search["highlight"]["fragment_size"], 1);

    let count = backend.requests_to("/node/_count")[0].body.clone().unwrap();
    assert_eq!(count.as_object().unwrap().len(), 1);
    assert!(count["query"]["bool"]["should"].is_array());
}

#[tokio::test]
async fn secondary_facet_keys_are_collected() {
    let mut response = category_response("catA", 2, 1);
    response["aggregations"]["agg_field"] = json!({"buckets": [
        {"key": "Cancer Moonshot", "doc_count": 2},
        {"key": "Cancer Genomics", "doc_count": 1}
    ]});
    let (backend, engine) = FakeBackend::new(10_000)
        .with_response("/catA/_search", response)
        .into_engine(engine_config(10_000));
    let config = GlobalSearchConfig {
        categories: vec![with_secondary_facet(
            cardinality_category("catA", "catA_id"),
            "catA_title",
            "catA_titles",
        )],
        about: AboutCorpus::default(),
    };

    let result = engine
        .global_search(&config, "cancer", PageRequest::new(10, 0))
        .await
        .unwrap();

    assert_eq!(
        result.secondary_facets["catA_titles"],
        vec!["Cancer Moonshot".to_string(), "Cancer Genomics".to_string()]
    );
    let body = backend.requests_to("/catA/_search")[0].body.clone().unwrap();
    assert_eq!(body["aggs"]["agg_field"], json!({"terms": {"field": "catA_title", "size": 100_000}}));
}

#[tokio::test]
async fn about_fragments_are_listed_and_paginated() {
    let (backend, engine) = FakeBackend::new(10_000)
        .with_response("/about_page/_search", about_response())
        .into_engine(engine_config(10_000));
    let config = GlobalSearchConfig {
        categories: Vec::new(),
        about: AboutCorpus::default().with_enabled(true),
    };

    let result = engine
        .global_search(&config, "cancer", PageRequest::new(2, 1))
        .await
        .unwrap();

    assert_eq!(result.about_page_count, 3);
    assert_eq!(result.about_page_hits.len(), 2);
    assert_eq!(text(&result.about_page_hits[0], "text").as_deref(), Some("second $cancer$"));
    assert_eq!(text(&result.about_page_hits[1], "page").as_deref(), Some("/resources"));
    assert_eq!(text(&result.about_page_hits[1], "type").as_deref(), Some("about"));

    let body = backend.requests_to("/about_page/_search")[0].body.clone().unwrap();
    assert_eq!(body["query"], json!({"match": {"content.paragraph": "cancer"}}));
    assert_eq!(body["highlight"]["pre_tags"], json!(["$"]));
    assert_eq!(body["size"], 10_000);

    let past_end = engine
        .global_search(&config, "cancer", PageRequest::new(2, 5))
        .await
        .unwrap();
    assert!(past_end.about_page_hits.is_empty());
    assert_eq!(past_end.about_page_count, 3);
}

#[tokio::test]
async fn empty_input_is_a_legal_query() {
    let (_backend, engine) = FakeBackend::new(10_000)
        .with_response("/catA/_search", category_response("catA", 1, 1))
        .into_engine(engine_config(10_000));
    let config = GlobalSearchConfig {
        categories: vec![cardinality_category("catA", "catA_id")],
        about: AboutCorpus::default(),
    };

    let result = engine
        .global_search(&config, "", PageRequest::new(10, 0))
        .await
        .unwrap();
    assert_eq!(result.per_category_counts["catA"], 1);
}

#[tokio::test]
async fn a_failing_category_fails_the_search() {
    let (_backend, engine) = FakeBackend::new(10_000)
        .with_response("/catA/_search", category_response("catA", 5, 4))
        .with_status("/catB/_search", 500)
        .into_engine(engine_config(10_000));
    let config = GlobalSearchConfig {
        categories: vec![
            cardinality_category("catA", "catA_id"),
            cardinality_category("catB", "catB_id"),
        ],
        about: AboutCorpus::default(),
    };

    let err = engine
        .global_search(&config, "cancer", PageRequest::new(10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Backend { status: 500, ref path, .. } if path == "/catB/_search"));
}

#[tokio::test]
async fn about_pages_beyond_the_window_are_empty() {
    let (backend, engine) = FakeBackend::new(100)
        .with_response("/about_page/_search", about_response())
        .into_engine(engine_config(100));
    let config = GlobalSearchConfig {
        categories: Vec::new(),
        about: AboutCorpus::default().with_enabled(true),
    };

    let result = engine
        .global_search(&config, "cancer", PageRequest::new(10, 200))
        .await
        .unwrap();

    assert!(result.about_page_hits.is_empty());
    assert_eq!(result.about_page_count, 3);
    assert_eq!(backend.requests_to("/about_page/_search").len(), 1);
}

#[tokio::test]
async fn combined_pages_beyond_the_window_are_empty() {
    let (backend, engine) = FakeBackend::new(100)
        .with_response("/node/_search", json!({"hits": {"hits": [{"_source": {"node": "case"}}]}}))
        .with_response("/node/_count", json!({"count": 1}))
        .with_response("/property/_search", json!({"hits": {"hits": []}}))
        .with_response("/property/_count", json!({"count": 4}))
        .into_engine(engine_config(100));
    let config = GlobalSearchConfig {
        categories: vec![
            combined_category("node", "model"),
            combined_category("property", "model"),
        ],
        about: AboutCorpus::default(),
    };

    let result = engine
        .global_search(&config, "case", PageRequest::new(10, 200))
        .await
        .unwrap();

    assert!(result.per_category_results["model"].is_empty());
    assert_eq!(result.per_category_counts["model_count"], 5);
    let search = backend.requests_to("/node/_search")[0].body.clone().unwrap();
    assert_eq!(search["size"], 100);
}

#[tokio::test]
async fn categories_beyond_the_window_scroll() {
    let docs: Vec<Value> = (0..250).map(|i| json!({"catA_id": format!("A{i:03}")})).collect();
    let (backend, engine) = FakeBackend::new(100)
        .with_index("/catA/_search", docs)
        .into_engine(engine_config(100));
    let config = GlobalSearchConfig {
        categories: vec![cardinality_category("catA", "catA_id")],
        about: AboutCorpus::default(),
    };

    let result = engine
        .global_search(&config, "cancer", PageRequest::new(50, 200))
        .await
        .unwrap();

    let rows = &result.per_category_results["catA"];
    assert_eq!(rows.len(), 50);
    assert_eq!(text(&rows[0], "id").as_deref(), Some("A200"));
    assert_eq!(text(&rows[49], "id").as_deref(), Some("A249"));
    assert!(rows.iter().all(|row| text(row, "type").as_deref() == Some("catA")));

    let searches = backend.requests_to("/catA/_search");
    let summary = searches[0].body.clone().unwrap();
    assert_eq!(summary["size"], 0);
    assert!(summary["aggs"]["field_count"].is_object());
    let scrolled = searches[1].body.clone().unwrap();
    assert_eq!(scrolled["size"], 100);
    assert!(scrolled.get("from").is_none());
    assert!(scrolled.get("aggs").is_none());

    assert_eq!(backend.opened_scrolls().len(), 1);
    assert_eq!(backend.cleared_scrolls(), backend.opened_scrolls());
    assert_eq!(backend.open_scrolls(), 0);
}

#[tokio::test]
async fn unreachable_pages_are_rejected_before_any_request() {
    let (backend, engine) = FakeBackend::new(100).into_engine(engine_config(100));
    let categories = GlobalSearchConfig {
        categories: vec![cardinality_category("catA", "catA_id")],
        about: AboutCorpus::default().with_enabled(true),
    };
    let combined_only = GlobalSearchConfig {
        categories: vec![combined_category("node", "model")],
        about: AboutCorpus::default().with_enabled(true),
    };

    let misaligned = engine
        .global_search(&categories, "cancer", PageRequest::new(50, 130))
        .await
        .unwrap_err();
    assert!(misaligned.is_request_error());

    let oversized = engine
        .global_search(&combined_only, "cancer", PageRequest::new(200, 0))
        .await
        .unwrap_err();
    assert!(matches!(oversized, Error::InvalidPagination { .. }));
    assert!(backend.requests().is_empty());
}
