//! Federated global search
//!
//! One free-text input is fanned out over data-driven category descriptors:
//! - each category runs a phrase-prefix search over its searchable fields,
//!   with a distinct count (or a `_count` request) and an optional secondary
//!   facet
//! - categories run concurrently, bounded by `max_concurrent_categories`,
//!   and are merged in descriptor order
//! - categories flagged `combine` fetch the whole window and share one list
//!   that is paginated after the merge
//! - non-combined categories page like any listing: directly inside the
//!   result window, through a scroll cursor beyond it
//! - the about corpus is searched separately, when enabled, and paginated
//!   as a plain list

use crate::backend::send_json;
use crate::collect::{self, OutputRow, RowValue};
use crate::config::GlobalSearchConfig;
use crate::error::{Error, Result};
use crate::pagination::{PageRequest, PageStrategy, PaginationEngine};
use cobalt_query::text::{self, FIELD_COUNT_AGG, SECONDARY_FACET_AGG};
use cobalt_query::{AggregationPlanner, AggregationSpec, HighlightRequest, QueryDocument};
use cobalt_transport::{SearchTransport, TransportRequest};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Row member carrying the category tag.
pub const TYPE_FIELD: &str = "type";
pub const ABOUT_TAG: &str = "about";

/// How a category reports its result count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryCount {
    /// Distinct values of `field` among the matching documents.
    Cardinality { field: String },
    /// `count` of a `_count` request against `path`.
    CountEndpoint { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryFacet {
    pub field: String,
    pub result_field: String,
}

/// One searchable category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSearchCategory {
    /// Search endpoint, e.g. `/projects/_search`.
    pub search_index: String,
    pub count: CategoryCount,
    /// Counts key; categories sharing a key are summed. Defaults to the tag.
    #[serde(default)]
    pub count_key: Option<String>,
    pub searchable_fields: Vec<String>,
    pub sort_field: String,
    pub output_mapping: Vec<(String, String)>,
    #[serde(default)]
    pub highlight_mapping: Vec<(String, String)>,
    #[serde(default)]
    pub highlight_pre_tag: String,
    #[serde(default)]
    pub highlight_post_tag: String,
    #[serde(default)]
    pub highlight_fragment_size: Option<u32>,
    #[serde(default)]
    pub secondary_facet: Option<SecondaryFacet>,
    pub category_tag: String,
    /// Results key; categories sharing a key are concatenated. Defaults to
    /// the tag.
    #[serde(default)]
    pub result_field: Option<String>,
    #[serde(default)]
    pub combine: bool,
}

impl GlobalSearchCategory {
    pub fn count_key(&self) -> &str {
        self.count_key.as_deref().unwrap_or(&self.category_tag)
    }

    pub fn result_field(&self) -> &str {
        self.result_field.as_deref().unwrap_or(&self.category_tag)
    }

    fn highlight(&self) -> Option<HighlightRequest> {
        if self.highlight_mapping.is_empty() {
            return None;
        }
        let mut fields: Vec<&str> = Vec::new();
        for (_, backend) in &self.highlight_mapping {
            if !fields.contains(&backend.as_str()) {
                fields.push(backend);
            }
        }
        let mut request = HighlightRequest::new(fields)
            .with_tags(&self.highlight_pre_tag, &self.highlight_post_tag);
        if let Some(size) = self.highlight_fragment_size {
            request = request.with_fragment_size(size);
        }
        Some(request)
    }
}

/// Static "about" content searched next to the categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutCorpus {
    /// The corpus is searched only when set.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_about_index")]
    pub search_index: String,
    #[serde(default = "default_about_content_field")]
    pub content_field: String,
    #[serde(default = "default_about_page_field")]
    pub page_field: String,
    #[serde(default = "default_about_title_field")]
    pub title_field: String,
    #[serde(default = "default_about_highlight_tag")]
    pub highlight_tag: String,
}

fn default_about_index() -> String {
    "/about_page/_search".to_string()
}

fn default_about_content_field() -> String {
    "content.paragraph".to_string()
}

fn default_about_page_field() -> String {
    "page".to_string()
}

fn default_about_title_field() -> String {
    "title".to_string()
}

fn default_about_highlight_tag() -> String {
    "$".to_string()
}

impl AboutCorpus {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for AboutCorpus {
    fn default() -> Self {
        Self {
            enabled: false,
            search_index: default_about_index(),
            content_field: default_about_content_field(),
            page_field: default_about_page_field(),
            title_field: default_about_title_field(),
            highlight_tag: default_about_highlight_tag(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedSearchResult {
    pub per_category_results: BTreeMap<String, Vec<OutputRow>>,
    pub per_category_counts: BTreeMap<String, u64>,
    pub secondary_facets: BTreeMap<String, Vec<String>>,
    pub about_page_hits: Vec<OutputRow>,
    pub about_page_count: usize,
}

/// Slice `[offset, offset + page_size)` of `items`; empty past the end.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, offset: usize) -> Vec<T> {
    items.iter().skip(offset).take(page_size).cloned().collect()
}

struct CategoryOutcome {
    rows: Vec<OutputRow>,
    count: u64,
    facet: Option<Vec<String>>,
}

pub struct GlobalSearchOrchestrator {
    transport: Arc<dyn SearchTransport>,
    config: GlobalSearchConfig,
    pagination: PaginationEngine,
    planner: AggregationPlanner,
    max_concurrent: usize,
}

impl GlobalSearchOrchestrator {
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        config: GlobalSearchConfig,
        pagination: PaginationEngine,
        planner: AggregationPlanner,
        max_concurrent: usize,
    ) -> Self {
        Self {
            transport,
            config,
            pagination,
            planner,
            max_concurrent: max_concurrent.max(1),
        }
    }

    fn result_window(&self) -> usize {
        self.pagination.result_window()
    }

    /// Merged results of every category and the about corpus.
    ///
    /// Pages past the end of a list come back empty. Non-combined categories
    /// reach pages beyond the result window through a scroll cursor, so such
    /// a page must start at a multiple of its size.
    pub async fn search(&self, input: &str, page: PageRequest) -> Result<MergedSearchResult> {
        let window = self.result_window();
        let strategy = if self.config.categories.iter().any(|c| !c.combine) {
            Some(page.plan(window)?)
        } else if page.page_size > window {
            return Err(Error::invalid_pagination(
                page.page_size,
                page.offset,
                format!("parameter 'first' must not exceed {window}"),
            ));
        } else {
            None
        };

        let categories = stream::iter(self.config.categories.iter())
            .map(|category| self.search_category(category, input, page, strategy))
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>();
        let (outcomes, about) = futures::join!(categories, self.search_about(input));

        let mut merged = MergedSearchResult::default();
        let mut combined = BTreeSet::new();
        for (category, outcome) in self.config.categories.iter().zip(outcomes) {
            let outcome = outcome?;
            *merged
                .per_category_counts
                .entry(category.count_key().to_string())
                .or_insert(0) += outcome.count;
            merged
                .per_category_results
                .entry(category.result_field().to_string())
                .or_default()
                .extend(outcome.rows);
            if let (Some(facet), Some(keys)) = (&category.secondary_facet, outcome.facet) {
                merged
                    .secondary_facets
                    .entry(facet.result_field.clone())
                    .or_default()
                    .extend(keys);
            }
            if category.combine {
                combined.insert(category.result_field().to_string());
            }
        }

        for field in combined {
            if let Some(rows) = merged.per_category_results.get_mut(&field) {
                *rows = paginate(rows, page.page_size, page.offset);
            }
        }

        let about = about?;
        merged.about_page_count = about.len();
        merged.about_page_hits = paginate(&about, page.page_size, page.offset);

        tracing::debug!(
            categories = self.config.categories.len(),
            about = merged.about_page_count,
            "Global search merged"
        );
        Ok(merged)
    }

    /// `strategy` is the plan for non-combined categories; combined ones
    /// always fetch the first window.
    async fn search_category(
        &self,
        category: &GlobalSearchCategory,
        input: &str,
        page: PageRequest,
        strategy: Option<PageStrategy>,
    ) -> Result<CategoryOutcome> {
        let count_field = match &category.count {
            CategoryCount::Cardinality { field } => Some(field.as_str()),
            CategoryCount::CountEndpoint { .. } => None,
        };
        let mut body = text::global_search_query(
            &category.searchable_fields,
            input,
            count_field,
            &category.sort_field,
        );
        let facet_spec = category
            .secondary_facet
            .as_ref()
            .map(|facet| AggregationSpec::terms(facet.field.as_str()).named(SECONDARY_FACET_AGG));
        if let Some(spec) = &facet_spec {
            self.planner.attach(&mut body, std::slice::from_ref(spec));
        }

        let count = match &category.count {
            CategoryCount::CountEndpoint { path } => self.count(path, &body).await?,
            CategoryCount::Cardinality { .. } => 0,
        };

        if let Some(highlight) = category.highlight() {
            body.set_highlight(highlight.to_json());
        }

        let (summary, mut rows) = match strategy.filter(|_| !category.combine) {
            Some(PageStrategy::Scroll { .. }) => {
                let mut summary_body = body.clone();
                summary_body.remove("highlight");
                summary_body.remove("sort");
                summary_body.set_size(0);
                let request = TransportRequest::get(&category.search_index).with_body(summary_body);
                let summary = send_json(self.transport.as_ref(), request).await?;

                body.remove("aggs");
                let batch = self.pagination.fetch_page(&category.search_index, body, page).await?;
                let rows = collect::collect_page(
                    &batch.response,
                    &category.output_mapping,
                    &category.highlight_mapping,
                    page.page_size,
                    batch.skip,
                )?;
                (summary, rows)
            }
            direct => {
                let (from, size) = match direct {
                    Some(PageStrategy::Direct { from, size }) => (from, size),
                    _ => (0, self.result_window()),
                };
                body.set_window(from, size);
                let request = TransportRequest::get(&category.search_index).with_body(body);
                let response = send_json(self.transport.as_ref(), request).await?;
                let rows = collect::collect_page(
                    &response,
                    &category.output_mapping,
                    &category.highlight_mapping,
                    size,
                    0,
                )?;
                (response, rows)
            }
        };
        for row in &mut rows {
            row.insert(TYPE_FIELD.to_string(), RowValue::text(&category.category_tag));
        }

        let count = match &category.count {
            CategoryCount::Cardinality { .. } => collect::metric_value(&summary, FIELD_COUNT_AGG),
            CategoryCount::CountEndpoint { .. } => count,
        };
        let facet = facet_spec.map(|spec| collect::bucket_keys(&summary, &spec));

        tracing::debug!(
            category = %category.category_tag,
            rows = rows.len(),
            count,
            scrolled = matches!(strategy, Some(PageStrategy::Scroll { .. })) && !category.combine,
            "Global search category collected"
        );
        Ok(CategoryOutcome { rows, count, facet })
    }

    async fn count(&self, path: &str, body: &QueryDocument) -> Result<u64> {
        let query = body.query().cloned().unwrap_or_else(|| json!({ "match_all": {} }));
        let request = TransportRequest::get(path).with_body(json!({ "query": query }));
        let response = send_json(self.transport.as_ref(), request).await?;
        collect::document_count(&response)
    }

    /// One row per highlighted paragraph fragment of the about corpus.
    async fn search_about(&self, input: &str) -> Result<Vec<OutputRow>> {
        let about = &self.config.about;
        if !about.enabled {
            return Ok(Vec::new());
        }
        let mut body = text::match_query(&about.content_field, input);
        body.set_highlight(
            HighlightRequest::new([about.content_field.as_str()])
                .with_tags(&about.highlight_tag, &about.highlight_tag)
                .to_json(),
        );
        body.set_size(self.result_window());

        let request = TransportRequest::get(&about.search_index).with_body(body);
        let response = send_json(self.transport.as_ref(), request).await?;

        let mut rows = Vec::new();
        for hit in collect::hits(&response)? {
            let source = hit.get("_source");
            let page = source_text(source, &about.page_field);
            let title = source_text(source, &about.title_field);
            for fragment in collect::highlights(hit, &about.content_field) {
                rows.push(OutputRow::from([
                    (TYPE_FIELD.to_string(), RowValue::text(ABOUT_TAG)),
                    ("page".to_string(), page.clone()),
                    ("title".to_string(), title.clone()),
                    ("text".to_string(), RowValue::text(fragment)),
                ]));
            }
        }
        Ok(rows)
    }
}

fn source_text(source: Option<&Value>, field: &str) -> RowValue {
    source
        .and_then(|s| s.get(field))
        .map(RowValue::from_json)
        .unwrap_or(RowValue::Null)
}
