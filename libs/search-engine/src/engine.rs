//! Search engine facade
//!
//! Holds the shared transport handle and configuration and exposes the
//! request-scoped operations used by resolvers.

use crate::backend::send_json;
use crate::collect::{self, FieldPairs, GroupCount, OutputRow, RangeStats};
use crate::config::{EngineConfig, GlobalSearchConfig};
use crate::error::Result;
use crate::global_search::{GlobalSearchOrchestrator, MergedSearchResult};
use crate::pagination::{PageRequest, PaginationEngine};
use cobalt_query::{AggregationPlanner, AggregationSpec, FilterParams, QueryBuilder, QueryDocument, SortSpec};
use cobalt_transport::{SearchTransport, TransportRequest};
use serde_json::{json, Value};
use std::sync::Arc;

/// A sorted, filtered listing request.
#[derive(Debug, Clone, Copy)]
pub struct OverviewRequest<'a> {
    pub endpoint: &'a str,
    pub params: &'a FilterParams,
    pub fields: &'a FieldPairs,
    pub sort: &'a SortSpec,
    pub order_by: Option<&'a str>,
    pub sort_direction: Option<&'a str>,
    pub page: PageRequest,
}

#[derive(Clone)]
pub struct SearchEngine {
    transport: Arc<dyn SearchTransport>,
    config: EngineConfig,
    planner: AggregationPlanner,
    pagination: PaginationEngine,
}

impl SearchEngine {
    pub fn new(transport: Arc<dyn SearchTransport>, config: EngineConfig) -> Self {
        let planner = config.planner();
        let pagination = PaginationEngine::new(
            Arc::clone(&transport),
            config.result_window,
            config.scroll_keep_alive.clone(),
        );
        Self {
            transport,
            config,
            planner,
            pagination,
        }
    }

    /// Raw search round trip.
    pub async fn search(&self, endpoint: &str, body: QueryDocument) -> Result<Value> {
        send_json(
            self.transport.as_ref(),
            TransportRequest::get(endpoint).with_body(body),
        )
        .await
    }

    /// One page of rows for an already built query.
    pub async fn search_page(
        &self,
        endpoint: &str,
        query: QueryDocument,
        fields: &FieldPairs,
        highlights: &FieldPairs,
        page: PageRequest,
    ) -> Result<Vec<OutputRow>> {
        self.pagination
            .collect_page(endpoint, query, fields, highlights, page)
            .await
    }

    /// Filtered, sorted listing.
    pub async fn overview(
        &self,
        builder: &QueryBuilder,
        request: OverviewRequest<'_>,
    ) -> Result<Vec<OutputRow>> {
        let mut query = builder.build(request.params)?;
        query.set_sort(request.sort.resolve(request.order_by, request.sort_direction));
        self.search_page(request.endpoint, query, request.fields, &[], request.page)
            .await
    }

    /// Bucket counts of `spec` over the documents matching `query`.
    pub async fn group_counts(
        &self,
        endpoint: &str,
        query: QueryDocument,
        spec: &AggregationSpec,
    ) -> Result<Vec<GroupCount>> {
        let body = self.planner.plan(query, std::slice::from_ref(spec));
        let response = self.search(endpoint, body).await?;
        Ok(collect::group_counts(&response, spec))
    }

    /// Facet counts that ignore the facet's own filter, so every option of
    /// the facet stays visible.
    pub async fn filter_group_counts(
        &self,
        endpoint: &str,
        builder: &QueryBuilder,
        params: &FilterParams,
        facet_param: &str,
        spec: &AggregationSpec,
    ) -> Result<Vec<GroupCount>> {
        let query = builder.clone().exclude(facet_param).build(params)?;
        self.group_counts(endpoint, query, spec).await
    }

    /// min/max/count of a numeric field.
    pub async fn range_stats(
        &self,
        endpoint: &str,
        query: QueryDocument,
        field: &str,
    ) -> Result<RangeStats> {
        let spec = AggregationSpec::range_stats(field);
        let body = self.planner.plan(query, std::slice::from_ref(&spec));
        let response = self.search(endpoint, body).await?;
        Ok(collect::range_stats(&response, &spec))
    }

    /// Matching document count from a `_count` endpoint.
    pub async fn count(&self, count_endpoint: &str, query: QueryDocument) -> Result<u64> {
        let query = query
            .query()
            .cloned()
            .unwrap_or_else(|| json!({ "match_all": {} }));
        let response = send_json(
            self.transport.as_ref(),
            TransportRequest::get(count_endpoint).with_body(json!({ "query": query })),
        )
        .await?;
        collect::document_count(&response)
    }

    /// `hits.total` of a search without hits.
    pub async fn total_hits(&self, endpoint: &str, query: QueryDocument) -> Result<u64> {
        let mut body = query;
        body.set_size(0);
        let response = self.search(endpoint, body).await?;
        collect::total_hits(&response)
    }

    /// Every `_source.<field>` value across the full result set.
    pub async fn collect_field(
        &self,
        endpoint: &str,
        query: QueryDocument,
        field: &str,
    ) -> Result<Vec<String>> {
        self.pagination.collect_field(endpoint, query, field).await
    }

    /// Distinct values of `field` among the matching documents.
    pub async fn collect_terms(
        &self,
        endpoint: &str,
        query: QueryDocument,
        field: &str,
    ) -> Result<Vec<String>> {
        let spec = AggregationSpec::terms(field);
        let body = self.planner.plan(query, std::slice::from_ref(&spec));
        let response = self.search(endpoint, body).await?;
        Ok(collect::bucket_keys(&response, &spec))
    }

    pub async fn global_search(
        &self,
        config: &GlobalSearchConfig,
        input: &str,
        page: PageRequest,
    ) -> Result<MergedSearchResult> {
        GlobalSearchOrchestrator::new(
            Arc::clone(&self.transport),
            config.clone(),
            self.pagination.clone(),
            self.planner.clone(),
            self.config.max_concurrent_categories,
        )
        .search(input, page)
        .await
    }
}
