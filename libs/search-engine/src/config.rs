//! Engine configuration

use crate::global_search::{AboutCorpus, GlobalSearchCategory};
use cobalt_query::aggregation::{DEFAULT_PRECISION_THRESHOLD, DEFAULT_TERMS_BUCKET_CAP};
use cobalt_query::AggregationPlanner;
use serde::{Deserialize, Serialize};

/// Largest `from + size` window the backend serves without a scroll cursor.
pub const DEFAULT_RESULT_WINDOW: usize = 10_000;
pub const DEFAULT_SCROLL_KEEP_ALIVE: &str = "10s";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub result_window: usize,
    /// Scroll TTL per hop, renewed on each continuation.
    pub scroll_keep_alive: String,
    pub terms_bucket_cap: usize,
    pub cardinality_precision_threshold: u32,
    /// Global-search categories searched at the same time.
    pub max_concurrent_categories: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            result_window: DEFAULT_RESULT_WINDOW,
            scroll_keep_alive: DEFAULT_SCROLL_KEEP_ALIVE.to_string(),
            terms_bucket_cap: DEFAULT_TERMS_BUCKET_CAP,
            cardinality_precision_threshold: DEFAULT_PRECISION_THRESHOLD,
            max_concurrent_categories: 4,
        }
    }
}

impl EngineConfig {
    pub fn planner(&self) -> AggregationPlanner {
        AggregationPlanner::new()
            .with_terms_bucket_cap(self.terms_bucket_cap)
            .with_precision_threshold(self.cardinality_precision_threshold)
    }
}

/// Category descriptors and about corpus for global search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSearchConfig {
    #[serde(default)]
    pub categories: Vec<GlobalSearchCategory>,
    #[serde(default)]
    pub about: AboutCorpus,
}
