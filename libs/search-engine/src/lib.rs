//! Search engine
//!
//! Request-scoped operations over the search backend:
//! - [`PaginationEngine`] pages with `from`/`size` inside the result window
//!   and rolls a [`ScrollCursor`] beyond it
//! - [`collect`] flattens hits and aggregation buckets into rows
//! - [`GlobalSearchOrchestrator`] fans one input out over category
//!   descriptors and merges the results
//! - [`SearchEngine`] ties them to one shared transport handle
//!
//! # Examples
//!
//! ```rust,no_run
//! use cobalt_engine::{EngineConfig, PageRequest, SearchEngine};
//! use cobalt_query::{FieldValue, FilterParams, QueryBuilder};
//! use cobalt_transport::{HttpTransport, HttpTransportConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(&HttpTransportConfig::default())?;
//! let engine = SearchEngine::new(Arc::new(transport), EngineConfig::default());
//!
//! let params = FilterParams::new().with("program", FieldValue::terms(["TCGA"]));
//! let query = QueryBuilder::new().build(&params)?;
//! let fields = vec![("id".to_string(), "project_id".to_string())];
//! let rows = engine
//!     .search_page("/projects/_search", query, &fields, &[], PageRequest::new(100, 0))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod backend;
pub mod collect;
pub mod config;
pub mod engine;
pub mod error;
pub mod global_search;
pub mod pagination;

pub use collect::{GroupCount, OutputRow, RangeStats, RowValue};
pub use config::{EngineConfig, GlobalSearchConfig};
pub use engine::{OverviewRequest, SearchEngine};
pub use error::{Error, Result};
pub use global_search::{
    AboutCorpus, CategoryCount, GlobalSearchCategory, GlobalSearchOrchestrator,
    MergedSearchResult, SecondaryFacet,
};
pub use pagination::{PageRequest, PageStrategy, PaginationEngine, ScrollCursor};
