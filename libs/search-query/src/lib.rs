//! Search query construction
//!
//! Pure, synchronous builders for the search backend's JSON query DSL:
//! - [`QueryBuilder`] turns resolved filter parameters into a filter query
//! - [`AggregationPlanner`] attaches terms/range/stats/nested aggregations
//! - [`SortSpec`] maps caller sort keys onto backend sort fields
//! - [`text`] holds the free-text shapes used by global search
//!
//! # Examples
//!
//! ```rust
//! use cobalt_query::{AggregationPlanner, AggregationSpec, FieldValue, FilterParams, QueryBuilder};
//!
//! let params = FilterParams::new()
//!     .with("program", FieldValue::terms(["TCGA"]))
//!     .with("age_at_index", FieldValue::range(Some(10.0), Some(20.0)));
//!
//! let query = QueryBuilder::new()
//!     .with_range_fields(["age_at_index"])
//!     .build(&params)
//!     .unwrap();
//!
//! let request = AggregationPlanner::new()
//!     .plan(query, &[AggregationSpec::terms("grade").with_cardinality("case_id")]);
//! assert_eq!(request.size(), Some(0));
//! ```

pub mod aggregation;
pub mod document;
pub mod error;
pub mod filter;
pub mod params;
pub mod sort;
pub mod text;

pub use aggregation::{
    AggregationKind, AggregationPlanner, AggregationSpec, CountSource, RangeBucket,
    CARDINALITY_AGG,
};
pub use document::QueryDocument;
pub use error::{QueryError, Result};
pub use filter::{EmptyListPolicy, NestedScope, QueryBuilder};
pub use params::{FieldValue, FilterParams};
pub use sort::{SortDirection, SortSpec};
pub use text::HighlightRequest;
