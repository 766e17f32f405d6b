//! Cobalt CLI
//!
//! Runs engine operations against the configured search backend and prints
//! the result as pretty JSON on stdout.

mod config;
mod logging;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cobalt_engine::{OverviewRequest, PageRequest, SearchEngine};
use cobalt_query::{AggregationSpec, FilterParams, QueryBuilder, SortSpec};
use cobalt_transport::HttpTransport;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "cobalt", version, about = "Query the search backend", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $COBALT_CONFIG or ./cobalt.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every configured category and the about corpus
    GlobalSearch {
        /// Free-text input; may be empty
        input: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Filtered, sorted listing of one index
    Overview(OverviewArgs),
    /// Bucket counts of one field
    Facet(FacetArgs),
    /// Number of documents matching a filter
    Count(CountArgs),
}

#[derive(Args)]
struct PageArgs {
    /// Page size
    #[arg(long, default_value_t = 10)]
    first: usize,
    /// Zero-based offset of the first row
    #[arg(long, default_value_t = 0)]
    offset: usize,
}

impl From<&PageArgs> for PageRequest {
    fn from(args: &PageArgs) -> Self {
        PageRequest::new(args.first, args.offset)
    }
}

#[derive(Args)]
struct FilterArgs {
    /// Search endpoint, e.g. /projects/_search
    #[arg(long)]
    endpoint: String,
    /// Filter parameters as a JSON object
    #[arg(long, default_value = "{}")]
    params: String,
    /// Numeric fields filtered by [lower, upper] bounds
    #[arg(long = "range-field")]
    range_fields: Vec<String>,
}

impl FilterArgs {
    fn params(&self) -> anyhow::Result<Map<String, Value>> {
        serde_json::from_str(&self.params).context("--params must be a JSON object")
    }
}

#[derive(Args)]
struct OverviewArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Output column as OUTPUT=BACKEND_FIELD
    #[arg(long = "field", value_parser = parse_field_pair, required = true)]
    fields: Vec<(String, String)>,
    #[command(flatten)]
    page: PageArgs,
    #[arg(long)]
    order_by: Option<String>,
    #[arg(long)]
    sort_direction: Option<String>,
    /// Sort field used when --order-by is absent or unknown
    #[arg(long)]
    default_sort: Option<String>,
    /// Sort key as KEY=BACKEND_FIELD
    #[arg(long = "sort-key", value_parser = parse_field_pair)]
    sort_keys: Vec<(String, String)>,
}

#[derive(Args)]
struct FacetArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Field to aggregate
    #[arg(long)]
    field: String,
    /// Count distinct values of this field instead of documents
    #[arg(long)]
    dedup_field: Option<String>,
    /// Treat `path.field` as a nested field
    #[arg(long)]
    nested: bool,
    /// Drop the facet's own filter so all of its options are counted
    #[arg(long)]
    exclude_self: bool,
    /// Report min/max/count instead of buckets
    #[arg(long, conflicts_with_all = ["dedup_field", "nested"])]
    stats: bool,
}

#[derive(Args)]
struct CountArgs {
    #[command(flatten)]
    filter: FilterArgs,
}

fn parse_field_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((output, backend)) if !output.is_empty() && !backend.is_empty() => {
            Ok((output.to_string(), backend.to_string()))
        }
        _ => Err(format!("expected OUTPUT=FIELD, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _logging_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend.url,
        result_window = config.engine.result_window,
        "Configuration loaded"
    );

    let transport = HttpTransport::new(&config.backend).context("Failed to create backend client")?;
    let engine = SearchEngine::new(Arc::new(transport), config.engine.clone());

    match &cli.command {
        Commands::GlobalSearch { input, page } => {
            let result = engine
                .global_search(&config.global_search, input, page.into())
                .await
                .context("Global search failed")?;
            print_json(&result)
        }
        Commands::Overview(args) => run_overview(&engine, args).await,
        Commands::Facet(args) => run_facet(&engine, args).await,
        Commands::Count(args) => {
            let builder = QueryBuilder::new().with_range_fields(args.filter.range_fields.iter().cloned());
            let query = builder.build_from_json(&args.filter.params()?)?;
            let count = engine
                .count(&args.filter.endpoint, query)
                .await
                .context("Count failed")?;
            print_json(&count)
        }
    }
}

async fn run_overview(engine: &SearchEngine, args: &OverviewArgs) -> anyhow::Result<()> {
    let builder =
        QueryBuilder::list_query().with_range_fields(args.filter.range_fields.iter().cloned());
    let params = FilterParams::from_json(&args.filter.params()?, builder.range_fields())?;

    let default_sort = args
        .default_sort
        .clone()
        .or_else(|| args.fields.first().map(|(_, backend)| backend.clone()))
        .context("an overview needs --default-sort or at least one --field")?;
    let sort = SortSpec::new(default_sort).with_keys(args.sort_keys.iter().cloned());

    let rows = engine
        .overview(
            &builder,
            OverviewRequest {
                endpoint: &args.filter.endpoint,
                params: &params,
                fields: &args.fields,
                sort: &sort,
                order_by: args.order_by.as_deref(),
                sort_direction: args.sort_direction.as_deref(),
                page: (&args.page).into(),
            },
        )
        .await
        .context("Overview failed")?;
    print_json(&rows)
}

async fn run_facet(engine: &SearchEngine, args: &FacetArgs) -> anyhow::Result<()> {
    let builder = QueryBuilder::new().with_range_fields(args.filter.range_fields.iter().cloned());
    let raw = args.filter.params()?;

    if args.stats {
        let query = builder.build_from_json(&raw)?;
        let stats = engine
            .range_stats(&args.filter.endpoint, query, &args.field)
            .await
            .context("Range stats failed")?;
        return print_json(&stats);
    }

    let mut spec = if args.nested {
        AggregationSpec::terms_or_nested(&args.field)
    } else {
        AggregationSpec::terms(args.field.as_str())
    };
    if let Some(dedup) = &args.dedup_field {
        spec = spec.with_cardinality(dedup.as_str());
    }

    let counts = if args.exclude_self {
        let params = FilterParams::from_json(&raw, builder.range_fields())?;
        engine
            .filter_group_counts(&args.filter.endpoint, &builder, &params, &args.field, &spec)
            .await
    } else {
        let query = builder.build_from_json(&raw)?;
        engine.group_counts(&args.filter.endpoint, query, &spec).await
    }
    .context("Facet counts failed")?;
    print_json(&counts)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
