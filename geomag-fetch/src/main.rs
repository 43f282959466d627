//! geomag-fetch - IAGA2002 retrieval command line
//!
//! Plans the candidate locations for one station-day, fetches the first
//! one available, and prints the requested components (stored or derived)
//! as a table, CSV or JSON. Logs go to stderr; data goes to stdout.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use geomag_common::config::{resolve_source_root, TomlConfig};
use geomag_common::{DataTypeSelection, DerivedFieldEngine, RetrievalQuery, SamplingPeriod};
use geomag_fetch::output::{self, OutputFormat};
use geomag_fetch::{AnyFetcher, Orchestrator};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Log level used until (and unless) the configuration names one
const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for geomag-fetch
#[derive(Parser, Debug)]
#[command(name = "geomag-fetch")]
#[command(about = "Fetch and decode IAGA2002 geomagnetic observatory data")]
#[command(version)]
struct Args {
    /// IAGA station code (e.g. OTT)
    #[arg(short, long, env = "GEOMAG_STATION")]
    station: Option<String>,

    /// Day to fetch (YYYY-MM-DD), defaults to today (UTC)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Sampling period: minute, second, 60 or 1
    #[arg(long)]
    sampling: Option<String>,

    /// Data type: all, definitive, quasi-definitive, provisional or variation
    #[arg(long = "data-type")]
    data_type: Option<String>,

    /// Root of the data tree (http(s):// URL, file:// URI or directory)
    #[arg(long = "source-root")]
    source_root: Option<String>,

    /// Components to print, comma separated
    #[arg(short, long, default_value = "x,y,z,f")]
    components: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// TOML configuration file
    #[arg(long, env = "GEOMAG_CONFIG")]
    config: Option<PathBuf>,

    /// Print the candidate locations in fetch order and exit
    #[arg(long)]
    plan_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing first so configuration loading is logged
    let (filter, filter_handle) = reload::Layer::new(log_filter(None));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => TomlConfig::load(path),
        None => TomlConfig::load_default(),
    }
    .context("Failed to load configuration")?;

    // RUST_LOG still wins over the configured level
    filter_handle
        .reload(log_filter(Some(&config.logging.level)))
        .context("Failed to apply configured log level")?;

    let query = build_query(&args, &config)?;
    let requested = output::parse_components(&args.components)
        .context("Invalid --components list")?;

    if args.plan_only {
        for candidate in geomag_common::plan(&query)? {
            println!("{}", candidate);
        }
        return Ok(());
    }

    let fetcher = AnyFetcher::for_source_root(&query.source_root, &config.http)
        .context("Failed to create fetcher")?;
    let orchestrator = Orchestrator::new(fetcher);

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel_token.clone()));

    let retrieved = orchestrator
        .retrieve(&query, &cancel_token)
        .await
        .with_context(|| format!("Failed to retrieve {} for {}", query.station, query.date))?;

    for attempt in &retrieved.failed {
        info!("Skipped candidate {}", attempt);
    }

    let engine = DerivedFieldEngine::new(&retrieved.record);
    let series = output::collect_series(&engine, &requested);
    if series.is_empty() {
        warn!(
            available = ?engine.available(),
            "None of the requested components can be derived from this file"
        );
    }

    let rendered = match args.format {
        OutputFormat::Table => output::table(&retrieved.record, &series),
        OutputFormat::Csv => output::csv(&retrieved.record, &series),
        OutputFormat::Json => output::json(&retrieved.record, &series)
            .context("Failed to serialize JSON output")?,
    };
    print!("{}", rendered);

    Ok(())
}

/// `RUST_LOG` if set, otherwise the configured level, otherwise "info"
fn log_filter(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_directive(configured).into())
}

fn filter_directive(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string()
}

/// Merge CLI arguments over the TOML configuration
fn build_query(args: &Args, config: &TomlConfig) -> Result<RetrievalQuery> {
    let station = args
        .station
        .clone()
        .or_else(|| config.station.clone())
        .ok_or_else(|| anyhow!("No station given (use --station or set `station` in the config)"))?;

    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let source_root = resolve_source_root(args.source_root.as_deref(), config);

    let mut query = RetrievalQuery::new(source_root, station, date);

    if let Some(sampling) = args.sampling.as_deref().or(config.sampling.as_deref()) {
        query.sampling = sampling.parse::<SamplingPeriod>()?;
    }
    if let Some(data_type) = args.data_type.as_deref().or(config.data_type.as_deref()) {
        query.data_type = data_type.parse::<DataTypeSelection>()?;
    }

    query.validate()?;
    Ok(query)
}

/// Cancel the in-flight retrieval on Ctrl+C
async fn cancel_on_ctrl_c(cancel_token: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, cancelling retrieval");
        cancel_token.cancel();
    }
}
