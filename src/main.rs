//! CLI entry point for the trail usage mapper.
//!
//! Provides subcommands for profiling a visits export, writing a per-trailhead
//! usage table, and building a map layer framed by an optional boundary.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use trail_usage_mapper::{
    fetch::BasicClient,
    loader::{load_records, profile},
    output::{CsvRenderer, GeoJsonRenderer, MapRenderer, log_top_trails, print_json, write_summaries},
    pipeline::{build_usage_map, prepare_trails},
    region::{BoundarySource, RegionConfig},
};

#[derive(Parser)]
#[command(name = "trail_usage_mapper")]
#[command(about = "Aggregate trailhead visits and lay them out on a map", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the shape and coordinate quality of a visits CSV
    Inspect {
        /// Visits CSV with name, latitude, longitude and visits columns
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Write total visits and usage share per trailhead to a CSV file
    Summarize {
        /// Visits CSV with name, latitude, longitude and visits columns
        #[arg(short, long)]
        input: PathBuf,

        /// CSV file to write the summary to
        #[arg(short, long, default_value = "trail_usage_summary.csv")]
        output: PathBuf,

        /// Region config JSON (bounds, default centre, boundary)
        #[arg(short, long)]
        region: Option<PathBuf>,

        /// Number of busiest trails to log
        #[arg(short = 'n', long, default_value_t = 5)]
        top: usize,
    },
    /// Build a trail usage map layer
    Map {
        /// Visits CSV with name, latitude, longitude and visits columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to trail_usage_map.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Geojson)]
        format: Format,

        /// Region config JSON (bounds, default centre, boundary)
        #[arg(short, long)]
        region: Option<PathBuf>,

        /// Boundary GeoJSON path or URL, overrides the region config
        #[arg(short, long)]
        boundary: Option<String>,

        /// Boundary feature filter, e.g. --match NAME=Boulder --match STATEFP=08
        #[arg(short, long = "match", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        matches: Vec<(String, String)>,

        /// Map title, overrides the region config
        #[arg(short, long)]
        title: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Geojson,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/trail_usage_mapper.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("trail_usage_mapper.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { input } => {
            let profile = profile(&input)?;

            info!(
                rows = profile.rows,
                columns = profile.columns.len(),
                usable_at_most = profile.usable_upper_bound(),
                "Dataset profile"
            );
            print_json(&profile)?;
        }
        Commands::Summarize {
            input,
            output,
            region,
            top,
        } => {
            let config = load_region(region.as_deref())?;
            let records = load_records(&input)?;
            let trails = prepare_trails(records, &config);

            write_summaries(&output, &trails)?;
            log_top_trails(&trails, top);
            info!(trails = trails.len(), output = %output.display(), "Summary written");
        }
        Commands::Map {
            input,
            output,
            format,
            region,
            boundary,
            matches,
            title,
        } => {
            let mut config = load_region(region.as_deref())?;
            apply_overrides(&mut config, boundary, matches, title)?;

            let renderer: Box<dyn MapRenderer> = match format {
                Format::Geojson => Box::new(GeoJsonRenderer),
                Format::Csv => Box::new(CsvRenderer),
            };
            let output = output.unwrap_or_else(|| {
                PathBuf::from(format!("trail_usage_map.{}", renderer.extension()))
            });

            let records = load_records(&input)?;
            let client = BasicClient::new()?;
            let map = build_usage_map(&client, records, &config).await;

            renderer.render(&map, &output)?;
            log_top_trails(&map.trails, 5);
            info!(
                trails = map.trails.len(),
                boundary_status = ?map.boundary_status,
                output = %output.display(),
                "Map saved"
            );
        }
    }

    Ok(())
}

fn load_region(path: Option<&Path>) -> Result<RegionConfig> {
    match path {
        Some(path) => RegionConfig::load(path),
        None => Ok(RegionConfig::default()),
    }
}

/// Applies command-line boundary and title settings on top of the region config.
fn apply_overrides(
    config: &mut RegionConfig,
    boundary: Option<String>,
    matches: Vec<(String, String)>,
    title: Option<String>,
) -> Result<()> {
    if let Some(source) = boundary {
        let properties = config
            .boundary
            .take()
            .map(|b| b.properties)
            .unwrap_or_default();
        config.boundary = Some(BoundarySource { source, properties });
    }

    if !matches.is_empty() {
        let Some(boundary) = config.boundary.as_mut() else {
            bail!("--match needs a boundary dataset (--boundary or a region config)");
        };
        boundary.properties.extend(matches);
    }

    if let Some(title) = title {
        config.title = title;
    }

    if config.boundary.is_none() {
        warn!("No boundary dataset given, map extent follows the trails");
    }

    Ok(())
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    Ok((key.to_string(), value.to_string()))
}
