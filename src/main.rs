//! CLI entry point for the region census tool.
//!
//! Loads a region snapshot exported from the game, prints the region totals
//! shown in the census overlay, and writes CSV census reports.

use anyhow::{Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use region_census::{
    census::{CensusDataProvider, RegionCensus},
    export::{DEFAULT_REPORTS_ROOT, export_region_census},
    host::{Region, RegionSnapshot},
    panel::panel_rows,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "region_census")]
#[command(about = "Region-wide census totals and CSV reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the region totals shown in the census overlay
    Totals {
        /// Region snapshot JSON file
        #[arg(value_name = "REGION_JSON")]
        region: PathBuf,

        /// Print the totals as JSON instead of overlay rows
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write a CSV census report for every developed city in the region
    Export {
        /// Region snapshot JSON file
        #[arg(value_name = "REGION_JSON")]
        region: PathBuf,

        /// Reports root; each region gets its own subdirectory
        #[arg(short = 'o', long, env = "REGION_CENSUS_REPORTS_ROOT", default_value = DEFAULT_REPORTS_ROOT)]
        reports_root: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/region_census.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("region_census.log"));

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
        Commands::Totals { region, json } => {
            let (_, census) = load_census(&region);
            let totals = census.totals();

            if json {
                println!("{}", serde_json::to_string_pretty(totals)?);
            } else {
                for row in panel_rows(totals) {
                    info!(label = row.label, value = %row.text(), "Region total");
                }
            }
        }
        Commands::Export {
            region,
            reports_root,
        } => {
            let (region_name, census) = load_census(&region);
            let timestamp = Local::now().naive_local();

            let outcome = export_region_census(&census, &reports_root, &region_name, &timestamp);
            if !outcome.is_success() {
                bail!(outcome.message());
            }
            info!("{}", outcome.message());
        }
    }

    Ok(())
}

/// Loads the snapshot at `path` and runs the census over it.
///
/// An unreadable snapshot is treated like a missing region: the error is
/// logged and the census stays empty. The region name falls back to the
/// snapshot's file stem.
fn load_census(path: &Path) -> (String, RegionCensus) {
    let mut census = RegionCensus::new();
    let fallback_name = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("region")
        .to_string();

    match RegionSnapshot::load(path) {
        Ok(snapshot) => {
            census.post_region_init(Some(&snapshot));
            let name = if snapshot.name().is_empty() {
                fallback_name
            } else {
                snapshot.name().to_string()
            };
            (name, census)
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(error = %message, "Region snapshot unavailable");
            census.post_region_init(None);
            (fallback_name, census)
        }
    }
}
