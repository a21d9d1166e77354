//! Writing the census report to the per-region reports directory.

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{error, info};

use crate::census::CensusDataProvider;
use crate::report::write_report_file;

/// Default reports root, relative to the working directory.
pub const DEFAULT_REPORTS_ROOT: &str = "Region_Census";

/// Report file name for an export started at `timestamp`,
/// e.g. `Census-2024-01-01-18-30-00.csv`.
pub fn census_file_name(timestamp: &NaiveDateTime) -> String {
    format!("Census-{}.csv", timestamp.format("%Y-%m-%d-%H-%M-%S"))
}

/// Creates `<root>/<region_name>` (and `root` itself) if needed and returns it.
///
/// `region_name` must be a single plain path component.
pub fn region_export_dir(root: &Path, region_name: &str) -> Result<PathBuf> {
    let mut components = Path::new(region_name).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        bail!("invalid region name '{region_name}'");
    }

    let dir = root.join(region_name);
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating export directory '{}'", dir.display()))?;
    Ok(dir)
}

/// How an export request ended, for the host to show to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported { file_name: String, path: PathBuf },
    Failed { reason: String },
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Exported { .. })
    }

    /// Notification text. Mirrors the game's own save message by appending
    /// the file name.
    pub fn message(&self) -> String {
        match self {
            ExportOutcome::Exported { file_name, .. } => {
                format!("Region census exported ({file_name})")
            }
            ExportOutcome::Failed { .. } => "Region census export failed".to_string(),
        }
    }
}

fn try_export(
    provider: &dyn CensusDataProvider,
    reports_root: &Path,
    region_name: &str,
    timestamp: &NaiveDateTime,
) -> Result<(String, PathBuf)> {
    let file_name = census_file_name(timestamp);
    let path = region_export_dir(reports_root, region_name)?.join(&file_name);

    write_report_file(provider.city_records(), &path)?;

    Ok((file_name, path))
}

/// Exports the provider's city records as a CSV report.
///
/// Errors are logged and reported through [`ExportOutcome::Failed`]; they are
/// never returned to the caller.
#[tracing::instrument(skip(provider, reports_root, timestamp), fields(root = %reports_root.display()))]
pub fn export_region_census(
    provider: &dyn CensusDataProvider,
    reports_root: &Path,
    region_name: &str,
    timestamp: &NaiveDateTime,
) -> ExportOutcome {
    match try_export(provider, reports_root, region_name, timestamp) {
        Ok((file_name, path)) => {
            info!(path = %path.display(), cities = provider.city_records().len(), "Region census exported");
            ExportOutcome::Exported { file_name, path }
        }
        Err(e) => {
            let reason = format!("{e:#}");
            error!(error = %reason, "Region census export failed");
            ExportOutcome::Failed { reason }
        }
    }
}
