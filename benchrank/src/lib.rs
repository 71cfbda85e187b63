use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use benchrank_core::config::{ConfigError, ConvergenceConfig, ConvergenceSettings, ToleranceLevels};
use benchrank_core::types::Metric;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

pub mod dataset;
pub mod helpers;
pub mod report;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[clap(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding benchmark results, one subdirectory per scenario.
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Name of the per-scenario subdirectory holding `<system>.json` files.
    #[arg(long, default_value = "metrics")]
    pub metrics_subdir: String,

    /// System to exclude from the analysis. May be repeated.
    #[arg(long = "exclude-system")]
    pub excluded_systems: Vec<String>,

    /// Path to a TOML file with tolerance levels, convergence settings, and
    /// query groups. Defaults apply when omitted.
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    #[arg(short, long, default_value = "pretty")]
    pub format: OutputFormat,
}

/// On-disk analysis configuration, before validation.
///
/// Every section is optional; omitted sections fall back to the built-in
/// defaults when loaded.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UninitializedAnalysisConfig {
    #[serde(default)]
    tolerance_levels: Option<BTreeMap<Metric, Vec<f64>>>,
    #[serde(default)]
    convergence: BTreeMap<Metric, ConvergenceSettings>,
    #[serde(default)]
    query_groups: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl UninitializedAnalysisConfig {
    pub fn load(self) -> Result<AnalysisConfig, ConfigError> {
        let tolerance_levels = match self.tolerance_levels {
            Some(levels) => ToleranceLevels::new(levels)?,
            None => ToleranceLevels::default(),
        };
        let convergence = ConvergenceConfig::with_overrides(self.convergence)?;
        Ok(AnalysisConfig {
            tolerance_levels,
            convergence,
            query_groups: self.query_groups,
        })
    }
}

/// Validated analysis configuration.
#[derive(Debug, Default)]
pub struct AnalysisConfig {
    pub tolerance_levels: ToleranceLevels,
    pub convergence: ConvergenceConfig,
    /// Named query groups: `group -> scenario -> query ids`.
    pub query_groups: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl AnalysisConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let uninitialized: UninitializedAnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        uninitialized
            .load()
            .with_context(|| format!("Invalid analysis config in {}", path.display()))
    }
}

/// Load the benchmark results, run the analysis pipeline over every grouping,
/// and write the report in the requested format.
#[instrument(skip_all, fields(analysis_run_id = %analysis_run_id, data_dir = ?args.data_dir, format = ?args.format))]
pub fn run_analysis(args: Args, analysis_run_id: Uuid, mut writer: impl Write) -> Result<()> {
    let config = match &args.config_file {
        Some(path) => {
            info!(config_file = ?path, "Loading analysis configuration");
            AnalysisConfig::load_from_path(path)?
        }
        None => AnalysisConfig::default(),
    };

    info!(data_dir = ?args.data_dir, "Loading benchmark results");
    let snapshot = dataset::load_snapshot(
        &args.data_dir,
        &args.metrics_subdir,
        &args.excluded_systems,
    )?;
    if snapshot.is_empty() {
        bail!(
            "No benchmark results found under {}",
            args.data_dir.display()
        );
    }

    let report = report::build_report(&snapshot, &config, analysis_run_id);
    report::write_report(&mut writer, &report, &args.format)?;
    info!("Analysis complete");
    Ok(())
}
