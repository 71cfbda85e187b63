//! Benchmark result loading.
//!
//! Results are laid out on disk as `<root>/<scenario>/<subdir>/<system>.json`,
//! where each system file maps query ids to raw records. A scenario may carry
//! numbered repeat directories (`<subdir>_1`, `<subdir>_2`, ...) instead of a
//! single `<subdir>`; in that case each system's records are averaged across
//! repeats before normalization.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use benchrank_core::extract::normalize_record;
use benchrank_core::types::{BenchmarkSnapshot, QueryStatus, RawQueryRecord};
use tracing::{debug, info, warn};

/// Raw records for one scenario directory: `system_id -> query_id -> record`.
type RawScenario = BTreeMap<String, BTreeMap<String, RawQueryRecord>>;

/// Load every scenario under `data_dir` into a normalized snapshot.
///
/// Scenario directories without a metrics directory (single or repeat) are
/// skipped with a warning; unreadable or unparsable result files are errors,
/// since they point at a misconfigured data root rather than a benchmark
/// outcome.
pub fn load_snapshot(
    data_dir: &Path,
    metrics_subdir: &str,
    excluded_systems: &[String],
) -> Result<BenchmarkSnapshot> {
    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory {}", data_dir.display()))?;

    let mut snapshot = BenchmarkSnapshot::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read data directory {}", data_dir.display()))?;
        let path = entry.path();
        let scenario_id = entry.file_name().to_string_lossy().to_string();
        if !path.is_dir() || scenario_id.starts_with('.') {
            continue;
        }

        let Some(raw) = load_scenario(&path, metrics_subdir, excluded_systems)? else {
            warn!(scenario_id = %scenario_id, "No metrics directory found, skipping scenario");
            continue;
        };
        for (system_id, records) in raw {
            debug!(
                scenario_id = %scenario_id,
                system_id = %system_id,
                num_queries = records.len(),
                "Loaded system results"
            );
            for (query_id, record) in records {
                snapshot.insert(&scenario_id, &system_id, &query_id, normalize_record(&record));
            }
        }
    }

    info!(
        num_scenarios = snapshot.scenarios.len(),
        num_systems = snapshot.systems().len(),
        "Benchmark results loaded"
    );
    Ok(snapshot)
}

/// Load one scenario directory, preferring a plain metrics directory and
/// falling back to averaging numbered repeat directories. `None` when the
/// scenario has neither.
fn load_scenario(
    scenario_dir: &Path,
    metrics_subdir: &str,
    excluded_systems: &[String],
) -> Result<Option<RawScenario>> {
    let metrics_dir = scenario_dir.join(metrics_subdir);
    if metrics_dir.is_dir() {
        return Ok(Some(load_metrics_dir(&metrics_dir, excluded_systems)?));
    }

    let repeat_dirs = find_repeat_dirs(scenario_dir, metrics_subdir)?;
    if repeat_dirs.is_empty() {
        return Ok(None);
    }
    debug!(
        scenario_dir = %scenario_dir.display(),
        num_repeats = repeat_dirs.len(),
        "Averaging repeat directories"
    );

    // system -> query -> one record per repeat the pair appears in
    let mut repeats: BTreeMap<String, BTreeMap<String, Vec<RawQueryRecord>>> = BTreeMap::new();
    for dir in &repeat_dirs {
        for (system_id, records) in load_metrics_dir(dir, excluded_systems)? {
            let per_system = repeats.entry(system_id).or_default();
            for (query_id, record) in records {
                per_system.entry(query_id).or_default().push(record);
            }
        }
    }

    let merged = repeats
        .into_iter()
        .map(|(system_id, queries)| {
            let records = queries
                .into_iter()
                .map(|(query_id, runs)| (query_id, merge_repeats(&runs)))
                .collect();
            (system_id, records)
        })
        .collect();
    Ok(Some(merged))
}

/// Numbered repeat directories `<subdir>_<n>` under `scenario_dir`, ordered
/// by repeat number.
fn find_repeat_dirs(scenario_dir: &Path, metrics_subdir: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(scenario_dir)
        .with_context(|| format!("Failed to read scenario directory {}", scenario_dir.display()))?;
    let prefix = format!("{metrics_subdir}_");

    let mut dirs: Vec<(u32, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| {
            format!("Failed to read scenario directory {}", scenario_dir.display())
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(number) = name.strip_prefix(&prefix).and_then(|n| n.parse::<u32>().ok()) {
            dirs.push((number, path));
        }
    }
    dirs.sort_unstable_by_key(|(number, _)| *number);
    Ok(dirs.into_iter().map(|(_, path)| path).collect())
}

/// Parse every `<system>.json` in a metrics directory. Non-JSON entries are
/// ignored; excluded systems are dropped here so they never enter a snapshot.
fn load_metrics_dir(metrics_dir: &Path, excluded_systems: &[String]) -> Result<RawScenario> {
    let entries = fs::read_dir(metrics_dir)
        .with_context(|| format!("Failed to read metrics directory {}", metrics_dir.display()))?;

    let mut systems: RawScenario = BTreeMap::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read metrics directory {}", metrics_dir.display()))?;
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        let Some(stem) = path.file_stem() else {
            continue;
        };
        let system_id = stem.to_string_lossy().to_string();
        if excluded_systems.iter().any(|excluded| *excluded == system_id) {
            debug!(system_id = %system_id, "System excluded from analysis");
            continue;
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read result file {}", path.display()))?;
        let records: BTreeMap<String, RawQueryRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse result file {}", path.display()))?;
        systems.insert(system_id, records);
    }
    Ok(systems)
}

/// Merge one query's records across repeat runs.
///
/// A repeat contributes to the averages only when it succeeded with positive
/// time and cost and some quality source; the merged record is successful
/// when any repeat succeeded, so a system is not punished for one flaky run.
fn merge_repeats(runs: &[RawQueryRecord]) -> RawQueryRecord {
    let usable: Vec<&RawQueryRecord> = runs.iter().filter(|run| repeat_is_usable(run)).collect();
    let status = if runs.iter().any(|run| run.status.is_success()) {
        QueryStatus::Success
    } else {
        runs.first().map_or(QueryStatus::Failed, |run| run.status)
    };
    RawQueryRecord {
        status,
        execution_time: average_field(&usable, |run| run.execution_time),
        money_cost: average_field(&usable, |run| run.money_cost),
        f1_score: average_field(&usable, |run| run.f1_score),
        accuracy: average_field(&usable, |run| run.accuracy),
        relative_error: average_field(&usable, |run| run.relative_error),
        spearman_correlation: average_field(&usable, |run| run.spearman_correlation),
        error: runs.iter().find_map(|run| run.error.clone()),
    }
}

fn repeat_is_usable(run: &RawQueryRecord) -> bool {
    run.status.is_success()
        && run.execution_time.is_some_and(|time| time > 0.0)
        && run.money_cost.is_some_and(|cost| cost > 0.0)
        && has_quality_source(run)
}

fn has_quality_source(run: &RawQueryRecord) -> bool {
    run.f1_score.is_some()
        || run.accuracy.is_some()
        || run.relative_error.is_some()
        || run.spearman_correlation.is_some()
}

/// Mean of `field` over the usable repeats that carry it; `None` when no
/// usable repeat does.
fn average_field(
    usable: &[&RawQueryRecord],
    field: impl Fn(&RawQueryRecord) -> Option<f64>,
) -> Option<f64> {
    let values: Vec<f64> = usable.iter().filter_map(|run| field(run)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
