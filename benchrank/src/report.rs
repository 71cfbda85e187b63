//! Report assembly and rendering.
//!
//! An analysis report applies the full pipeline (competitive sets, winner
//! tallies, bounds, convergence, statistics) to three groupings of the same
//! snapshot: the whole dataset, each scenario on its own, and any named query
//! groups from the config file. Rendering is either one JSON document or a
//! human-readable summary.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use benchrank_core::bounds::{Coverage, coverage, upper_bounds, win_rate};
use benchrank_core::competitive::build_competitive_queries;
use benchrank_core::config::{ConvergenceConfig, ToleranceLevels};
use benchrank_core::convergence::find_convergence;
use benchrank_core::stats::{MetricStatistics, aggregate_statistics};
use benchrank_core::types::{BenchmarkSnapshot, Metric};
use benchrank_core::winners::{WinRow, rank_by_wins, tally_strict_wins, tolerance_win_table};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{AnalysisConfig, OutputFormat};

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub analysis_run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub overall: GroupReport,
    pub scenarios: BTreeMap<String, GroupReport>,
    pub query_groups: BTreeMap<String, GroupReport>,
}

/// Pipeline output for one grouping of the snapshot.
///
/// The win tallies cover the systems present in the grouping, so a system
/// that never ran a scenario does not show up in that scenario's tables.
#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub metrics: BTreeMap<Metric, MetricReport>,
    pub statistics: BTreeMap<String, BTreeMap<Metric, MetricStatistics>>,
}

#[derive(Debug, Serialize)]
pub struct MetricReport {
    pub competitive_queries: usize,
    pub strict_wins: BTreeMap<String, f64>,
    pub tolerance_wins: Vec<WinRow>,
    pub upper_bounds: BTreeMap<String, u64>,
    pub coverage: BTreeMap<String, Coverage>,
    pub convergence: BTreeMap<String, Option<f64>>,
}

pub fn build_report(
    snapshot: &BenchmarkSnapshot,
    config: &AnalysisConfig,
    analysis_run_id: Uuid,
) -> AnalysisReport {
    debug!("Analyzing all scenarios together");
    let overall = build_group_report(snapshot, &config.tolerance_levels, &config.convergence);

    let scenarios = snapshot
        .scenarios
        .keys()
        .map(|scenario_id| {
            debug!(scenario_id = %scenario_id, "Analyzing scenario");
            let slice = snapshot.scenario_slice(scenario_id);
            let report = build_group_report(&slice, &config.tolerance_levels, &config.convergence);
            (scenario_id.clone(), report)
        })
        .collect();

    let query_groups = config
        .query_groups
        .iter()
        .map(|(group_id, queries)| {
            debug!(group_id = %group_id, "Analyzing query group");
            let slice = snapshot.query_slice(queries);
            let report = build_group_report(&slice, &config.tolerance_levels, &config.convergence);
            (group_id.clone(), report)
        })
        .collect();

    AnalysisReport {
        analysis_run_id,
        generated_at: Utc::now(),
        overall,
        scenarios,
        query_groups,
    }
}

/// Run the full pipeline on one snapshot slice.
pub fn build_group_report(
    snapshot: &BenchmarkSnapshot,
    tolerance_levels: &ToleranceLevels,
    convergence: &ConvergenceConfig,
) -> GroupReport {
    let systems = snapshot.systems();
    let metrics = Metric::ALL
        .into_iter()
        .map(|metric| {
            let queries = build_competitive_queries(snapshot, metric);
            let report = MetricReport {
                competitive_queries: queries.len(),
                strict_wins: tally_strict_wins(&queries, metric, &systems),
                tolerance_wins: tolerance_win_table(
                    &queries,
                    metric,
                    tolerance_levels.for_metric(metric),
                    &systems,
                ),
                upper_bounds: upper_bounds(&queries, &systems),
                coverage: coverage(&queries, &systems),
                convergence: find_convergence(
                    &queries,
                    metric,
                    convergence.for_metric(metric),
                    &systems,
                ),
            };
            (metric, report)
        })
        .collect();

    GroupReport {
        metrics,
        statistics: aggregate_statistics(snapshot),
    }
}

pub fn write_report(
    writer: &mut impl Write,
    report: &AnalysisReport,
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            writeln!(writer, "{}", serde_json::to_string(report)?)?;
        }
        OutputFormat::Pretty => {
            render_pretty(writer, report)?;
        }
    }
    Ok(())
}

fn render_pretty(writer: &mut impl Write, report: &AnalysisReport) -> Result<()> {
    writeln!(writer, "Run ID: {}", report.analysis_run_id)?;
    writeln!(writer, "Generated at: {}", report.generated_at)?;
    render_group(writer, "overall", &report.overall)?;
    for (scenario_id, group) in &report.scenarios {
        let title = format!("scenario: {scenario_id}");
        render_group(writer, &title, group)?;
    }
    for (group_id, group) in &report.query_groups {
        let title = format!("query group: {group_id}");
        render_group(writer, &title, group)?;
    }
    Ok(())
}

fn render_group(writer: &mut impl Write, title: &str, group: &GroupReport) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "=== {title} ===")?;
    for (metric, metric_report) in &group.metrics {
        render_metric(writer, *metric, metric_report)?;
    }
    if group.statistics.is_empty() {
        return Ok(());
    }
    writeln!(writer, "statistics (avg / median / sum):")?;
    for (system_id, per_metric) in &group.statistics {
        for (metric, stats) in per_metric {
            let avg = stats.avg;
            let median = stats.median;
            let sum = stats.sum;
            writeln!(
                writer,
                "  {system_id} {metric}: {avg:.2} / {median:.2} / {sum:.2}"
            )?;
        }
    }
    Ok(())
}

fn render_metric(writer: &mut impl Write, metric: Metric, report: &MetricReport) -> Result<()> {
    let num_queries = report.competitive_queries;
    writeln!(writer, "[{metric}] competitive queries: {num_queries}")?;
    for (system_id, wins) in rank_by_wins(&report.strict_wins) {
        let bound = report.upper_bounds.get(&system_id).copied().unwrap_or(0);
        let rate = win_rate(wins, num_queries as u64);
        let convergence = match report.convergence.get(&system_id) {
            Some(Some(tolerance)) => format!("{tolerance:.2}"),
            _ => "none".to_string(),
        };
        writeln!(
            writer,
            "  {system_id}: strict {wins:.2}, rate {rate:.2}, bound {bound}, convergence {convergence}"
        )?;
    }
    if report.tolerance_wins.is_empty() {
        return Ok(());
    }
    writeln!(writer, "  tolerance sweep:")?;
    for row in &report.tolerance_wins {
        let tolerance = row.tolerance;
        let ranked = rank_by_wins(&row.wins)
            .into_iter()
            .map(|(system_id, wins)| format!("{system_id} {wins:.0}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(writer, "    {tolerance:>6.2}: {ranked}")?;
    }
    Ok(())
}
