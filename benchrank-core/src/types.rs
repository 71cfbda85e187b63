use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ================================ Metrics ================================

/// The three comparison metrics tracked for every benchmark query.
///
/// The comparison policy is fixed per metric: execution time and money cost
/// are lower-is-better with relative tolerance, quality is higher-is-better
/// with absolute tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ExecutionTime,
    MoneyCost,
    Quality,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::ExecutionTime, Metric::MoneyCost, Metric::Quality];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::ExecutionTime => "execution_time",
            Metric::MoneyCost => "money_cost",
            Metric::Quality => "quality",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Metric::ExecutionTime | Metric::MoneyCost => Direction::LowerIsBetter,
            Metric::Quality => Direction::HigherIsBetter,
        }
    }

    pub fn tolerance_kind(self) -> ToleranceKind {
        match self {
            Metric::ExecutionTime | Metric::MoneyCost => ToleranceKind::Relative,
            Metric::Quality => ToleranceKind::Absolute,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether smaller or larger metric values win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

/// How a tolerance widens the winning band around the best value: scaled by
/// the best value (relative) or added to it (absolute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceKind {
    Relative,
    Absolute,
}

// ================================ Records ================================

/// Terminal status of a query run as reported by the harness.
///
/// Anything other than `success` keeps the query out of winner determination
/// and statistics; unrecognized statuses are preserved as [`QueryStatus::Other`]
/// so records from newer harness versions still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    Failed,
    #[serde(other)]
    Other,
}

impl QueryStatus {
    pub fn is_success(self) -> bool {
        matches!(self, QueryStatus::Success)
    }
}

/// A single query record as persisted by a benchmark harness.
///
/// Only `status` is required. Metric fields are optional and unknown fields
/// are ignored, so records written by different harness versions all load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQueryRecord {
    pub status: QueryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f1_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spearman_correlation: Option<f64>,
    /// Harness-reported failure message, carried through for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Which record field supplied the quality value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitySource {
    F1Score,
    Accuracy,
    RelativeError,
    SpearmanCorrelation,
    None,
}

/// A normalized query result with every metric resolved to a comparable value.
///
/// Execution time and money cost are `+inf` when the record carried no usable
/// value, so the system stays comparable but can never win on that metric.
/// Quality defaults to 0.0 when no source field was present.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub status: QueryStatus,
    pub execution_time: f64,
    pub money_cost: f64,
    pub quality: f64,
    pub quality_source: QualitySource,
}

impl QueryResult {
    pub fn metric_value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ExecutionTime => self.execution_time,
            Metric::MoneyCost => self.money_cost,
            Metric::Quality => self.quality,
        }
    }
}

// ================================ Snapshot ================================

/// Results for one scenario: `system_id -> query_id -> result`.
pub type ScenarioResults = BTreeMap<String, BTreeMap<String, QueryResult>>;

/// An immutable, normalized view of a full benchmark run:
/// `scenario_id -> system_id -> query_id -> result`.
///
/// `BTreeMap`s keep iteration lexicographic, which is what makes every
/// downstream "first system" selection and every serialized report
/// reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkSnapshot {
    pub scenarios: BTreeMap<String, ScenarioResults>,
}

impl BenchmarkSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        scenario_id: &str,
        system_id: &str,
        query_id: &str,
        result: QueryResult,
    ) {
        self.scenarios
            .entry(scenario_id.to_string())
            .or_default()
            .entry(system_id.to_string())
            .or_default()
            .insert(query_id.to_string(), result);
    }

    /// Every system id seen anywhere in the snapshot, lexicographically sorted.
    pub fn systems(&self) -> Vec<String> {
        let mut systems = BTreeSet::new();
        for scenario in self.scenarios.values() {
            for system_id in scenario.keys() {
                systems.insert(system_id.clone());
            }
        }
        systems.into_iter().collect()
    }

    /// System ids present in `scenario_id`, lexicographically sorted.
    pub fn scenario_systems(&self, scenario_id: &str) -> Vec<String> {
        self.scenarios
            .get(scenario_id)
            .map(|scenario| scenario.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// A snapshot restricted to a single scenario. Empty when the scenario is
    /// not present.
    pub fn scenario_slice(&self, scenario_id: &str) -> BenchmarkSnapshot {
        let mut slice = BenchmarkSnapshot::new();
        if let Some(scenario) = self.scenarios.get(scenario_id) {
            slice
                .scenarios
                .insert(scenario_id.to_string(), scenario.clone());
        }
        slice
    }

    /// A snapshot restricted to the named queries, given as
    /// `scenario_id -> query ids`. Scenarios and queries not present in the
    /// snapshot are skipped.
    pub fn query_slice(&self, queries: &BTreeMap<String, Vec<String>>) -> BenchmarkSnapshot {
        let mut slice = BenchmarkSnapshot::new();
        for (scenario_id, query_ids) in queries {
            let Some(scenario) = self.scenarios.get(scenario_id) else {
                continue;
            };
            for (system_id, results) in scenario {
                for query_id in query_ids {
                    if let Some(result) = results.get(query_id) {
                        slice.insert(scenario_id, system_id, query_id, result.clone());
                    }
                }
            }
        }
        slice
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
