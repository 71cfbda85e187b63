//! Descriptive statistics over raw metric values.
//!
//! These summaries are computed from the full snapshot, independent of the
//! competitive-query filter used for win counting: every successful query a
//! system ran contributes, whether or not another system ran it too.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{BenchmarkSnapshot, Metric};

/// Summary of one system's values for one metric.
///
/// All fields are 0.0 when the system produced no usable samples for the
/// metric, so downstream consumers never see NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStatistics {
    pub avg: f64,
    pub median: f64,
    pub sum: f64,
}

impl MetricStatistics {
    fn from_samples(samples: &mut [f64]) -> Self {
        let (avg, median) = match (mean(samples), median(samples)) {
            (Some(avg), Some(median)) => (avg, median),
            _ => (0.0, 0.0),
        };
        Self {
            avg,
            median,
            sum: samples.iter().sum(),
        }
    }
}

fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Median of the samples, averaging the two middle values for even counts.
/// Sorts its input in place.
fn median(samples: &mut [f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable_by(f64::total_cmp);
    let mid = samples.len() / 2;
    if samples.len() % 2 == 1 {
        Some(samples[mid])
    } else {
        Some((samples[mid - 1] + samples[mid]) / 2.0)
    }
}

/// Aggregate per-system, per-metric statistics across the whole snapshot.
///
/// Samples come from successful queries only. Execution time and money cost
/// additionally require a finite value (a missing measurement contributes
/// nothing rather than skewing the sum to infinity), and quality requires a
/// strictly positive score so that queries with no quality signal at all do
/// not drag the average down. Every system in the snapshot gets an entry for
/// every metric, zero-valued when no sample passed the filter.
pub fn aggregate_statistics(
    snapshot: &BenchmarkSnapshot,
) -> BTreeMap<String, BTreeMap<Metric, MetricStatistics>> {
    let mut samples: BTreeMap<String, BTreeMap<Metric, Vec<f64>>> = BTreeMap::new();
    for system_id in snapshot.systems() {
        let per_metric = Metric::ALL.map(|metric| (metric, Vec::new()));
        samples.insert(system_id, per_metric.into_iter().collect());
    }

    for scenario in snapshot.scenarios.values() {
        for (system_id, queries) in scenario {
            let Some(per_metric) = samples.get_mut(system_id) else {
                continue;
            };
            for result in queries.values() {
                if !result.status.is_success() {
                    continue;
                }
                for metric in Metric::ALL {
                    let value = result.metric_value(metric);
                    let usable = match metric {
                        Metric::ExecutionTime | Metric::MoneyCost => value.is_finite(),
                        Metric::Quality => value > 0.0,
                    };
                    if usable {
                        if let Some(values) = per_metric.get_mut(&metric) {
                            values.push(value);
                        }
                    }
                }
            }
        }
    }

    samples
        .into_iter()
        .map(|(system_id, per_metric)| {
            let stats = per_metric
                .into_iter()
                .map(|(metric, mut values)| (metric, MetricStatistics::from_samples(&mut values)))
                .collect();
            (system_id, stats)
        })
        .collect()
}
