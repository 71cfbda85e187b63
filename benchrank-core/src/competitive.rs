//! Competitive query selection.
//!
//! A query carries signal about relative performance only when at least two
//! systems produced a usable result for it. Everything downstream (winner
//! credit, upper bounds, convergence) is defined over this competitive set.

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::{BenchmarkSnapshot, Metric};

/// One system's entry in a competitive query.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub system_id: String,
    pub value: f64,
}

/// A query where at least two systems compete on one metric.
///
/// Participants are ordered by system id, so every downstream scan over them
/// is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitiveQuery {
    pub scenario_id: String,
    pub query_id: String,
    pub participants: Vec<Participant>,
}

/// Collect the competitive queries for `metric` across the whole snapshot,
/// ordered by scenario id and then query id.
///
/// Participation requires a successful status and a usable value: finite for
/// execution time and money cost, any value for quality (a successful record
/// always has one, defaulting to 0.0, and 0.0 is a valid value to compete
/// with). Queries with fewer than two participants are skipped silently;
/// that is a normal data condition, not an error.
pub fn build_competitive_queries(
    snapshot: &BenchmarkSnapshot,
    metric: Metric,
) -> Vec<CompetitiveQuery> {
    let mut queries = Vec::new();
    for (scenario_id, systems) in &snapshot.scenarios {
        // Union of query ids across every system in the scenario; the set
        // keeps them sorted.
        let mut query_ids: BTreeSet<&str> = BTreeSet::new();
        for results in systems.values() {
            query_ids.extend(results.keys().map(String::as_str));
        }

        for query_id in query_ids {
            let mut participants = Vec::new();
            for (system_id, results) in systems {
                let Some(result) = results.get(query_id) else {
                    continue;
                };
                if !result.status.is_success() {
                    continue;
                }
                let value = result.metric_value(metric);
                let usable = match metric {
                    Metric::ExecutionTime | Metric::MoneyCost => value.is_finite(),
                    Metric::Quality => true,
                };
                if !usable {
                    continue;
                }
                participants.push(Participant {
                    system_id: system_id.clone(),
                    value,
                });
            }
            if participants.len() >= 2 {
                queries.push(CompetitiveQuery {
                    scenario_id: scenario_id.clone(),
                    query_id: query_id.to_string(),
                    participants,
                });
            }
        }
    }
    debug!(
        metric = %metric,
        num_queries = queries.len(),
        "collected competitive queries"
    );
    queries
}
