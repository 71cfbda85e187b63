//! Participation bounds and coverage.
//!
//! A system's upper bound is the number of competitive queries it
//! participated in: the best any tolerance could ever do for it. The
//! convergence search in [`crate::convergence`] treats this as its target.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::competitive::CompetitiveQuery;

/// Maximum achievable tolerance-mode win count per system: one per
/// competitive query it participates in, regardless of ties.
///
/// Every system in `systems` appears in the output; a system that never
/// participates keeps a bound of 0.
pub fn upper_bounds(queries: &[CompetitiveQuery], systems: &[String]) -> BTreeMap<String, u64> {
    let mut bounds: BTreeMap<String, u64> = systems.iter().map(|s| (s.clone(), 0)).collect();
    for query in queries {
        for participant in &query.participants {
            *bounds.entry(participant.system_id.clone()).or_insert(0) += 1;
        }
    }
    bounds
}

/// How much of the competitive field a system showed up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    /// Competitive queries the system participated in.
    pub participated: u64,
    /// All competitive queries for the metric.
    pub total_competitive: u64,
}

/// Per-system coverage of the competitive query set.
pub fn coverage(queries: &[CompetitiveQuery], systems: &[String]) -> BTreeMap<String, Coverage> {
    let total_competitive = queries.len() as u64;
    upper_bounds(queries, systems)
        .into_iter()
        .map(|(system_id, participated)| {
            (
                system_id,
                Coverage {
                    participated,
                    total_competitive,
                },
            )
        })
        .collect()
}

/// Fraction of `total` won; 0.0 when there is nothing to win.
pub fn win_rate(wins: f64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        wins / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competitive::Participant;

    fn query(participants: &[&str]) -> CompetitiveQuery {
        CompetitiveQuery {
            scenario_id: "movie".to_string(),
            query_id: "Q1".to_string(),
            participants: participants
                .iter()
                .map(|system_id| Participant {
                    system_id: (*system_id).to_string(),
                    value: 1.0,
                })
                .collect(),
        }
    }

    fn systems(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_upper_bound_counts_participation_not_wins() {
        // a and b participate in all three queries, c in one; values and
        // ties are irrelevant.
        let queries = vec![
            query(&["a", "b"]),
            query(&["a", "b", "c"]),
            query(&["a", "b"]),
        ];
        let bounds = upper_bounds(&queries, &systems(&["a", "b", "c", "d"]));
        assert_eq!(bounds["a"], 3);
        assert_eq!(bounds["b"], 3);
        assert_eq!(bounds["c"], 1);
        assert_eq!(bounds["d"], 0);
    }

    #[test]
    fn test_coverage_reports_participation_over_total() {
        let queries = vec![query(&["a", "b"]), query(&["a", "c"])];
        let cov = coverage(&queries, &systems(&["a", "b", "c"]));
        assert_eq!(
            cov["a"],
            Coverage {
                participated: 2,
                total_competitive: 2
            }
        );
        assert_eq!(
            cov["b"],
            Coverage {
                participated: 1,
                total_competitive: 2
            }
        );
    }

    #[test]
    fn test_win_rate_guards_zero_denominator() {
        assert_eq!(win_rate(0.0, 0), 0.0);
        assert_eq!(win_rate(3.0, 4), 0.75);
    }
}
