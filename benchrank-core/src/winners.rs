//! Winner determination over competitive queries.
//!
//! Two credit models share the same notion of "best" but answer different
//! questions:
//!
//! - strict: which system is ahead? Only systems matching the best value
//!   win, and ties split a single credit equally, so every query contributes
//!   exactly 1.0 in total.
//! - tolerance: who is close enough? Every participant within tolerance of
//!   the best earns a full credit, so a query's total can exceed 1.0.
//!
//! The models are intentionally not interchangeable and their totals are not
//! comparable to each other.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::competitive::CompetitiveQuery;
use crate::types::{Direction, Metric, ToleranceKind};

/// Whether `value` stays within `tolerance` of the best observed value.
///
/// Relative tolerance scales the band with the best value, absolute
/// tolerance widens it by a fixed amount:
///
/// - lower-is-better, relative:  `value <= best * (1 + tolerance)`
/// - higher-is-better, relative: `value >= best * (1 - tolerance)`
/// - lower-is-better, absolute:  `value <= best + tolerance`
/// - higher-is-better, absolute: `value >= best - tolerance`
pub fn within_tolerance(
    value: f64,
    best: f64,
    tolerance: f64,
    direction: Direction,
    kind: ToleranceKind,
) -> bool {
    match (direction, kind) {
        (Direction::LowerIsBetter, ToleranceKind::Relative) => value <= best * (1.0 + tolerance),
        (Direction::HigherIsBetter, ToleranceKind::Relative) => value >= best * (1.0 - tolerance),
        (Direction::LowerIsBetter, ToleranceKind::Absolute) => value <= best + tolerance,
        (Direction::HigherIsBetter, ToleranceKind::Absolute) => value >= best - tolerance,
    }
}

/// The best participant value in `query` for `metric` (minimum or maximum
/// depending on the metric's direction).
fn best_value(query: &CompetitiveQuery, metric: Metric) -> Option<f64> {
    let values = query.participants.iter().map(|p| p.value);
    match metric.direction() {
        Direction::LowerIsBetter => values.min_by(f64::total_cmp),
        Direction::HigherIsBetter => values.max_by(f64::total_cmp),
    }
}

/// System ids achieving exactly the best value for `metric` in `query`,
/// in participant (system id) order.
pub fn strict_winners(query: &CompetitiveQuery, metric: Metric) -> Vec<String> {
    let Some(best) = best_value(query, metric) else {
        return Vec::new();
    };
    query
        .participants
        .iter()
        .filter(|p| p.value == best)
        .map(|p| p.system_id.clone())
        .collect()
}

/// System ids within `tolerance` of the best value for `metric` in `query`,
/// in participant (system id) order.
pub fn tolerance_winners(
    query: &CompetitiveQuery,
    metric: Metric,
    tolerance: f64,
) -> Vec<String> {
    let Some(best) = best_value(query, metric) else {
        return Vec::new();
    };
    let direction = metric.direction();
    let kind = metric.tolerance_kind();
    query
        .participants
        .iter()
        .filter(|p| within_tolerance(p.value, best, tolerance, direction, kind))
        .map(|p| p.system_id.clone())
        .collect()
}

/// Strict win credit per system over `queries`.
///
/// Every system in `systems` appears in the output, zero-initialized, so
/// non-winners show up explicitly in reports. Ties share one credit equally;
/// because of that, summing the output equals the number of queries.
pub fn tally_strict_wins(
    queries: &[CompetitiveQuery],
    metric: Metric,
    systems: &[String],
) -> BTreeMap<String, f64> {
    let mut wins: BTreeMap<String, f64> = systems.iter().map(|s| (s.clone(), 0.0)).collect();
    for query in queries {
        let winners = strict_winners(query, metric);
        if winners.is_empty() {
            continue;
        }
        let credit = 1.0 / winners.len() as f64;
        for system_id in winners {
            *wins.entry(system_id).or_insert(0.0) += credit;
        }
    }
    wins
}

/// Tolerance-mode win counts per system over `queries` at one `tolerance`.
///
/// Every qualifying system earns a full credit per query, so per-query
/// totals are not conserved; counts are comparable against the bounds from
/// [`crate::bounds::upper_bounds`], not against strict credit.
pub fn tally_tolerance_wins(
    queries: &[CompetitiveQuery],
    metric: Metric,
    tolerance: f64,
    systems: &[String],
) -> BTreeMap<String, f64> {
    let mut wins: BTreeMap<String, f64> = systems.iter().map(|s| (s.clone(), 0.0)).collect();
    for query in queries {
        for system_id in tolerance_winners(query, metric, tolerance) {
            *wins.entry(system_id).or_insert(0.0) += 1.0;
        }
    }
    wins
}

/// Win counts at one tolerance level of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinRow {
    pub tolerance: f64,
    pub wins: BTreeMap<String, f64>,
}

/// Tolerance-mode win counts across an ordered sweep of tolerance levels.
pub fn tolerance_win_table(
    queries: &[CompetitiveQuery],
    metric: Metric,
    tolerances: &[f64],
    systems: &[String],
) -> Vec<WinRow> {
    tolerances
        .iter()
        .map(|&tolerance| WinRow {
            tolerance,
            wins: tally_tolerance_wins(queries, metric, tolerance, systems),
        })
        .collect()
}

/// Sort systems best-first by win count, breaking ties by system id.
pub fn rank_by_wins(wins: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = wins.iter().map(|(s, &w)| (s.clone(), w)).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::upper_bounds;
    use crate::competitive::Participant;

    // ======================= Test helpers =======================

    fn query(values: &[(&str, f64)]) -> CompetitiveQuery {
        CompetitiveQuery {
            scenario_id: "movie".to_string(),
            query_id: "Q1".to_string(),
            participants: values
                .iter()
                .map(|(system_id, value)| Participant {
                    system_id: (*system_id).to_string(),
                    value: *value,
                })
                .collect(),
        }
    }

    fn systems(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    // ======================= Predicate =======================

    #[test]
    fn test_within_tolerance_covers_all_four_cases() {
        // lower / relative: 20 is not within 15% of 10, 11 is.
        assert!(within_tolerance(
            11.0,
            10.0,
            0.15,
            Direction::LowerIsBetter,
            ToleranceKind::Relative
        ));
        assert!(!within_tolerance(
            20.0,
            10.0,
            0.15,
            Direction::LowerIsBetter,
            ToleranceKind::Relative
        ));
        // higher / relative: 0.9 of best 1.0 is within 10%.
        assert!(within_tolerance(
            0.9,
            1.0,
            0.1,
            Direction::HigherIsBetter,
            ToleranceKind::Relative
        ));
        // lower / absolute: 10.4 is within +0.5 of 10.
        assert!(within_tolerance(
            10.4,
            10.0,
            0.5,
            Direction::LowerIsBetter,
            ToleranceKind::Absolute
        ));
        // higher / absolute: 0.75 is within 0.10 of 0.85, 0.60 is not.
        assert!(within_tolerance(
            0.75,
            0.85,
            0.10,
            Direction::HigherIsBetter,
            ToleranceKind::Absolute
        ));
        assert!(!within_tolerance(
            0.60,
            0.85,
            0.10,
            Direction::HigherIsBetter,
            ToleranceKind::Absolute
        ));
    }

    #[test]
    fn test_zero_tolerance_admits_only_the_best() {
        assert!(within_tolerance(
            10.0,
            10.0,
            0.0,
            Direction::LowerIsBetter,
            ToleranceKind::Relative
        ));
        assert!(!within_tolerance(
            10.001,
            10.0,
            0.0,
            Direction::LowerIsBetter,
            ToleranceKind::Relative
        ));
    }

    // ======================= Strict mode =======================

    #[test]
    fn test_strict_tie_splits_credit() {
        // Times {a: 10, b: 10, c: 20}: a and b split the credit, c gets none.
        let queries = vec![query(&[("a", 10.0), ("b", 10.0), ("c", 20.0)])];
        let wins = tally_strict_wins(&queries, Metric::ExecutionTime, &systems(&["a", "b", "c"]));
        assert_eq!(wins["a"], 0.5);
        assert_eq!(wins["b"], 0.5);
        assert_eq!(wins["c"], 0.0);
    }

    #[test]
    fn test_strict_credit_is_conserved_per_query() {
        let queries = vec![
            query(&[("a", 10.0), ("b", 10.0), ("c", 20.0)]),
            query(&[("a", 3.0), ("b", 2.0), ("c", 7.0)]),
            query(&[("a", 5.0), ("b", 5.0), ("c", 5.0)]),
        ];
        let wins = tally_strict_wins(&queries, Metric::ExecutionTime, &systems(&["a", "b", "c"]));
        let total: f64 = wins.values().sum();
        assert!((total - queries.len() as f64).abs() < 1e-9);
    }

    #[test]
    fn test_strict_quality_prefers_higher() {
        let queries = vec![query(&[("a", 0.85), ("b", 0.75), ("c", 0.60)])];
        let wins = tally_strict_wins(&queries, Metric::Quality, &systems(&["a", "b", "c"]));
        assert_eq!(wins["a"], 1.0);
        assert_eq!(wins["b"], 0.0);
        assert_eq!(wins["c"], 0.0);
    }

    #[test]
    fn test_strict_tally_zero_initializes_all_systems() {
        let wins = tally_strict_wins(&[], Metric::ExecutionTime, &systems(&["a", "b"]));
        assert_eq!(wins.len(), 2);
        assert_eq!(wins["a"], 0.0);
        assert_eq!(wins["b"], 0.0);
    }

    // ======================= Tolerance mode =======================

    #[test]
    fn test_tolerance_mode_grants_full_credit_to_each_qualifier() {
        // Times {a: 10, b: 10, c: 20} at 15%: threshold 11.5, so a and b each
        // earn a full credit and the query total exceeds 1.0.
        let queries = vec![query(&[("a", 10.0), ("b", 10.0), ("c", 20.0)])];
        let wins = tally_tolerance_wins(
            &queries,
            Metric::ExecutionTime,
            0.15,
            &systems(&["a", "b", "c"]),
        );
        assert_eq!(wins["a"], 1.0);
        assert_eq!(wins["b"], 1.0);
        assert_eq!(wins["c"], 0.0);
        assert_eq!(wins.values().sum::<f64>(), 2.0);
    }

    #[test]
    fn test_tolerance_quality_absolute_band() {
        // Quality {a: 0.85, b: 0.75, c: 0.60} at an absolute 0.10: a and b
        // qualify, c falls outside the band.
        let queries = vec![query(&[("a", 0.85), ("b", 0.75), ("c", 0.60)])];
        let wins =
            tally_tolerance_wins(&queries, Metric::Quality, 0.10, &systems(&["a", "b", "c"]));
        assert_eq!(wins["a"], 1.0);
        assert_eq!(wins["b"], 1.0);
        assert_eq!(wins["c"], 0.0);
    }

    #[test]
    fn test_tolerance_wins_are_monotone_in_tolerance() {
        let queries = vec![
            query(&[("a", 10.0), ("b", 12.0), ("c", 30.0)]),
            query(&[("a", 8.0), ("b", 7.0), ("c", 9.0)]),
            query(&[("a", 100.0), ("b", 180.0), ("c", 101.0)]),
        ];
        let all = systems(&["a", "b", "c"]);
        let levels = [0.0, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0];
        let mut previous: Option<BTreeMap<String, f64>> = None;
        for &tolerance in &levels {
            let wins = tally_tolerance_wins(&queries, Metric::ExecutionTime, tolerance, &all);
            if let Some(prev) = previous {
                for system_id in &all {
                    assert!(
                        wins[system_id] >= prev[system_id],
                        "wins for {system_id} decreased at tolerance {tolerance}"
                    );
                }
            }
            previous = Some(wins);
        }
    }

    #[test]
    fn test_tolerance_wins_never_exceed_upper_bounds() {
        // Mixed participation: a and b run all three queries, c runs one,
        // d runs none.
        let queries = vec![
            query(&[("a", 10.0), ("b", 12.0), ("c", 30.0)]),
            query(&[("a", 8.0), ("b", 7.0)]),
            query(&[("a", 100.0), ("b", 180.0)]),
        ];
        let all = systems(&["a", "b", "c", "d"]);
        let bounds = upper_bounds(&queries, &all);
        // The widest level admits every participant on every query, so the
        // tally tops out exactly at the participation bound.
        for &tolerance in &[0.0, 0.1, 0.5, 2.0, 10.0] {
            let wins = tally_tolerance_wins(&queries, Metric::ExecutionTime, tolerance, &all);
            for system_id in &all {
                assert!(
                    wins[system_id] <= bounds[system_id] as f64,
                    "wins for {system_id} exceed the bound at tolerance {tolerance}"
                );
            }
        }
        let widest = tally_tolerance_wins(&queries, Metric::ExecutionTime, 10.0, &all);
        for system_id in &all {
            assert_eq!(widest[system_id], bounds[system_id] as f64);
        }
    }

    #[test]
    fn test_win_table_has_one_row_per_level() {
        let queries = vec![query(&[("a", 10.0), ("b", 20.0)])];
        let table = tolerance_win_table(
            &queries,
            Metric::ExecutionTime,
            &[0.0, 1.0, 2.0],
            &systems(&["a", "b"]),
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table[0].tolerance, 0.0);
        assert_eq!(table[0].wins["b"], 0.0);
        // b is exactly 2x slower, so it qualifies at tolerance 1.0.
        assert_eq!(table[1].wins["b"], 1.0);
        assert_eq!(table[2].wins["b"], 1.0);
    }

    // ======================= Ranking =======================

    #[test]
    fn test_rank_by_wins_orders_best_first_with_id_tiebreak() {
        let mut wins = BTreeMap::new();
        wins.insert("c".to_string(), 2.0);
        wins.insert("a".to_string(), 1.0);
        wins.insert("b".to_string(), 2.0);
        let ranked = rank_by_wins(&wins);
        assert_eq!(
            ranked,
            vec![
                ("b".to_string(), 2.0),
                ("c".to_string(), 2.0),
                ("a".to_string(), 1.0),
            ]
        );
    }
}
