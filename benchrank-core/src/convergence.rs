//! Convergence search.
//!
//! For each system, find the smallest tolerance at which it wins every
//! competitive query it participates in, by scanning an ascending grid and
//! comparing tolerance-mode win counts against the participation bound.
//! Exhausting the grid without converging is a normal outcome: it means the
//! system loses some query by more than the whole search range.

use std::collections::BTreeMap;

use tracing::debug;

use crate::bounds::upper_bounds;
use crate::competitive::CompetitiveQuery;
use crate::config::ConvergenceSettings;
use crate::types::Metric;
use crate::winners::tally_tolerance_wins;

/// Scan the tolerance grid `0, step, 2 * step, ... <= max_search` and report,
/// per system, the first grid point where its tolerance-mode wins reach its
/// upper bound. `None` means the system did not converge within the grid.
///
/// Converged systems are not re-examined at later grid points, and the scan
/// stops early once every system has converged. A system with an upper bound
/// of 0 trivially converges at the first grid point.
pub fn find_convergence(
    queries: &[CompetitiveQuery],
    metric: Metric,
    settings: ConvergenceSettings,
    systems: &[String],
) -> BTreeMap<String, Option<f64>> {
    let bounds = upper_bounds(queries, systems);
    let mut convergence: BTreeMap<String, Option<f64>> =
        systems.iter().map(|s| (s.clone(), None)).collect();
    if systems.is_empty() {
        return convergence;
    }

    let grid_points = (settings.max_search / settings.step).floor() as u64;
    for i in 0..=grid_points {
        let tolerance = i as f64 * settings.step;
        let wins = tally_tolerance_wins(queries, metric, tolerance, systems);
        for (system_id, slot) in &mut convergence {
            if slot.is_some() {
                continue;
            }
            let bound = bounds.get(system_id).copied().unwrap_or(0);
            let won = wins.get(system_id).copied().unwrap_or(0.0);
            if won >= bound as f64 {
                debug!(
                    system_id = %system_id,
                    metric = %metric,
                    tolerance,
                    "system converged"
                );
                *slot = Some(tolerance);
            }
        }
        if convergence.values().all(Option::is_some) {
            break;
        }
    }
    convergence
}
