//! Normalization of raw harness records into comparable metric values.
//!
//! Missing fields are never an error here: harnesses differ in what they
//! report, and the comparison layers downstream are defined over defaults
//! (`+inf` for the cost-like metrics, 0.0 for quality) rather than over
//! absence.

use crate::types::{QualitySource, QueryResult, RawQueryRecord};

/// Resolve an optional cost-like field (execution time, money cost).
///
/// Absent or non-finite values become `+inf`: the system can never win on
/// the metric but stays comparable everywhere it appears.
fn finite_or_inf(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => f64::INFINITY,
    }
}

/// Extract the quality value and the field that supplied it.
///
/// Sources are tried in a fixed priority order and the first present field
/// wins:
///
/// 1. `f1_score`, used as-is;
/// 2. `accuracy`, used as-is;
/// 3. `relative_error`, mapped onto a quality via `1 / (1 + e)` so that a
///    perfect answer (e = 0) scores 1.0 and larger errors decay toward 0;
/// 4. `spearman_correlation`, clamped at 0 so anticorrelation does not score;
/// 5. no source present: 0.0.
pub fn extract_quality(record: &RawQueryRecord) -> (f64, QualitySource) {
    if let Some(f1) = record.f1_score {
        return (f1, QualitySource::F1Score);
    }
    if let Some(accuracy) = record.accuracy {
        return (accuracy, QualitySource::Accuracy);
    }
    if let Some(error) = record.relative_error {
        // A degenerate e == -1 would divide by zero; it scores 0.0 like any
        // other zero-denominator case in this crate.
        let denominator = 1.0 + error;
        let quality = if denominator == 0.0 {
            0.0
        } else {
            1.0 / denominator
        };
        return (quality, QualitySource::RelativeError);
    }
    if let Some(rho) = record.spearman_correlation {
        return (rho.max(0.0), QualitySource::SpearmanCorrelation);
    }
    (0.0, QualitySource::None)
}

/// Normalize one raw record into a [`QueryResult`].
pub fn normalize_record(record: &RawQueryRecord) -> QueryResult {
    let (quality, quality_source) = extract_quality(record);
    QueryResult {
        status: record.status,
        execution_time: finite_or_inf(record.execution_time),
        money_cost: finite_or_inf(record.money_cost),
        quality,
        quality_source,
    }
}
