//! Validated analysis configuration.
//!
//! Malformed configuration is the only error source in this crate, and it
//! surfaces here, at construction time, rather than mid-analysis. Everything
//! the validated types hand out afterwards is infallible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Metric;

/// Default tolerance sweep for the relative-tolerance metrics
/// (execution time, money cost).
pub const DEFAULT_RELATIVE_LEVELS: [f64; 13] = [
    0.0, 0.05, 0.10, 0.15, 0.20, 0.25, 0.30, 0.40, 0.50, 0.75, 1.0, 1.5, 2.0,
];

/// Default tolerance sweep for quality's absolute tolerance.
pub const DEFAULT_QUALITY_LEVELS: [f64; 12] = [
    0.0, 0.01, 0.02, 0.05, 0.10, 0.15, 0.20, 0.30, 0.40, 0.50, 0.75, 1.0,
];

/// Errors raised while validating analysis configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tolerance levels missing for metric `{metric}`")]
    MissingMetric { metric: Metric },
    #[error("negative tolerance {tolerance} for metric `{metric}`")]
    NegativeTolerance { metric: Metric, tolerance: f64 },
    #[error("non-finite tolerance {tolerance} for metric `{metric}`")]
    NonFiniteTolerance { metric: Metric, tolerance: f64 },
    #[error("convergence step for metric `{metric}` must be positive, got {step}")]
    NonPositiveStep { metric: Metric, step: f64 },
    #[error("convergence max_search for metric `{metric}` must be non-negative, got {max_search}")]
    NegativeMaxSearch { metric: Metric, max_search: f64 },
    #[error("tolerance range step must be positive, got {step}")]
    NonPositiveRangeStep { step: f64 },
    #[error("tolerance range bounds must satisfy 0 <= start <= stop, got [{start}, {stop}]")]
    InvalidRangeBounds { start: f64, stop: f64 },
}

// ============================ Tolerance levels ============================

/// Ordered tolerance sweeps per metric.
///
/// A user-provided mapping must cover all three metrics; the built-in
/// [`Default`] carries the standard sweeps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToleranceLevels {
    levels: BTreeMap<Metric, Vec<f64>>,
}

impl ToleranceLevels {
    /// Validate a per-metric tolerance mapping. All three metrics must be
    /// present and every level must be finite and non-negative.
    pub fn new(levels: BTreeMap<Metric, Vec<f64>>) -> Result<Self, ConfigError> {
        for metric in Metric::ALL {
            let Some(values) = levels.get(&metric) else {
                return Err(ConfigError::MissingMetric { metric });
            };
            for &tolerance in values {
                if !tolerance.is_finite() {
                    return Err(ConfigError::NonFiniteTolerance { metric, tolerance });
                }
                if tolerance < 0.0 {
                    return Err(ConfigError::NegativeTolerance { metric, tolerance });
                }
            }
        }
        Ok(Self { levels })
    }

    /// The sweep for `metric`.
    pub fn for_metric(&self, metric: Metric) -> &[f64] {
        match self.levels.get(&metric) {
            Some(values) => values,
            None => &[],
        }
    }
}

impl Default for ToleranceLevels {
    fn default() -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(Metric::ExecutionTime, DEFAULT_RELATIVE_LEVELS.to_vec());
        levels.insert(Metric::MoneyCost, DEFAULT_RELATIVE_LEVELS.to_vec());
        levels.insert(Metric::Quality, DEFAULT_QUALITY_LEVELS.to_vec());
        Self { levels }
    }
}

// ========================== Convergence settings ==========================

/// Grid settings for the convergence search on one metric: the scan covers
/// `0, step, 2 * step, ...` up to `max_search`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvergenceSettings {
    pub max_search: f64,
    pub step: f64,
}

/// Per-metric convergence search settings.
///
/// Metrics without an explicit override fall back to the built-in defaults,
/// which are sized so that a system beaten by orders of magnitude still
/// registers as "not converged" rather than producing absurd tolerances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceConfig {
    settings: BTreeMap<Metric, ConvergenceSettings>,
}

impl ConvergenceConfig {
    /// Apply per-metric overrides on top of the defaults, validating each
    /// provided value immediately.
    pub fn with_overrides(
        overrides: BTreeMap<Metric, ConvergenceSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (metric, settings) in overrides {
            if settings.step.is_nan() || settings.step <= 0.0 {
                return Err(ConfigError::NonPositiveStep {
                    metric,
                    step: settings.step,
                });
            }
            if settings.max_search.is_nan() || settings.max_search < 0.0 {
                return Err(ConfigError::NegativeMaxSearch {
                    metric,
                    max_search: settings.max_search,
                });
            }
            config.settings.insert(metric, settings);
        }
        Ok(config)
    }

    pub fn for_metric(&self, metric: Metric) -> ConvergenceSettings {
        match self.settings.get(&metric) {
            Some(settings) => *settings,
            None => default_settings(metric),
        }
    }
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        let settings = Metric::ALL
            .into_iter()
            .map(|metric| (metric, default_settings(metric)))
            .collect();
        Self { settings }
    }
}

fn default_settings(metric: Metric) -> ConvergenceSettings {
    match metric {
        Metric::ExecutionTime => ConvergenceSettings {
            max_search: 3000.0,
            step: 10.0,
        },
        Metric::MoneyCost => ConvergenceSettings {
            max_search: 7000.0,
            step: 20.0,
        },
        Metric::Quality => ConvergenceSettings {
            max_search: 2.0,
            step: 0.02,
        },
    }
}

// ============================ Tolerance range ============================

/// Evenly spaced inclusive tolerance range for ad-hoc sweeps:
/// `start, start + step, ...` up to `stop`.
///
/// The division is nudged by a small epsilon so a `stop` that is an exact
/// multiple of `step` lands inside the range instead of being lost to float
/// rounding.
pub fn tolerance_range(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, ConfigError> {
    if step.is_nan() || step <= 0.0 {
        return Err(ConfigError::NonPositiveRangeStep { step });
    }
    if !start.is_finite() || !stop.is_finite() || start < 0.0 || start > stop {
        return Err(ConfigError::InvalidRangeBounds { start, stop });
    }
    let count = ((stop - start) / step + 1e-9).floor() as u64;
    Ok((0..=count).map(|i| start + i as f64 * step).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_levels() -> BTreeMap<Metric, Vec<f64>> {
        let mut levels = BTreeMap::new();
        levels.insert(Metric::ExecutionTime, vec![0.0, 0.1]);
        levels.insert(Metric::MoneyCost, vec![0.0, 0.2]);
        levels.insert(Metric::Quality, vec![0.0, 0.05]);
        levels
    }

    #[test]
    fn test_default_levels_cover_all_metrics() {
        let levels = ToleranceLevels::default();
        assert_eq!(
            levels.for_metric(Metric::ExecutionTime),
            DEFAULT_RELATIVE_LEVELS.as_slice()
        );
        assert_eq!(
            levels.for_metric(Metric::MoneyCost),
            DEFAULT_RELATIVE_LEVELS.as_slice()
        );
        assert_eq!(
            levels.for_metric(Metric::Quality),
            DEFAULT_QUALITY_LEVELS.as_slice()
        );
    }

    #[test]
    fn test_missing_metric_is_rejected() {
        let mut levels = full_levels();
        levels.remove(&Metric::Quality);
        assert_eq!(
            ToleranceLevels::new(levels),
            Err(ConfigError::MissingMetric {
                metric: Metric::Quality
            })
        );
    }

    #[test]
    fn test_negative_tolerance_is_rejected() {
        let mut levels = full_levels();
        levels.insert(Metric::MoneyCost, vec![0.0, -0.1]);
        assert_eq!(
            ToleranceLevels::new(levels),
            Err(ConfigError::NegativeTolerance {
                metric: Metric::MoneyCost,
                tolerance: -0.1
            })
        );
    }

    #[test]
    fn test_non_finite_tolerance_is_rejected() {
        let mut levels = full_levels();
        levels.insert(Metric::ExecutionTime, vec![f64::INFINITY]);
        assert!(matches!(
            ToleranceLevels::new(levels),
            Err(ConfigError::NonFiniteTolerance { .. })
        ));
    }

    #[test]
    fn test_valid_levels_pass_through() {
        let levels = ToleranceLevels::new(full_levels()).unwrap();
        assert_eq!(levels.for_metric(Metric::ExecutionTime), &[0.0, 0.1][..]);
    }

    #[test]
    fn test_convergence_defaults_match_metric_scales() {
        let config = ConvergenceConfig::default();
        assert_eq!(config.for_metric(Metric::ExecutionTime).max_search, 3000.0);
        assert_eq!(config.for_metric(Metric::ExecutionTime).step, 10.0);
        assert_eq!(config.for_metric(Metric::MoneyCost).max_search, 7000.0);
        assert_eq!(config.for_metric(Metric::Quality).step, 0.02);
    }

    #[test]
    fn test_convergence_override_applies_to_one_metric_only() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            Metric::Quality,
            ConvergenceSettings {
                max_search: 1.0,
                step: 0.01,
            },
        );
        let config = ConvergenceConfig::with_overrides(overrides).unwrap();
        assert_eq!(config.for_metric(Metric::Quality).step, 0.01);
        assert_eq!(config.for_metric(Metric::ExecutionTime).step, 10.0);
    }

    #[test]
    fn test_zero_step_is_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            Metric::ExecutionTime,
            ConvergenceSettings {
                max_search: 100.0,
                step: 0.0,
            },
        );
        assert_eq!(
            ConvergenceConfig::with_overrides(overrides),
            Err(ConfigError::NonPositiveStep {
                metric: Metric::ExecutionTime,
                step: 0.0
            })
        );
    }

    #[test]
    fn test_negative_max_search_is_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            Metric::MoneyCost,
            ConvergenceSettings {
                max_search: -1.0,
                step: 1.0,
            },
        );
        assert_eq!(
            ConvergenceConfig::with_overrides(overrides),
            Err(ConfigError::NegativeMaxSearch {
                metric: Metric::MoneyCost,
                max_search: -1.0
            })
        );
    }

    #[test]
    fn test_tolerance_range_is_inclusive_of_stop() {
        let range = tolerance_range(0.0, 0.2, 0.05).unwrap();
        assert_eq!(range.len(), 5);
        assert_eq!(range[0], 0.0);
        assert!((range[4] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_tolerance_range_rejects_bad_input() {
        assert!(matches!(
            tolerance_range(0.0, 1.0, 0.0),
            Err(ConfigError::NonPositiveRangeStep { .. })
        ));
        assert!(matches!(
            tolerance_range(2.0, 1.0, 0.1),
            Err(ConfigError::InvalidRangeBounds { .. })
        ));
        assert!(matches!(
            tolerance_range(-0.5, 1.0, 0.1),
            Err(ConfigError::InvalidRangeBounds { .. })
        ));
    }
}
