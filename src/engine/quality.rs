//! Quality gate: per-group outlier detectors and a four-dimension quality
//! assessment with an overall 0-100 score.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DataPoint, QualityWarning, QualityWarningKind, UnitSemanticType};

use super::options::QualityConfig;

/// Outcome of the pre-routing detectors for one group.
#[derive(Debug, Default)]
pub struct GroupQuality {
    /// Index in the group -> warnings to attach
    pub warnings: BTreeMap<usize, Vec<QualityWarning>>,
    /// Indices to drop (only when filtering is enabled)
    pub drop: HashSet<usize>,
}

impl GroupQuality {
    fn warn(&mut self, index: usize, warning: QualityWarning) {
        self.warnings.entry(index).or_default().push(warning);
    }
}

fn order_of_magnitude(value: f64) -> Option<i32> {
    if !value.is_finite() || value == 0.0 {
        return None;
    }
    Some(value.abs().log10().floor() as i32)
}

/// Scale-outlier detection over magnitude-normalized values.
///
/// Finds the dominant order-of-magnitude cluster; values at least
/// `magnitude_difference_threshold` decades away from it are flagged.
pub fn detect_scale_outliers(
    effective_values: &[(usize, f64)],
    config: &QualityConfig,
    quality: &mut GroupQuality,
) {
    let magnitudes: Vec<(usize, i32)> = effective_values
        .iter()
        .filter_map(|(idx, v)| order_of_magnitude(*v).map(|m| (*idx, m)))
        .collect();
    if magnitudes.len() < 2 {
        return;
    }

    let mut bins: BTreeMap<i32, usize> = BTreeMap::new();
    for (_, m) in &magnitudes {
        *bins.entry(*m).or_default() += 1;
    }
    let (dominant, count) = match bins.iter().max_by_key(|(_, c)| **c) {
        Some((m, c)) => (*m, *c),
        None => return,
    };
    let share = count as f64 / magnitudes.len() as f64;
    if share < config.cluster_threshold {
        return;
    }

    for (idx, m) in magnitudes {
        if (m - dominant).abs() >= config.magnitude_difference_threshold {
            quality.warn(
                idx,
                QualityWarning::new(
                    QualityWarningKind::ScaleOutlier,
                    format!(
                        "value magnitude 1e{m} differs from the group's dominant 1e{dominant}"
                    ),
                ),
            );
        }
    }
}

/// Unit-type consistency: flag (or drop) items whose semantic type is
/// incompatible with the group's dominant type.
pub fn detect_type_inconsistency(
    semantics: &[(usize, UnitSemanticType)],
    config: &QualityConfig,
    quality: &mut GroupQuality,
) {
    let known: Vec<(usize, UnitSemanticType)> = semantics
        .iter()
        .filter(|(_, s)| *s != UnitSemanticType::Unknown)
        .copied()
        .collect();
    if known.len() < 2 {
        return;
    }

    let mut counts: BTreeMap<&'static str, (UnitSemanticType, usize)> = BTreeMap::new();
    for (_, s) in &known {
        let key = semantic_key(*s);
        counts.entry(key).or_insert((*s, 0)).1 += 1;
    }
    let (dominant, count) = match counts.values().max_by_key(|(_, c)| *c) {
        Some((s, c)) => (*s, *c),
        None => return,
    };
    if (count as f64 / known.len() as f64) < config.dominant_type_threshold {
        return;
    }

    for (idx, s) in known {
        if !s.compatible(dominant) {
            quality.warn(
                idx,
                QualityWarning::new(
                    QualityWarningKind::UnitTypeMismatch,
                    format!(
                        "unit type {} is incompatible with the group's dominant {}",
                        semantic_key(s),
                        semantic_key(dominant)
                    ),
                ),
            );
            if config.filter_inconsistent_types {
                quality.drop.insert(idx);
            }
        }
    }
}

fn semantic_key(s: UnitSemanticType) -> &'static str {
    match s {
        UnitSemanticType::Percentage => "percentage",
        UnitSemanticType::Index => "index",
        UnitSemanticType::Count => "count",
        UnitSemanticType::CurrencyAmount => "currency-amount",
        UnitSemanticType::Physical => "physical",
        UnitSemanticType::Rate => "rate",
        UnitSemanticType::Ratio => "ratio",
        UnitSemanticType::Duration => "duration",
        UnitSemanticType::Unknown => "unknown",
    }
}

/// Four quality dimensions plus the weighted overall score, all 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAssessment {
    pub completeness: f64,
    pub consistency: f64,
    pub validity: f64,
    pub timeliness: f64,
    pub overall: f64,
}

/// Assess one group. Consistency is degraded by detector findings; validity
/// by unparseable units and non-finite values; timeliness by observation age
/// relative to the newest point in the group.
pub fn assess_group(
    points: &[&DataPoint],
    semantics: &[UnitSemanticType],
    quality: &GroupQuality,
) -> QualityAssessment {
    let n = points.len().max(1) as f64;

    let complete = points
        .iter()
        .filter(|p| !p.unit.trim().is_empty() && p.value.is_finite() && p.date.is_some())
        .count() as f64;
    let completeness = 100.0 * complete / n;

    let flagged = quality.warnings.len() as f64;
    let consistency = 100.0 * (1.0 - flagged / n).max(0.0);

    let valid = points
        .iter()
        .zip(semantics)
        .filter(|(p, s)| p.value.is_finite() && **s != UnitSemanticType::Unknown)
        .count() as f64;
    let validity = 100.0 * valid / n;

    let timeliness = timeliness_score(points);

    let overall =
        0.3 * completeness + 0.3 * consistency + 0.25 * validity + 0.15 * timeliness;

    QualityAssessment {
        completeness,
        consistency,
        validity,
        timeliness,
        overall,
    }
}

fn timeliness_score(points: &[&DataPoint]) -> f64 {
    let dates: Vec<NaiveDate> = points.iter().filter_map(|p| p.date).collect();
    let newest = match dates.iter().max() {
        Some(d) => *d,
        // No dates at all: nothing to penalize
        None => return 100.0,
    };
    let n = dates.len() as f64;
    let fresh = dates
        .iter()
        .filter(|d| (newest - **d).num_days() <= 730)
        .count() as f64;
    100.0 * fresh / n
}
