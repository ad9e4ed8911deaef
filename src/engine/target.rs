//! Auto-target derivation: weighted majority per dimension over an indicator
//! group, with configurable tie-breakers and a minimum-share threshold.

use std::collections::BTreeMap;

use crate::domain::{
    Magnitude, SelectedTarget, TargetMode, TargetSelection, TargetShares, TimeScale,
    UnitSemanticType,
};

use super::options::{
    CurrencyTieBreaker, MagnitudeTieBreaker, NormalizationOptions, TargetDimension,
    TimeTieBreaker,
};
use super::pipeline::SourceDims;

/// Winner of one dimension's majority vote.
struct DimensionPick {
    label: Option<String>,
    reason: String,
}

/// Case-normalized share map for one dimension; unknown labels are excluded.
fn shares_of(labels: &[Option<String>]) -> BTreeMap<String, f64> {
    let known: Vec<&String> = labels.iter().flatten().collect();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in &known {
        *counts.entry((*label).clone()).or_default() += 1;
    }
    let total = known.len() as f64;
    counts
        .into_iter()
        .map(|(label, count)| (label, count as f64 / total))
        .collect()
}

/// Pick the majority label: largest share wins when it clears the threshold;
/// exact ties resolve to the preferred label, then alphabetically.
fn majority(
    shares: &BTreeMap<String, f64>,
    min_share: f64,
    preferred: Option<&str>,
) -> Option<String> {
    let top = shares.values().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !top.is_finite() || top < min_share {
        return None;
    }
    let mut tied: Vec<&String> = shares
        .iter()
        .filter(|(_, share)| (**share - top).abs() < 1e-12)
        .map(|(label, _)| label)
        .collect();
    tied.sort();
    if let Some(pref) = preferred {
        if let Some(hit) = tied.iter().find(|l| l.as_str() == pref) {
            return Some((*hit).clone());
        }
    }
    tied.first().map(|l| (*l).clone())
}

fn pick_currency(
    shares: &BTreeMap<String, f64>,
    options: &NormalizationOptions,
) -> DimensionPick {
    let preferred = options.target_currency.as_deref();
    if let Some(label) = majority(shares, options.min_majority_share, preferred) {
        return DimensionPick {
            reason: format!("currency {label} by majority"),
            label: Some(label),
        };
    }
    let (label, why) = match &options.tie_breakers.currency {
        CurrencyTieBreaker::PreferTargetCurrency => {
            (options.target_currency.clone(), "prefer-targetCurrency")
        }
        CurrencyTieBreaker::PreferBase => (
            options.fx_table().map(|(table, _)| table.base.clone()),
            "prefer-base",
        ),
        CurrencyTieBreaker::Explicit(list) => (
            list.iter()
                .find(|c| shares.contains_key(c.as_str()))
                .or_else(|| list.first())
                .cloned(),
            "explicit list",
        ),
    };
    DimensionPick {
        reason: format!("currency by tie-breaker ({why})"),
        label,
    }
}

fn pick_magnitude(
    shares: &BTreeMap<String, f64>,
    options: &NormalizationOptions,
) -> DimensionPick {
    let preferred = options.target_magnitude.map(|m| m.label());
    if let Some(label) = majority(shares, options.min_majority_share, preferred) {
        return DimensionPick {
            reason: format!("magnitude {label} by majority"),
            label: Some(label),
        };
    }
    let (label, why) = match &options.tie_breakers.magnitude {
        MagnitudeTieBreaker::PreferMillions => {
            (Some(Magnitude::Millions.label().to_string()), "prefer-millions")
        }
        MagnitudeTieBreaker::Explicit(list) => (
            list.iter()
                .find(|m| shares.contains_key(m.label()))
                .or_else(|| list.first())
                .map(|m| m.label().to_string()),
            "explicit list",
        ),
    };
    DimensionPick {
        reason: format!("magnitude by tie-breaker ({why})"),
        label,
    }
}

fn pick_time(shares: &BTreeMap<String, f64>, options: &NormalizationOptions) -> DimensionPick {
    let preferred = options.target_time_scale.map(|t| t.label());
    if let Some(label) = majority(shares, options.min_majority_share, preferred) {
        return DimensionPick {
            reason: format!("time {label} by majority"),
            label: Some(label),
        };
    }
    let (label, why) = match &options.tie_breakers.time {
        TimeTieBreaker::PreferMonth => (Some(TimeScale::Month.label().to_string()), "prefer-month"),
        TimeTieBreaker::Explicit(list) => (
            list.iter()
                .find(|t| shares.contains_key(t.label()))
                .or_else(|| list.first())
                .map(|t| t.label().to_string()),
            "explicit list",
        ),
    };
    DimensionPick {
        reason: format!("time by tie-breaker ({why})"),
        label,
    }
}

/// Derive the conversion target for one group.
///
/// Items with an unknown semantic type never participate in share
/// computations. Dimensions outside `auto_target_dimensions` come straight
/// from the configured target.
pub fn select_target(
    key: &str,
    dims: &[SourceDims],
    options: &NormalizationOptions,
) -> TargetSelection {
    let voting: Vec<&SourceDims> = dims
        .iter()
        .filter(|d| d.semantic != UnitSemanticType::Unknown)
        .collect();

    let currency_labels: Vec<Option<String>> = voting
        .iter()
        .map(|d| d.currency.as_ref().map(|c| c.to_uppercase()))
        .collect();
    let magnitude_labels: Vec<Option<String>> = voting
        .iter()
        .map(|d| d.magnitude.map(|m| m.label().to_string()))
        .collect();
    let time_labels: Vec<Option<String>> = voting
        .iter()
        .map(|d| d.time.map(|t| t.label().to_string()))
        .collect();

    let shares = TargetShares {
        currency: shares_of(&currency_labels),
        magnitude: shares_of(&magnitude_labels),
        time: shares_of(&time_labels),
    };

    let mut reasons: Vec<String> = Vec::new();
    let mut selected = SelectedTarget::default();

    if options.auto_target_dimensions.contains(&TargetDimension::Currency) {
        let pick = pick_currency(&shares.currency, options);
        reasons.push(pick.reason);
        selected.currency = pick.label;
    } else {
        selected.currency = options.target_currency.clone();
        if selected.currency.is_some() {
            reasons.push("currency from configuration".to_string());
        }
    }

    if options.auto_target_dimensions.contains(&TargetDimension::Magnitude) {
        let pick = pick_magnitude(&shares.magnitude, options);
        reasons.push(pick.reason);
        selected.magnitude = pick.label.as_deref().and_then(Magnitude::parse_label);
    } else {
        selected.magnitude = options.target_magnitude;
        if selected.magnitude.is_some() {
            reasons.push("magnitude from configuration".to_string());
        }
    }

    if options.auto_target_dimensions.contains(&TargetDimension::Time) {
        let pick = pick_time(&shares.time, options);
        reasons.push(pick.reason);
        selected.time = pick.label.as_deref().and_then(TimeScale::parse_label);
    } else {
        selected.time = options.target_time_scale;
        if selected.time.is_some() {
            reasons.push("time from configuration".to_string());
        }
    }

    TargetSelection {
        mode: TargetMode::AutoByIndicator,
        indicator_key: key.to_string(),
        selected,
        shares,
        reason: reasons.join("; "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn dims(
        currency: Option<&str>,
        magnitude: Option<Magnitude>,
        time: Option<TimeScale>,
    ) -> SourceDims {
        SourceDims {
            currency: currency.map(str::to_string),
            magnitude,
            time,
            semantic: UnitSemanticType::CurrencyAmount,
        }
    }

    fn base_options() -> NormalizationOptions {
        NormalizationOptions {
            target_currency: Some("USD".to_string()),
            auto_target_by_indicator: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_majority_wins() {
        let group = [
            dims(Some("usd"), Some(Magnitude::Millions), Some(TimeScale::Month)),
            dims(Some("USD"), Some(Magnitude::Millions), Some(TimeScale::Month)),
            dims(Some("EUR"), Some(Magnitude::Millions), Some(TimeScale::Quarter)),
        ];
        let selection = select_target("Balance of Trade", &group, &base_options());
        assert_eq!(selection.selected.currency.as_deref(), Some("USD"));
        assert_eq!(selection.selected.magnitude, Some(Magnitude::Millions));
        assert_eq!(selection.selected.time, Some(TimeScale::Month));
        // Labels are case-normalized before counting
        assert!((selection.shares.currency["USD"] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_below_threshold_falls_to_tie_breaker() {
        let mut options = base_options();
        options.min_majority_share = 0.8;
        let group = [
            dims(Some("USD"), Some(Magnitude::Millions), Some(TimeScale::Month)),
            dims(Some("EUR"), Some(Magnitude::Thousands), Some(TimeScale::Quarter)),
        ];
        let selection = select_target("k", &group, &options);
        // prefer-targetCurrency synthesizes USD; prefer-millions; prefer-month
        assert_eq!(selection.selected.currency.as_deref(), Some("USD"));
        assert_eq!(selection.selected.magnitude, Some(Magnitude::Millions));
        assert_eq!(selection.selected.time, Some(TimeScale::Month));
        assert!(selection.reason.contains("tie-breaker"));
    }

    #[test]
    fn test_exact_tie_prefers_target_then_alphabetical() {
        let group = [
            dims(Some("GBP"), None, None),
            dims(Some("EUR"), None, None),
        ];
        // Tie at 0.5 each, threshold 0.5: preference applies within the tie
        let mut options = base_options();
        options.target_currency = Some("GBP".to_string());
        let selection = select_target("k", &group, &options);
        assert_eq!(selection.selected.currency.as_deref(), Some("GBP"));

        // No preference among the tied labels: alphabetical
        options.target_currency = Some("USD".to_string());
        let selection = select_target("k", &group, &options);
        assert_eq!(selection.selected.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_unknown_items_do_not_vote() {
        let mut unknown = dims(Some("JPY"), Some(Magnitude::Billions), None);
        unknown.semantic = UnitSemanticType::Unknown;
        let group = [
            dims(Some("USD"), Some(Magnitude::Millions), Some(TimeScale::Month)),
            unknown,
        ];
        let selection = select_target("k", &group, &base_options());
        assert!(!selection.shares.currency.contains_key("JPY"));
        assert_eq!(selection.selected.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_non_auto_dimensions_use_configuration() {
        let mut options = base_options();
        options.auto_target_dimensions =
            HashSet::from([TargetDimension::Magnitude, TargetDimension::Time]);
        options.target_currency = Some("USD".to_string());
        let group = [
            dims(Some("EUR"), Some(Magnitude::Millions), Some(TimeScale::Month)),
            dims(Some("EUR"), Some(Magnitude::Millions), Some(TimeScale::Month)),
        ];
        let selection = select_target("k", &group, &options);
        // Currency is not auto-derived: explicit configuration wins
        assert_eq!(selection.selected.currency.as_deref(), Some("USD"));
        assert_eq!(selection.selected.magnitude, Some(Magnitude::Millions));
    }

    #[test]
    fn test_selected_label_comes_from_group_unless_synthesized() {
        let group = [
            dims(Some("EUR"), None, None),
            dims(Some("EUR"), None, None),
            dims(Some("GBP"), None, None),
        ];
        let selection = select_target("k", &group, &base_options());
        let chosen = selection.selected.currency.clone().unwrap();
        assert!(selection.shares.currency.contains_key(&chosen));
    }
}
