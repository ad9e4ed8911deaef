//! Indicator-type rulebook: what each fine-grained type allows the
//! normalization engine to do.

use crate::domain::{IndicatorType, UnitSemanticType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRules {
    pub allow_time: bool,
    pub allow_magnitude: bool,
    pub allow_currency: bool,
    pub skip_time_in_unit: bool,
    pub description: &'static str,
}

const fn rules(
    allow_time: bool,
    allow_magnitude: bool,
    allow_currency: bool,
    skip_time_in_unit: bool,
    description: &'static str,
) -> TypeRules {
    TypeRules {
        allow_time,
        allow_magnitude,
        allow_currency,
        skip_time_in_unit,
        description,
    }
}

/// Exhaustive policy table over all indicator types.
pub fn rules_for(indicator_type: Option<IndicatorType>) -> TypeRules {
    match indicator_type.unwrap_or(IndicatorType::Other) {
        IndicatorType::Stock => rules(false, true, true, true, "outstanding amount at a point in time"),
        IndicatorType::Balance => rules(false, true, true, true, "net position, reported as a level"),
        IndicatorType::Capacity => rules(false, true, true, true, "maximum attainable level"),
        IndicatorType::Gap => rules(false, true, true, true, "difference between two levels"),
        IndicatorType::Threshold => rules(false, true, true, true, "policy or statistical cutoff level"),
        IndicatorType::Flow => rules(true, true, true, false, "amount per reporting period"),
        IndicatorType::Volume => rules(true, true, true, false, "quantity transacted per period"),
        IndicatorType::Count => rules(true, true, false, false, "number of discrete things"),
        IndicatorType::Percentage => rules(false, false, false, true, "share expressed in percent"),
        IndicatorType::Rate => rules(false, false, false, true, "normalized frequency or intensity"),
        IndicatorType::Ratio => rules(false, false, false, true, "dimensionless quotient"),
        IndicatorType::Share => rules(false, false, false, true, "fraction of a whole"),
        IndicatorType::Spread => rules(false, false, false, true, "difference between two rates"),
        IndicatorType::Yield => rules(false, false, false, true, "return rate"),
        IndicatorType::Price => rules(false, true, true, true, "price of one unit"),
        IndicatorType::Index => rules(false, false, false, true, "rebased composite, unitless"),
        IndicatorType::Correlation => rules(false, false, false, true, "statistical association"),
        IndicatorType::Elasticity => rules(false, false, false, true, "response sensitivity"),
        IndicatorType::Multiplier => rules(false, false, false, true, "amplification factor"),
        IndicatorType::Volatility => rules(false, false, false, true, "dispersion measure"),
        IndicatorType::Duration => rules(false, false, false, true, "length of time"),
        IndicatorType::Probability => rules(false, false, false, true, "likelihood in [0,1]"),
        IndicatorType::Sentiment => rules(false, false, false, true, "survey-derived mood measure"),
        IndicatorType::Allocation => rules(false, false, false, true, "portfolio or budget weight"),
        IndicatorType::Score => rules(false, false, false, true, "bounded composite score"),
        IndicatorType::Other => rules(true, true, true, false, "unclassified; full pipeline allowed"),
    }
}

/// Fallback type inferred from unit semantics when the caller provides none.
/// The caller-provided type always wins when present.
pub fn implied_indicator_type(semantic: UnitSemanticType) -> IndicatorType {
    match semantic {
        UnitSemanticType::Percentage => IndicatorType::Percentage,
        UnitSemanticType::Index => IndicatorType::Index,
        UnitSemanticType::Count => IndicatorType::Count,
        UnitSemanticType::Ratio => IndicatorType::Ratio,
        UnitSemanticType::Duration => IndicatorType::Duration,
        UnitSemanticType::Rate => IndicatorType::Rate,
        UnitSemanticType::CurrencyAmount
        | UnitSemanticType::Physical
        | UnitSemanticType::Unknown => IndicatorType::Other,
    }
}
