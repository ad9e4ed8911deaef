//! Unit parser: free-form unit label -> deterministic [`ParsedUnit`].
//!
//! Total function; anything unrecognized comes back as `category: Unknown`.

use serde::{Deserialize, Serialize};

use crate::domain::{Magnitude, TimeScale, UnitCategory, UnitSemanticType};

use super::patterns;

/// Deterministic parse of a unit label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<Magnitude>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_scale: Option<TimeScale>,

    pub category: UnitCategory,
    pub is_composite: bool,
    pub normalized: String,

    /// Special monetary phrase ("purchasing-power-parity", "national-currency")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special: Option<String>,
}

impl ParsedUnit {
    fn unknown(normalized: String) -> Self {
        Self {
            currency: None,
            magnitude: None,
            time_scale: None,
            category: UnitCategory::Unknown,
            is_composite: false,
            normalized,
            special: None,
        }
    }
}

/// Parse plus match metadata, shared with the semantic classifier.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub unit: ParsedUnit,
    pub semantic: UnitSemanticType,
    pub confidence: f64,
    pub matched: Option<String>,
}

impl ParseOutcome {
    fn unknown(normalized: String) -> Self {
        Self {
            unit: ParsedUnit::unknown(normalized),
            semantic: UnitSemanticType::Unknown,
            confidence: 0.0,
            matched: None,
        }
    }
}

pub fn parse(s: &str) -> ParsedUnit {
    parse_detailed(s).unit
}

pub fn parse_detailed(raw: &str) -> ParseOutcome {
    let s = raw.trim();
    if s.is_empty() {
        return ParseOutcome::unknown(String::new());
    }

    let lower = s.to_lowercase();
    let currency = patterns::detect_currency_code(s);
    let magnitude = patterns::detect_magnitude(s);
    let time_scale = patterns::detect_time_suffix(s);
    let special = patterns::detect_special_phrase(s).map(str::to_string);

    if let Some(m) = patterns::first_match(&patterns::PERCENTAGE, s) {
        return from_rule(m, &lower, None, None, None, None);
    }

    if let Some(m) = patterns::first_match(&patterns::INDEX, s) {
        return from_rule(m, &lower, None, None, None, None);
    }

    // Price-per-unit composite: currency code plus an explicit denominator.
    if currency.is_some() && (s.contains('/') || lower.contains(" per ")) {
        let denom = denominator(&lower).unwrap_or_default();
        let denom_label = time_scale
            .map(|t| t.label().to_string())
            .unwrap_or_else(|| denom.clone());
        let code = currency.clone().unwrap_or_default();
        let normalized = match magnitude {
            Some(mag) if mag != Magnitude::Ones => {
                format!("{} {} per {}", code, mag.unit_label().to_lowercase(), denom_label)
            }
            _ => format!("{code} per {denom_label}"),
        };
        return ParseOutcome {
            unit: ParsedUnit {
                currency,
                magnitude,
                time_scale,
                category: UnitCategory::Composite,
                is_composite: true,
                normalized,
                special,
            },
            semantic: UnitSemanticType::Rate,
            confidence: 0.9,
            matched: Some("price-per-unit".to_string()),
        };
    }

    if let Some(m) = patterns::first_match(&patterns::RATE, s) {
        return from_rule(m, &lower, None, None, time_scale, None);
    }

    if let Some(m) = patterns::first_match(&patterns::DURATION, s) {
        return from_rule(m, &lower, None, None, None, None);
    }

    if let Some(m) = patterns::first_match(&patterns::RATIO, s) {
        return from_rule(m, &lower, None, None, None, None);
    }

    if let Some(m) = patterns::first_match(&patterns::PHYSICAL, s) {
        return from_rule(m, &lower, None, magnitude, time_scale, None);
    }

    // Currency amount: a code, a currency word, or a special monetary phrase.
    if currency.is_some() || patterns::has_currency_word(s) {
        let confidence = if currency.is_some() { 0.95 } else { 0.85 };
        let normalized = match (&currency, magnitude) {
            (Some(code), Some(mag)) if mag != Magnitude::Ones => {
                format!("{} {}", code, mag.unit_label().to_lowercase())
            }
            (Some(code), _) => code.clone(),
            (None, _) => lower.clone(),
        };
        return ParseOutcome {
            unit: ParsedUnit {
                currency,
                magnitude,
                time_scale,
                category: UnitCategory::Currency,
                is_composite: false,
                normalized,
                special,
            },
            semantic: UnitSemanticType::CurrencyAmount,
            confidence,
            matched: Some("currency-amount".to_string()),
        };
    }

    if let Some(m) = patterns::first_match(&patterns::COUNT, s) {
        return from_rule(m, &lower, None, magnitude, time_scale, None);
    }

    ParseOutcome::unknown(lower)
}

fn from_rule(
    compiled: &patterns::CompiledRule,
    lower: &str,
    currency: Option<String>,
    magnitude: Option<Magnitude>,
    time_scale: Option<TimeScale>,
    special: Option<String>,
) -> ParseOutcome {
    let rule = compiled.rule;
    let normalized = rule
        .canonical
        .map(str::to_string)
        .unwrap_or_else(|| lower.to_string());
    ParseOutcome {
        unit: ParsedUnit {
            currency,
            magnitude,
            time_scale,
            category: rule.category,
            is_composite: false,
            normalized,
            special,
        },
        semantic: rule.semantic,
        confidence: rule.confidence,
        matched: Some(rule.name.to_string()),
    }
}

/// Text after the first "/" or " per " separator, lowercased and trimmed.
fn denominator(lower: &str) -> Option<String> {
    if let Some(idx) = lower.find(" per ") {
        return Some(lower[idx + 5..].trim().to_string());
    }
    lower
        .find('/')
        .map(|idx| lower[idx + 1..].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(parse("").category, UnitCategory::Unknown);
        assert_eq!(parse("   ").category, UnitCategory::Unknown);
    }

    #[test]
    fn test_percentage_forms() {
        for unit in ["%", "percent", "Percentage", "pct", "percent of GDP", "% of total"] {
            let parsed = parse(unit);
            assert_eq!(parsed.category, UnitCategory::Percentage, "unit: {unit}");
            assert_eq!(parsed.normalized, "%");
        }
    }

    #[test]
    fn test_index_forms() {
        for unit in ["points", "Index", "basis points", "bps", "Index (2015=100)"] {
            let parsed = parse(unit);
            assert_eq!(parsed.category, UnitCategory::Index, "unit: {unit}");
            assert_eq!(parsed.normalized, "points");
        }
    }

    #[test]
    fn test_price_per_unit_composite() {
        let parsed = parse("EUR/barrel");
        assert_eq!(parsed.category, UnitCategory::Composite);
        assert!(parsed.is_composite);
        assert_eq!(parsed.currency.as_deref(), Some("EUR"));
        assert_eq!(parsed.time_scale, None);
        assert_eq!(parsed.normalized, "EUR per barrel");
    }

    #[test]
    fn test_composite_with_time_denominator() {
        let parsed = parse("USD Million per month");
        assert_eq!(parsed.category, UnitCategory::Composite);
        assert_eq!(parsed.currency.as_deref(), Some("USD"));
        assert_eq!(parsed.magnitude, Some(Magnitude::Millions));
        assert_eq!(parsed.time_scale, Some(TimeScale::Month));

        let slash = parse("ARS/Month");
        assert_eq!(slash.currency.as_deref(), Some("ARS"));
        assert_eq!(slash.time_scale, Some(TimeScale::Month));
    }

    #[test]
    fn test_generic_rate() {
        let parsed = parse("per 1000 people");
        assert_eq!(parsed.category, UnitCategory::Rate);

        let capita = parse("USD per capita");
        // Currency present, so the composite rule wins first
        assert_eq!(capita.category, UnitCategory::Composite);

        let plain = parse("births per woman");
        assert_eq!(plain.category, UnitCategory::Rate);
    }

    #[test]
    fn test_duration_tokens() {
        assert_eq!(parse("Days").category, UnitCategory::Time);
        assert_eq!(parse("months").category, UnitCategory::Time);
        // Embedded duration words are not standalone duration units
        assert_ne!(parse("tonnes per year").category, UnitCategory::Time);
    }

    #[test]
    fn test_ratio_words() {
        for unit in ["times", "Ratio", "debt-to-income ratio", "Gini coefficient"] {
            assert_eq!(parse(unit).category, UnitCategory::Ratio, "unit: {unit}");
        }
    }

    #[test]
    fn test_physical_and_energy() {
        assert_eq!(parse("GWh").category, UnitCategory::Energy);
        assert_eq!(parse("Terajoules").category, UnitCategory::Energy);
        assert_eq!(parse("Celsius").category, UnitCategory::Temperature);
        assert_eq!(parse("mt").category, UnitCategory::Physical);
        // Standalone tonnage counts things
        assert_eq!(parse("Tonnes").category, UnitCategory::Count);
    }

    #[test]
    fn test_currency_amount() {
        let parsed = parse("USD Million");
        assert_eq!(parsed.category, UnitCategory::Currency);
        assert_eq!(parsed.currency.as_deref(), Some("USD"));
        assert_eq!(parsed.magnitude, Some(Magnitude::Millions));
        assert_eq!(parsed.normalized, "USD million");

        let word = parse("Billions of dollars");
        assert_eq!(word.category, UnitCategory::Currency);
        assert_eq!(word.currency, None);
        assert_eq!(word.magnitude, Some(Magnitude::Billions));

        let special = parse("National currency");
        assert_eq!(special.category, UnitCategory::Currency);
        assert_eq!(special.special.as_deref(), Some("national-currency"));
    }

    #[test]
    fn test_count_vocabulary() {
        assert_eq!(parse("Thousand").category, UnitCategory::Count);
        assert_eq!(parse("Thousand").magnitude, Some(Magnitude::Thousands));
        assert_eq!(parse("persons").category, UnitCategory::Population);
        assert_eq!(parse("Number of subscribers").category, UnitCategory::Count);
        assert_eq!(parse("dwellings").category, UnitCategory::Count);
    }

    #[test]
    fn test_unknown_fallback() {
        let parsed = parse("furlongs of whimsy");
        assert_eq!(parsed.category, UnitCategory::Unknown);
        assert_eq!(parsed.normalized, "furlongs of whimsy");
    }

    #[test]
    fn test_determinism() {
        let a = parse("USD Million per month");
        let b = parse("USD Million per month");
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalized_reparse_preserves_category() {
        for unit in [
            "% of GDP",
            "Index (2015=100)",
            "USD Million per month",
            "EUR/barrel",
            "per 1000 people",
            "Days",
            "times",
            "GWh",
            "USD Million",
            "Thousand",
            "Tourist arrivals",
        ] {
            let first = parse(unit);
            let second = parse(&first.normalized);
            assert_eq!(first.category, second.category, "unit: {unit}");
        }
    }
}
