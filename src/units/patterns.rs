//! Declarative unit pattern registry.
//!
//! Each rule carries the regex source, the category/semantic labels it emits,
//! a confidence, and an optional canonical form. Rules are evaluated in
//! registry order; the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Magnitude, TimeScale, UnitCategory, UnitSemanticType};

#[derive(Debug)]
pub struct PatternRule {
    pub name: &'static str,
    pub pattern: &'static str,
    pub category: UnitCategory,
    pub semantic: UnitSemanticType,
    pub confidence: f64,
    /// Canonical normalized form; falls back to the lowercased input
    pub canonical: Option<&'static str>,
}

pub struct CompiledRule {
    pub rule: &'static PatternRule,
    pub regex: Regex,
}

macro_rules! rule {
    ($name:expr, $pattern:expr, $category:ident, $semantic:ident, $confidence:expr) => {
        PatternRule {
            name: $name,
            pattern: $pattern,
            category: UnitCategory::$category,
            semantic: UnitSemanticType::$semantic,
            confidence: $confidence,
            canonical: None,
        }
    };
    ($name:expr, $pattern:expr, $category:ident, $semantic:ident, $confidence:expr, $canonical:expr) => {
        PatternRule {
            name: $name,
            pattern: $pattern,
            category: UnitCategory::$category,
            semantic: UnitSemanticType::$semantic,
            confidence: $confidence,
            canonical: Some($canonical),
        }
    };
}

/// Percentage forms. Checked before everything else.
pub static PERCENTAGE_RULES: &[PatternRule] = &[
    rule!("percent-sign", r"%", Percentage, Percentage, 0.98, "%"),
    rule!("percent-word", r"(?i)\bpercent(?:age)?\b", Percentage, Percentage, 0.98, "%"),
    rule!("pct", r"(?i)\bpct\b", Percentage, Percentage, 0.95, "%"),
    rule!("percentage-points", r"(?i)\bpp\b", Percentage, Percentage, 0.9, "%"),
    rule!("share-of-aggregate", r"(?i)\bof\s+(?:gdp|total)\b", Percentage, Percentage, 0.9, "%"),
];

/// Index forms. "basis points" is checked before the bare "points" token.
pub static INDEX_RULES: &[PatternRule] = &[
    rule!("basis-points", r"(?i)\bbasis\s+points?\b", Index, Index, 0.95, "points"),
    rule!("bps", r"(?i)\bbps\b", Index, Index, 0.95, "points"),
    rule!("points", r"(?i)\bpoints?\b", Index, Index, 0.95, "points"),
    rule!("index-word", r"(?i)\bindex\b", Index, Index, 0.95, "points"),
];

/// Generic per-population / per-denominator rates.
pub static RATE_RULES: &[PatternRule] = &[
    rule!(
        "per-population",
        r"(?i)\bper\s+\d[\d,.]*\s*(?:people|persons?|inhabitants?|population|live\s+births|births|women)\b",
        Rate,
        Rate,
        0.95
    ),
    rule!("per-capita", r"(?i)\bper\s+capita\b", Rate, Rate, 0.95),
    rule!(
        "per-unit-of-population",
        r"(?i)\bper\s+(?:person|woman|employee|household|worker|student|doctor|nurse)\b",
        Rate,
        Rate,
        0.9
    ),
    rule!("slash-denominator", r"/\s*\d", Rate, Rate, 0.85),
];

/// Standalone duration tokens. Anchored: the whole unit must be the token.
pub static DURATION_RULES: &[PatternRule] = &[rule!(
    "duration-token",
    r"(?i)^\s*(?:minutes?|hours?|days?|weeks?|months?|quarters?|years?)\s*$",
    Time,
    Duration,
    0.95
)];

pub static RATIO_RULES: &[PatternRule] = &[
    rule!("times", r"(?i)\btimes\b", Ratio, Ratio, 0.9),
    rule!("ratio-word", r"(?i)\bratio\b", Ratio, Ratio, 0.95),
    rule!("multiple", r"(?i)\bmultiple\b", Ratio, Ratio, 0.85),
    rule!("coefficient", r"(?i)\bcoefficient\b", Ratio, Ratio, 0.85),
];

/// Physical units. Energy tokens first so they land in the energy category.
pub static PHYSICAL_RULES: &[PatternRule] = &[
    rule!(
        "energy",
        r"(?i)\b(?:[gmkt]wh|gigawatt|megawatt|kilowatt|terajoules?|tj|gj|btu|joules?|ktoe|mtoe|toe|barrels?\s+of\s+oil\s+equivalent|boe)\b",
        Energy,
        Physical,
        0.9
    ),
    rule!(
        "temperature",
        r"(?i)\b(?:celsius|fahrenheit|kelvin)\b|°",
        Temperature,
        Physical,
        0.9
    ),
    rule!(
        "volume",
        r"(?i)\b(?:barrels?|bbl|cubic\s+(?:met(?:er|re)s?|feet)|m3|lit(?:er|re)s?|gallons?|hectolit(?:er|re)s?)\b",
        Physical,
        Physical,
        0.9
    ),
    rule!(
        "distance-area-weight-speed",
        r"(?i)\b(?:kilomet(?:er|re)s?|km|miles?|met(?:er|re)s?|hectares?|acres?|sq\.?\s?km|square\s+(?:kilomet|met)(?:er|re)s?|kilograms?|kg|grams?|mt|km/h|mph|knots?)\b",
        Physical,
        Physical,
        0.85
    ),
];

/// Count vocabulary. Catch-all confidence 0.9.
///
/// "tonnes"/"tons" deliberately live here, not under physical: a standalone
/// tonnage unit is a quantity of things being counted, while "mt" stays
/// physical (metric tons).
pub static COUNT_RULES: &[PatternRule] = &[
    rule!(
        "population",
        r"(?i)\b(?:persons?|people|inhabitants?|individuals?)\b",
        Population,
        Count,
        0.9
    ),
    rule!(
        "count-prefix",
        r"(?i)^\s*(?:number\s+of|count\s+of|total)\b",
        Count,
        Count,
        0.9
    ),
    rule!(
        "bare-scale-word",
        r"(?i)^\s*(?:hundreds?|thousands?|millions?|billions?|trillions?)\s*$",
        Count,
        Count,
        0.9
    ),
    rule!(
        "count-vocabulary",
        r"(?i)\b(?:units?|tonnes?|tons?|companies|firms?|households?|employees?|workers?|jobs|vehicles?|cars?|houses?|dwellings?|permits?|cases?|arrivals?|departures?|visitors?|tourists?|subscribers?|subscriptions?|passengers?|students?|schools?|hospitals?|beds?|branches|transactions?|contracts?|claims?|applications?|registrations?|establishments?|enterprises?|head)\b",
        Count,
        Count,
        0.9
    ),
];

fn compile(rules: &'static [PatternRule]) -> Vec<CompiledRule> {
    rules
        .iter()
        .map(|rule| CompiledRule {
            rule,
            regex: Regex::new(rule.pattern).expect("static unit pattern must compile"),
        })
        .collect()
}

pub static PERCENTAGE: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(PERCENTAGE_RULES));
pub static INDEX: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(INDEX_RULES));
pub static RATE: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(RATE_RULES));
pub static DURATION: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(DURATION_RULES));
pub static RATIO: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(RATIO_RULES));
pub static PHYSICAL: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(PHYSICAL_RULES));
pub static COUNT: Lazy<Vec<CompiledRule>> = Lazy::new(|| compile(COUNT_RULES));

pub fn first_match<'a>(rules: &'a [CompiledRule], s: &str) -> Option<&'a CompiledRule> {
    rules.iter().find(|c| c.regex.is_match(s))
}

// Currency codes matched case-insensitively. Word-bounded so that e.g. "scr"
// inside "subscribers" never matches.
const SAFE_CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CNY", "CHF", "AUD", "NZD", "CAD", "SEK", "NOK", "DKK", "PLN",
    "CZK", "HUF", "RUB", "INR", "BRL", "MXN", "ZAR", "KRW", "TWD", "SGD", "HKD", "THB", "IDR",
    "MYR", "VND", "ARS", "CLP", "COP", "UYU", "BOB", "PYG", "VEF", "VES", "CRC", "GTQ", "HNL",
    "NIO", "DOP", "JMD", "TTD", "BBD", "BSD", "XCD", "AWG", "ANG", "KYD", "BMD", "BZD", "GYD",
    "SRD", "UAH", "BYN", "KZT", "UZS", "AZN", "AMD", "TJS", "KGS", "TMT", "MNT", "AFN", "PKR",
    "BDT", "LKR", "NPR", "BTN", "MMK", "KHR", "MVR", "BND", "PGK", "FJD", "WST", "VUV", "SBD",
    "XPF", "TND", "DZD", "LYD", "EGP", "SDG", "ETB", "KES", "TZS", "UGX", "RWF", "BIF", "DJF",
    "ERN", "SSP", "NGN", "GHS", "XOF", "XAF", "GMD", "GNF", "LRD", "SLL", "STN", "CVE", "MRU",
    "AOA", "ZMW", "MWK", "MZN", "BWP", "SZL", "LSL", "MUR", "SCR", "MGA", "KMF", "ZWL", "IRR",
    "IQD", "SYP", "LBP", "JOD", "ILS", "AED", "QAR", "KWD", "BHD", "OMR", "YER", "ISK", "RON",
    "BGN", "HRK", "RSD", "MKD", "MDL", "HTG", "CUC", "BTC", "ETH",
];

// Codes that collide with English words; matched only in uppercase.
const AMBIGUOUS_CURRENCY_CODES: &[&str] = &[
    "ALL", "TRY", "CUP", "TOP", "PHP", "GEL", "PEN", "MAD", "SOS", "BAM", "LAK", "MOP", "NAD",
    "SAR",
];

static SAFE_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = SAFE_CURRENCY_CODES.join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("currency code pattern must compile")
});

static AMBIGUOUS_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = AMBIGUOUS_CURRENCY_CODES.join("|");
    Regex::new(&format!(r"\b({alternation})\b")).expect("currency code pattern must compile")
});

static CURRENCY_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:dollars?|euros?|pounds?|yen|yuan|renminbi|francs?|rupees?|rupiah|pesos?|rubles?|roubles?|dirhams?|zloty|forint|baht|ringgit|dong|taka|hryvnia|tenge|shekels?)\b",
    )
    .expect("currency word pattern must compile")
});

static SPECIAL_CURRENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:national|local)\s+currency\b|\blcu\b|\bpurchasing\s+power\s+parity\b|\bppp\b")
        .expect("special currency pattern must compile")
});

static SCALE_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(hundreds?|thousands?|millions?|billions?|trillions?|mln|bln|mn|bn|trn|tn)\b")
        .expect("scale word pattern must compile")
});

static TIME_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bper\b|/)\s*(hour|hr|day|week|wk|month|mo|quarter|qtr|year|yr|annum)s?\b")
        .expect("time suffix pattern must compile")
});

static PER_ANNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bp\.?\s?a\.?\b").expect("per annum pattern must compile"));

/// Word-bounded currency code lookup, uppercased on return.
pub fn detect_currency_code(s: &str) -> Option<String> {
    if let Some(m) = SAFE_CODE_RE.captures(s) {
        return Some(m[1].to_ascii_uppercase());
    }
    AMBIGUOUS_CODE_RE.captures(s).map(|m| m[1].to_string())
}

pub fn has_currency_word(s: &str) -> bool {
    CURRENCY_WORD_RE.is_match(s) || SPECIAL_CURRENCY_RE.is_match(s)
}

/// Special monetary phrases that imply currency denomination without a code.
pub fn detect_special_phrase(s: &str) -> Option<&'static str> {
    let lower = s.to_lowercase();
    if lower.contains("purchasing power parity") || lower.contains("ppp") {
        return Some("purchasing-power-parity");
    }
    if lower.contains("national currency")
        || lower.contains("local currency")
        || lower.contains("lcu")
    {
        return Some("national-currency");
    }
    None
}

/// Scale token embedded in the unit string, if any.
pub fn detect_magnitude(s: &str) -> Option<Magnitude> {
    SCALE_WORD_RE
        .captures(s)
        .and_then(|m| Magnitude::parse_label(&m[1]))
}

/// "per X" / "/X" time suffix, if any.
pub fn detect_time_suffix(s: &str) -> Option<TimeScale> {
    if let Some(m) = TIME_SUFFIX_RE.captures(s) {
        return TimeScale::parse_label(&m[1]);
    }
    if PER_ANNUM_RE.is_match(s) {
        return Some(TimeScale::Year);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_bounded_currency_codes() {
        assert_eq!(detect_currency_code("USD Million"), Some("USD".to_string()));
        assert_eq!(detect_currency_code("eur/barrel"), Some("EUR".to_string()));
        // "scr" inside a longer word never matches
        assert_eq!(detect_currency_code("subscribers"), None);
        assert_eq!(detect_currency_code("Thousand subscribers"), None);
    }

    #[test]
    fn test_ambiguous_codes_require_uppercase() {
        assert_eq!(detect_currency_code("TRY Million"), Some("TRY".to_string()));
        assert_eq!(detect_currency_code("try again"), None);
        assert_eq!(detect_currency_code("ALL Billion"), Some("ALL".to_string()));
        assert_eq!(detect_currency_code("all items"), None);
    }

    #[test]
    fn test_scale_and_time_detection() {
        assert_eq!(detect_magnitude("USD Million per month"), Some(Magnitude::Millions));
        assert_eq!(detect_magnitude("EUR bn"), Some(Magnitude::Billions));
        assert_eq!(detect_magnitude("points"), None);

        assert_eq!(detect_time_suffix("USD Million per month"), Some(TimeScale::Month));
        assert_eq!(detect_time_suffix("ARS/Month"), Some(TimeScale::Month));
        assert_eq!(detect_time_suffix("GBP million/quarter"), Some(TimeScale::Quarter));
        assert_eq!(detect_time_suffix("USD p.a."), Some(TimeScale::Year));
        assert_eq!(detect_time_suffix("USD Million"), None);
    }

    #[test]
    fn test_first_match_order() {
        let matched = first_match(&INDEX, "basis points").unwrap();
        assert_eq!(matched.rule.name, "basis-points");
    }
}
