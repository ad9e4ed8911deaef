//! Domain router: decides which per-domain policy applies to an item.
//!
//! Rule order is load-bearing: emissions/energy/commodity units often contain
//! currency substrings ("USD/barrel"), so those registries are consulted
//! before anything currency-shaped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{DataPoint, Domain, UnitCategory};
use crate::units::ParsedUnit;

use super::options::NormalizationOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub domain: Domain,
    pub rule: &'static str,
}

static EMISSIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:co2e?|carbon|emissions?|[mk]tco2e?|kt\s+of\s+co2|greenhouse)\b")
        .expect("emissions pattern must compile")
});

static ENERGY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:[gmkt]wh|gigawatt|megawatt|kilowatt|terajoules?|tj|gj|btu|joules?|ktoe|mtoe|toe|boe|barrels?\s+of\s+oil\s+equivalent)\b")
        .expect("energy pattern must compile")
});

static COMMODITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:barrels?|bbl|crude|brent|wti|natural\s+gas|gasoline|coal|troy\s+ounces?|bushels?)\b")
        .expect("commodity pattern must compile")
});

static AGRICULTURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:wheat|corn|maize|soybeans?|sugar|coffee|cocoa|cotton|rice|barley|oats|livestock|cattle|hogs)\b")
        .expect("agriculture pattern must compile")
});

static METALS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:gold|silver|copper|platinum|palladium|alumini?um|zinc|nickel|tin|iron\s+ore|steel|lithium)\b")
        .expect("metals pattern must compile")
});

static CRYPTO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:btc|bitcoin|eth|ethereum|satoshis?|crypto\w*)\b")
        .expect("crypto pattern must compile")
});

static COUNT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:arrivals?|departures?|population|persons?\s+employed|registrations?|permits?|subscribers?|households?)\b")
        .expect("count name pattern must compile")
});

static WAGES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:wages?|salar(?:y|ies)|earnings|compensation|pay)\b")
        .expect("wages pattern must compile")
});

/// Whether an indicator name belongs to the wage family.
pub fn is_wage_name(name: &str) -> bool {
    WAGES_RE.is_match(name)
}

pub fn route(
    point: &DataPoint,
    parsed: &ParsedUnit,
    options: &NormalizationOptions,
) -> RouteDecision {
    if options.exemptions.is_exempt(point) {
        return RouteDecision {
            domain: Domain::Exempt,
            rule: "exemption config",
        };
    }

    if EMISSIONS_RE.is_match(&point.unit) || EMISSIONS_RE.is_match(&point.name) {
        return RouteDecision {
            domain: Domain::Emissions,
            rule: "emissions registry",
        };
    }

    if ENERGY_RE.is_match(&point.unit) {
        return RouteDecision {
            domain: Domain::Energy,
            rule: "energy unit pattern",
        };
    }

    if COMMODITY_RE.is_match(&point.unit) || COMMODITY_RE.is_match(&point.name) {
        return RouteDecision {
            domain: Domain::Commodities,
            rule: "commodity pattern",
        };
    }

    if AGRICULTURE_RE.is_match(&point.unit) || AGRICULTURE_RE.is_match(&point.name) {
        return RouteDecision {
            domain: Domain::Agriculture,
            rule: "agriculture pattern",
        };
    }

    if METALS_RE.is_match(&point.unit) || METALS_RE.is_match(&point.name) {
        return RouteDecision {
            domain: Domain::Metals,
            rule: "metals pattern",
        };
    }

    if CRYPTO_RE.is_match(&point.unit) || CRYPTO_RE.is_match(&point.name) {
        return RouteDecision {
            domain: Domain::Crypto,
            rule: "crypto pattern",
        };
    }

    if parsed.category == UnitCategory::Index {
        return RouteDecision {
            domain: Domain::Index,
            rule: "category==index",
        };
    }

    if parsed.category == UnitCategory::Time {
        return RouteDecision {
            domain: Domain::Duration,
            rule: "category==time",
        };
    }

    // Strict ratio: an explicit quotient with no time denominator.
    if (parsed.is_composite && parsed.time_scale.is_none())
        || parsed.category == UnitCategory::Ratio
    {
        return RouteDecision {
            domain: Domain::Ratios,
            rule: "composite without time denominator",
        };
    }

    if matches!(parsed.category, UnitCategory::Count | UnitCategory::Population)
        || COUNT_NAME_RE.is_match(&point.name)
    {
        return RouteDecision {
            domain: Domain::Counts,
            rule: "count vocabulary",
        };
    }

    if parsed.category == UnitCategory::Percentage {
        return RouteDecision {
            domain: Domain::Percentages,
            rule: "category==percentage",
        };
    }

    if WAGES_RE.is_match(&point.name) {
        return RouteDecision {
            domain: Domain::Wages,
            rule: "wage name pattern",
        };
    }

    RouteDecision {
        domain: Domain::Monetary,
        rule: "default monetary flow",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::parse;

    fn decide(name: &str, unit: &str) -> Domain {
        let point = DataPoint::new("id", name, 1.0, unit);
        let parsed = parse(unit);
        route(&point, &parsed, &NormalizationOptions::default()).domain
    }

    #[test]
    fn test_registry_domains_win_over_currency() {
        // Currency substring in the unit must not capture these
        assert_eq!(decide("Crude Oil Price", "USD/barrel"), Domain::Commodities);
        assert_eq!(decide("Electricity Price", "USD/MWh"), Domain::Energy);
        assert_eq!(decide("CO2 Emissions", "kt of CO2"), Domain::Emissions);
        assert_eq!(decide("Gold Reserves", "USD Million"), Domain::Metals);
    }

    #[test]
    fn test_category_routing() {
        assert_eq!(decide("Stock Market", "points"), Domain::Index);
        assert_eq!(decide("Inflation Rate", "percent"), Domain::Percentages);
        assert_eq!(decide("Maternity Leave", "Days"), Domain::Duration);
        assert_eq!(decide("House Price to Income", "times"), Domain::Ratios);
    }

    #[test]
    fn test_counts() {
        assert_eq!(decide("Tourist Arrivals", "Thousand"), Domain::Counts);
        assert_eq!(decide("Employed Persons", "persons"), Domain::Counts);
    }

    #[test]
    fn test_wages_and_monetary() {
        assert_eq!(decide("Minimum Wages", "USD/hour"), Domain::Wages);
        assert_eq!(decide("Average Salaries", "EUR/Month"), Domain::Wages);
        assert_eq!(decide("Balance of Trade", "USD Million/Month"), Domain::Monetary);
        assert_eq!(decide("Government Debt", "EUR Billion"), Domain::Monetary);
    }

    #[test]
    fn test_exemption_overrides_everything() {
        let mut options = NormalizationOptions::default();
        options.exemptions.indicator_names = vec!["crude".to_string()];
        let point = DataPoint::new("id", "Crude Oil Price", 80.0, "USD/barrel");
        let parsed = parse("USD/barrel");
        let decision = route(&point, &parsed, &options);
        assert_eq!(decision.domain, Domain::Exempt);
    }

    #[test]
    fn test_strict_ratio_needs_no_time_denominator() {
        // Composite with time denominator is a flow, not a ratio
        assert_eq!(decide("Balance of Trade", "USD/quarter"), Domain::Monetary);
    }
}
