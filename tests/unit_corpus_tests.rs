// Unit parser behavior over a corpus of real-world unit labels.
//
// The load-bearing property: re-parsing a parsed unit's normalized form never
// changes its category.

use pretty_assertions::assert_eq;

use indicator_ops::domain::UnitCategory;
use indicator_ops::units::{classify, parse};

/// Unit strings as they appear in real indicator feeds.
const CORPUS: &[&str] = &[
    // Percentages
    "%",
    "percent",
    "Percent",
    "percentage",
    "pct",
    "pp",
    "% of GDP",
    "percent of GDP",
    "Percent of GDP",
    "% of total",
    "percent of total",
    "Percent of total labor force",
    "% of gross national income",
    "Percent of GDP per annum",
    "% per annum",
    "percent per year",
    "Annual % growth",
    "% of merchandise exports",
    "% of population",
    "% of land area",
    "Percent of total employment",
    "% of government expenditure",
    "percent change",
    "% change year over year",
    "Percentage of households",
    // Index forms
    "points",
    "Points",
    "index",
    "Index",
    "Index (2015=100)",
    "Index (2010=100)",
    "index points",
    "basis points",
    "bps",
    "Index, 2000=100",
    "EMBI index",
    "volatility index points",
    "diffusion index",
    "PMI index points",
    // Currency amounts
    "USD",
    "EUR",
    "GBP",
    "JPY",
    "CHF",
    "USD Million",
    "USD Billion",
    "USD Thousand",
    "USD Trillion",
    "EUR Million",
    "EUR Billion",
    "EUR Thousand",
    "GBP Million",
    "GBP Billion",
    "JPY Billion",
    "JPY Trillion",
    "CNY Billion",
    "CNY Hundred Million",
    "CHF Million",
    "AUD Million",
    "CAD Million",
    "BRL Million",
    "INR Billion",
    "RUB Billion",
    "KRW Trillion",
    "MXN Thousand",
    "ZAR Million",
    "SEK Million",
    "NOK Billion",
    "TRY Thousand",
    "ARS Million",
    "IDR Billion",
    "THB Million",
    "PLN Million",
    "HUF Billion",
    "CZK Million",
    "ILS Million",
    "AED Billion",
    "SAR Billion",
    "current USD",
    "Current USD Million",
    "constant 2015 USD",
    "Millions of dollars",
    "Billions of dollars",
    "Thousands of euros",
    "billion yen",
    "million pounds",
    "National currency",
    "National currency Million",
    "Local currency units",
    "LCU Billion",
    "current LCU",
    "purchasing power parity",
    "PPP dollars",
    "International dollars (PPP)",
    "mn EUR",
    "bn USD",
    "EUR mn",
    "USD bn",
    // Composites: price-per-something
    "USD/barrel",
    "EUR/barrel",
    "USD per barrel",
    "USD/ounce",
    "USD per troy ounce",
    "USD/MWh",
    "EUR/MWh",
    "USD/tonne",
    "USD per metric ton",
    "USD/bushel",
    "USD/gallon",
    "USD per litre",
    "EUR/litre",
    "USD/kg",
    "USD per square meter",
    "EUR per square metre",
    "USD/hour",
    "EUR/hour",
    "USD per month",
    "EUR/Month",
    "ARS/Month",
    "VEF/Month",
    "BRL/Month",
    "CLP/Month",
    "GBP/week",
    "AUD/week",
    "USD Million per month",
    "USD million/month",
    "GBP million/month",
    "EUR million/quarter",
    "EUR Billion per quarter",
    "USD Billion per year",
    "JPY Billion/year",
    "USD Thousand per year",
    "USD per capita",
    "EUR per capita",
    "current USD per capita",
    "USD per person per day",
    // Rates
    "per 1000 people",
    "per 1,000 live births",
    "per 100,000 people",
    "per capita",
    "births per woman",
    "deaths per 1000 people",
    "per 1000 inhabitants",
    "cases per 100,000 population",
    "doctors per 1000 people",
    "vehicles per 1000 people",
    // Durations
    "Days",
    "days",
    "Months",
    "Years",
    "Weeks",
    "Hours",
    "quarters",
    "minutes",
    // Ratios
    "times",
    "ratio",
    "Ratio",
    "price to earnings ratio",
    "debt to equity ratio",
    "multiple",
    "Gini coefficient",
    "loan to value ratio",
    // Physical: energy
    "GWh",
    "MWh",
    "kWh",
    "TWh",
    "Terajoules",
    "TJ",
    "BTU",
    "ktoe",
    "Mtoe",
    "barrels of oil equivalent",
    "BOE",
    // Physical: volume, mass, distance, temperature
    "barrels",
    "bbl",
    "cubic meters",
    "m3",
    "litres",
    "liters",
    "gallons",
    "hectolitres",
    "mt",
    "kg",
    "kilograms",
    "grams",
    "kilometers",
    "km",
    "hectares",
    "acres",
    "sq. km",
    "square kilometers",
    "Celsius",
    "celsius",
    "km/h",
    // Counts
    "Thousand",
    "Thousands",
    "Million",
    "Hundred",
    "Thousand units",
    "Thousand persons",
    "Thousand people",
    "Million people",
    "persons",
    "Persons",
    "people",
    "inhabitants",
    "individuals",
    "Number of subscribers",
    "Number of companies",
    "Number of branches",
    "number of employees",
    "Total dwellings",
    "Tonnes",
    "tonnes",
    "tons",
    "Thousand tonnes",
    "Thousand Tonnes",
    "units",
    "Units",
    "companies",
    "households",
    "employees",
    "workers",
    "jobs",
    "vehicles",
    "cars",
    "dwellings",
    "permits",
    "cases",
    "arrivals",
    "departures",
    "visitors",
    "tourists",
    "subscribers",
    "subscriptions",
    "passengers",
    "students",
    "hospital beds",
    "transactions",
    "contracts",
    "claims",
    "applications",
    "registrations",
    "head",
    // Unknown / free text
    "n/a",
    "various",
    "see notes",
    "z-score",
    "furlongs of whimsy",
];

#[test]
fn corpus_is_large_enough_to_mean_something() {
    assert!(CORPUS.len() >= 200, "corpus has {} entries", CORPUS.len());
}

#[test]
fn normalization_is_category_idempotent() {
    for unit in CORPUS {
        let first = parse(unit);
        let second = parse(&first.normalized);
        assert_eq!(
            first.category, second.category,
            "category drifted for \"{unit}\": {:?} -> {:?} (normalized \"{}\")",
            first.category, second.category, first.normalized
        );
    }
}

#[test]
fn parsing_is_deterministic() {
    for unit in CORPUS {
        assert_eq!(parse(unit), parse(unit), "unit: {unit}");
    }
}

#[test]
fn every_parse_is_total() {
    for unit in CORPUS {
        // No panic, and unknown is an acceptable answer
        let _ = parse(unit);
        let classification = classify(unit);
        assert!(
            (0.0..=1.0).contains(&classification.confidence),
            "confidence out of range for \"{unit}\""
        );
    }
}

#[test]
fn known_sections_parse_to_expected_categories() {
    for unit in ["%", "percent of GDP", "% of total", "pct"] {
        assert_eq!(parse(unit).category, UnitCategory::Percentage, "{unit}");
    }
    for unit in ["points", "Index (2015=100)", "basis points", "bps"] {
        assert_eq!(parse(unit).category, UnitCategory::Index, "{unit}");
    }
    for unit in ["USD Million", "Billions of dollars", "National currency", "bn USD"] {
        assert_eq!(parse(unit).category, UnitCategory::Currency, "{unit}");
    }
    for unit in ["USD/barrel", "USD Million per month", "ARS/Month"] {
        assert_eq!(parse(unit).category, UnitCategory::Composite, "{unit}");
    }
    for unit in ["per 1000 people", "births per woman"] {
        assert_eq!(parse(unit).category, UnitCategory::Rate, "{unit}");
    }
    for unit in ["Days", "Months", "Years"] {
        assert_eq!(parse(unit).category, UnitCategory::Time, "{unit}");
    }
    for unit in ["times", "Gini coefficient", "debt to equity ratio"] {
        assert_eq!(parse(unit).category, UnitCategory::Ratio, "{unit}");
    }
    for unit in ["GWh", "Terajoules", "ktoe"] {
        assert_eq!(parse(unit).category, UnitCategory::Energy, "{unit}");
    }
    for unit in ["Thousand", "Tonnes", "Number of subscribers", "arrivals"] {
        assert_eq!(parse(unit).category, UnitCategory::Count, "{unit}");
    }
    for unit in ["persons", "people", "inhabitants"] {
        assert_eq!(parse(unit).category, UnitCategory::Population, "{unit}");
    }
    for unit in ["n/a", "furlongs of whimsy"] {
        assert_eq!(parse(unit).category, UnitCategory::Unknown, "{unit}");
    }
}

#[test]
fn currency_codes_never_match_inside_words() {
    // "scr" (Seychelles rupee) must not fire inside "subscribers",
    // "all" (Albanian lek) not inside lowercase prose.
    let parsed = parse("Number of subscribers");
    assert_eq!(parsed.category, UnitCategory::Count);
    assert_eq!(parsed.currency, None);

    let parsed = parse("total of all items");
    assert_eq!(parsed.currency, None);
}
