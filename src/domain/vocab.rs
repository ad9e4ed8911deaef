use std::fmt;

use serde::{Deserialize, Serialize};

/// Magnitude tier of a reported value.
///
/// Factors are exact powers of 1000 except `Hundreds`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Magnitude {
    Ones,
    Hundreds,
    Thousands,
    Millions,
    Billions,
    Trillions,
}

impl Magnitude {
    pub const ALL: [Magnitude; 6] = [
        Magnitude::Ones,
        Magnitude::Hundreds,
        Magnitude::Thousands,
        Magnitude::Millions,
        Magnitude::Billions,
        Magnitude::Trillions,
    ];

    pub fn factor(&self) -> f64 {
        match self {
            Magnitude::Ones => 1.0,
            Magnitude::Hundreds => 1e2,
            Magnitude::Thousands => 1e3,
            Magnitude::Millions => 1e6,
            Magnitude::Billions => 1e9,
            Magnitude::Trillions => 1e12,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Magnitude::Ones => "ones",
            Magnitude::Hundreds => "hundreds",
            Magnitude::Thousands => "thousands",
            Magnitude::Millions => "millions",
            Magnitude::Billions => "billions",
            Magnitude::Trillions => "trillions",
        }
    }

    /// Label used when composing a normalized unit string ("USD Million per month").
    pub fn unit_label(&self) -> &'static str {
        match self {
            Magnitude::Ones => "",
            Magnitude::Hundreds => "Hundred",
            Magnitude::Thousands => "Thousand",
            Magnitude::Millions => "Million",
            Magnitude::Billions => "Billion",
            Magnitude::Trillions => "Trillion",
        }
    }

    /// Case-insensitive, singular/plural-tolerant label parsing.
    ///
    /// Accepts the word forms plus the common "mn"/"bn"/"tn"/"trn" abbreviations
    /// found in source unit strings.
    pub fn parse_label(s: &str) -> Option<Self> {
        let t = s.trim().to_ascii_lowercase();
        let t = t.strip_suffix('s').unwrap_or(&t);
        match t {
            "one" | "unit" => Some(Magnitude::Ones),
            "hundred" => Some(Magnitude::Hundreds),
            "thousand" => Some(Magnitude::Thousands),
            "million" | "mn" | "mln" => Some(Magnitude::Millions),
            "billion" | "bn" | "bln" => Some(Magnitude::Billions),
            "trillion" | "tn" | "trn" => Some(Magnitude::Trillions),
            _ => None,
        }
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Time basis of a reported flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeScale {
    pub const ALL: [TimeScale; 6] = [
        TimeScale::Hour,
        TimeScale::Day,
        TimeScale::Week,
        TimeScale::Month,
        TimeScale::Quarter,
        TimeScale::Year,
    ];

    /// Fixed day-count model used for every time rescale.
    pub const DAY_COUNT_MODEL: &'static str =
        "year=365, quarter=91.25, month=30.4375, week=7, day=1, hour=1/24";

    pub fn days(&self) -> f64 {
        match self {
            TimeScale::Hour => 1.0 / 24.0,
            TimeScale::Day => 1.0,
            TimeScale::Week => 7.0,
            TimeScale::Month => 30.4375,
            TimeScale::Quarter => 91.25,
            TimeScale::Year => 365.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeScale::Hour => "hour",
            TimeScale::Day => "day",
            TimeScale::Week => "week",
            TimeScale::Month => "month",
            TimeScale::Quarter => "quarter",
            TimeScale::Year => "year",
        }
    }

    /// Accepts both period nouns ("month") and periodicity adjectives ("Monthly").
    pub fn parse_label(s: &str) -> Option<Self> {
        let t = s.trim().to_ascii_lowercase();
        let t = t.strip_suffix('s').unwrap_or(&t);
        match t {
            "hour" | "hourly" | "hr" => Some(TimeScale::Hour),
            "day" | "daily" => Some(TimeScale::Day),
            "week" | "weekly" | "wk" => Some(TimeScale::Week),
            "month" | "monthly" | "mo" => Some(TimeScale::Month),
            "quarter" | "quarterly" | "qtr" => Some(TimeScale::Quarter),
            "year" | "yearly" | "annual" | "annually" | "annum" | "yr" => Some(TimeScale::Year),
            _ => None,
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Structural category emitted by the unit parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    Currency,
    Composite,
    Percentage,
    Index,
    Physical,
    Energy,
    Count,
    Population,
    Rate,
    Ratio,
    Time,
    Temperature,
    Unknown,
}

/// Coarse semantic label emitted by the unit semantic classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitSemanticType {
    Percentage,
    Index,
    Count,
    CurrencyAmount,
    Physical,
    Rate,
    Ratio,
    Duration,
    Unknown,
}

impl UnitSemanticType {
    /// Two semantic types are compatible iff they are equal and neither is unknown.
    pub fn compatible(self, other: UnitSemanticType) -> bool {
        if self == UnitSemanticType::Unknown || other == UnitSemanticType::Unknown {
            return false;
        }
        self == other
    }
}

/// Fine-grained indicator type governing the normalization rulebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    Stock,
    Balance,
    Capacity,
    Gap,
    Threshold,
    Flow,
    Volume,
    Count,
    Percentage,
    Rate,
    Ratio,
    Share,
    Spread,
    Yield,
    Price,
    Index,
    Correlation,
    Elasticity,
    Multiplier,
    Volatility,
    Duration,
    Probability,
    Sentiment,
    Allocation,
    Score,
    Other,
}

impl IndicatorType {
    pub const ALL: [IndicatorType; 26] = [
        IndicatorType::Stock,
        IndicatorType::Balance,
        IndicatorType::Capacity,
        IndicatorType::Gap,
        IndicatorType::Threshold,
        IndicatorType::Flow,
        IndicatorType::Volume,
        IndicatorType::Count,
        IndicatorType::Percentage,
        IndicatorType::Rate,
        IndicatorType::Ratio,
        IndicatorType::Share,
        IndicatorType::Spread,
        IndicatorType::Yield,
        IndicatorType::Price,
        IndicatorType::Index,
        IndicatorType::Correlation,
        IndicatorType::Elasticity,
        IndicatorType::Multiplier,
        IndicatorType::Volatility,
        IndicatorType::Duration,
        IndicatorType::Probability,
        IndicatorType::Sentiment,
        IndicatorType::Allocation,
        IndicatorType::Score,
        IndicatorType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::Stock => "stock",
            IndicatorType::Balance => "balance",
            IndicatorType::Capacity => "capacity",
            IndicatorType::Gap => "gap",
            IndicatorType::Threshold => "threshold",
            IndicatorType::Flow => "flow",
            IndicatorType::Volume => "volume",
            IndicatorType::Count => "count",
            IndicatorType::Percentage => "percentage",
            IndicatorType::Rate => "rate",
            IndicatorType::Ratio => "ratio",
            IndicatorType::Share => "share",
            IndicatorType::Spread => "spread",
            IndicatorType::Yield => "yield",
            IndicatorType::Price => "price",
            IndicatorType::Index => "index",
            IndicatorType::Correlation => "correlation",
            IndicatorType::Elasticity => "elasticity",
            IndicatorType::Multiplier => "multiplier",
            IndicatorType::Volatility => "volatility",
            IndicatorType::Duration => "duration",
            IndicatorType::Probability => "probability",
            IndicatorType::Sentiment => "sentiment",
            IndicatorType::Allocation => "allocation",
            IndicatorType::Score => "score",
            IndicatorType::Other => "other",
        }
    }
}

impl std::str::FromStr for IndicatorType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let t = s.trim().to_ascii_lowercase();
        IndicatorType::ALL
            .iter()
            .find(|v| v.as_str() == t)
            .copied()
            .ok_or_else(|| format!("unrecognized indicator type: {s}"))
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broad grouping of indicator kinds assigned by the family stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicatorFamily {
    PhysicalFundamental,
    NumericMeasurement,
    PriceValue,
    ChangeMovement,
    CompositeDerived,
    Temporal,
    Qualitative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportingFrequency {
    Daily,
    Monthly,
    Quarterly,
    Annual,
    PointInTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeBasis {
    PerPeriod,
    PointInTime,
    Cumulative,
}

/// Evidence source used by the time-inference stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeSource {
    Units,
    Periodicity,
    TimeSeries,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemporalAggregation {
    PointInTime,
    PeriodRate,
    PeriodCumulative,
    PeriodAverage,
    PeriodTotal,
    NotApplicable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_factors() {
        assert_eq!(Magnitude::Ones.factor(), 1.0);
        assert_eq!(Magnitude::Hundreds.factor(), 100.0);
        assert_eq!(Magnitude::Millions.factor(), 1_000_000.0);
        assert_eq!(Magnitude::Trillions.factor(), 1e12);
    }

    #[test]
    fn test_magnitude_label_parsing() {
        assert_eq!(Magnitude::parse_label("Thousand"), Some(Magnitude::Thousands));
        assert_eq!(Magnitude::parse_label("thousands"), Some(Magnitude::Thousands));
        assert_eq!(Magnitude::parse_label("bn"), Some(Magnitude::Billions));
        assert_eq!(Magnitude::parse_label("widgets"), None);
    }

    #[test]
    fn test_time_scale_label_parsing() {
        assert_eq!(TimeScale::parse_label("Monthly"), Some(TimeScale::Month));
        assert_eq!(TimeScale::parse_label("annual"), Some(TimeScale::Year));
        assert_eq!(TimeScale::parse_label("Quarterly"), Some(TimeScale::Quarter));
        assert_eq!(TimeScale::parse_label("fortnight"), None);
    }

    #[test]
    fn test_day_count_model() {
        assert_eq!(TimeScale::Month.days(), 30.4375);
        assert_eq!(TimeScale::Quarter.days(), 91.25);
        assert!((TimeScale::Quarter.days() / TimeScale::Month.days() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_semantic_compatibility_excludes_unknown() {
        assert!(UnitSemanticType::Count.compatible(UnitSemanticType::Count));
        assert!(!UnitSemanticType::Count.compatible(UnitSemanticType::Percentage));
        assert!(!UnitSemanticType::Unknown.compatible(UnitSemanticType::Unknown));
    }

    #[test]
    fn test_indicator_type_round_trip() {
        for ty in IndicatorType::ALL {
            assert_eq!(ty.as_str().parse::<IndicatorType>().unwrap(), ty);
        }
    }
}
