//! Magnitude-tier and time-basis rescaling.
//!
//! Time rescaling uses the fixed day-count model published in
//! [`TimeScale::DAY_COUNT_MODEL`]; the factor converts a per-`from` flow into
//! a per-`to` flow.

use crate::domain::{IndicatorOpsError, Magnitude, Result, TimeScale};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescaled {
    pub value: f64,
    pub factor: f64,
}

pub fn rescale_magnitude(value: f64, from: Magnitude, to: Magnitude) -> Rescaled {
    let factor = from.factor() / to.factor();
    Rescaled {
        value: value * factor,
        factor,
    }
}

pub fn rescale_time(value: f64, from: TimeScale, to: TimeScale) -> Rescaled {
    let factor = to.days() / from.days();
    Rescaled {
        value: value * factor,
        factor,
    }
}

/// Parse a magnitude label at a string boundary, failing with `UnknownTier`.
pub fn magnitude_from_label(label: &str) -> Result<Magnitude> {
    Magnitude::parse_label(label).ok_or_else(|| IndicatorOpsError::UnknownTier {
        label: label.to_string(),
    })
}

/// Parse a time-scale label at a string boundary, failing with `UnknownTier`.
pub fn time_from_label(label: &str) -> Result<TimeScale> {
    TimeScale::parse_label(label).ok_or_else(|| IndicatorOpsError::UnknownTier {
        label: label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_magnitude_rescale() {
        let r = rescale_magnitude(520_394.0, Magnitude::Thousands, Magnitude::Ones);
        assert_eq!(r.factor, 1000.0);
        assert_eq!(r.value, 520_394_000.0);

        let down = rescale_magnitude(1_500_000.0, Magnitude::Ones, Magnitude::Millions);
        assert_eq!(down.value, 1.5);
    }

    #[test]
    fn test_magnitude_identity() {
        let r = rescale_magnitude(42.0, Magnitude::Millions, Magnitude::Millions);
        assert_eq!(r.factor, 1.0);
        assert_eq!(r.value, 42.0);
    }

    #[test]
    fn test_quarter_to_month_is_exactly_one_third() {
        let r = rescale_time(200.0, TimeScale::Quarter, TimeScale::Month);
        assert!((r.factor - 1.0 / 3.0).abs() < 1e-12);
        assert!((r.value - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_hour_to_month() {
        let r = rescale_time(7.25, TimeScale::Hour, TimeScale::Month);
        // 30.4375 days * 24 hours
        assert!((r.factor - 730.5).abs() < 1e-9);
        assert!((r.value - 7.25 * 730.5).abs() < 1e-9);
    }

    #[test]
    fn test_time_round_trip() {
        let there = rescale_time(100.0, TimeScale::Month, TimeScale::Year);
        let back = rescale_time(there.value, TimeScale::Year, TimeScale::Month);
        assert!((back.value - 100.0).abs() / 100.0 < 1e-12);
    }

    #[test]
    fn test_unknown_tier_errors() {
        assert_matches!(
            magnitude_from_label("zillions"),
            Err(IndicatorOpsError::UnknownTier { .. })
        );
        assert_matches!(
            time_from_label("fortnightly"),
            Err(IndicatorOpsError::UnknownTier { .. })
        );
        assert_eq!(magnitude_from_label("Thousand").unwrap(), Magnitude::Thousands);
        assert_eq!(time_from_label("Quarterly").unwrap(), TimeScale::Quarter);
    }
}
