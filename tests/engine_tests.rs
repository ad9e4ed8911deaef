// End-to-end normalization engine scenarios.

use std::collections::{HashMap, HashSet};

use indicator_ops::domain::{Domain, IndicatorType, Magnitude, TimeScale};
use indicator_ops::engine::{NormalizationOptions, TargetDimension};
use indicator_ops::{DataPoint, FxTable, NormalizationEngine};

fn fx_table(rates: &[(&str, f64)]) -> FxTable {
    let rates: HashMap<String, f64> = rates
        .iter()
        .map(|(code, rate)| (code.to_string(), *rate))
        .collect();
    FxTable::new("USD", rates)
}

#[test]
fn balance_of_trade_auto_target() {
    let options = NormalizationOptions {
        target_currency: Some("USD".to_string()),
        auto_target_by_indicator: true,
        auto_target_dimensions: HashSet::from([TargetDimension::Magnitude, TargetDimension::Time]),
        min_majority_share: 0.6,
        fx_fallback: Some(fx_table(&[("EUR", 0.92), ("GBP", 0.79)])),
        ..Default::default()
    };
    let engine = NormalizationEngine::new(options).unwrap();

    let data = vec![
        DataPoint::new("USA", "Balance of Trade", 100.0, "USD million/month"),
        DataPoint::new("GBR", "Balance of Trade", 50.0, "GBP million/month"),
        DataPoint::new("DEU", "Balance of Trade", 200.0, "EUR million/quarter"),
    ];
    let outcome = engine.process(&data).unwrap();
    assert_eq!(outcome.data.len(), 3);

    let usa = &outcome.data[0];
    let gbr = &outcome.data[1];
    let deu = &outcome.data[2];

    assert!((usa.normalized - 100.0).abs() < 1e-3);
    assert!((gbr.normalized - 63.291).abs() < 1e-3);
    assert!((deu.normalized - 72.464).abs() < 1e-3);

    for item in &outcome.data {
        assert_eq!(item.normalized_unit, "USD Million per month");
    }

    // Target derivation: currency explicit from configuration, magnitude and
    // time by majority.
    let selection = usa
        .explain
        .as_ref()
        .unwrap()
        .target_selection
        .as_ref()
        .unwrap();
    assert_eq!(selection.selected.currency.as_deref(), Some("USD"));
    assert_eq!(selection.selected.magnitude, Some(Magnitude::Millions));
    assert_eq!(selection.selected.time, Some(TimeScale::Month));
    assert!((selection.shares.magnitude["millions"] - 1.0).abs() < 1e-12);
    assert!((selection.shares.time["month"] - 2.0 / 3.0).abs() < 1e-12);

    // DEU's chain: fx then time, and the product reproduces the value
    let explain = deu.explain.as_ref().unwrap();
    assert_eq!(explain.conversion.steps.len(), 2);
    let product: f64 = explain.conversion.steps.iter().map(|s| s.factor).product();
    assert!((deu.point.value * product - deu.normalized).abs() < 1e-9);
    assert!((explain.time.as_ref().unwrap().factor - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn wages_pipeline_filters_index_items() {
    let options = NormalizationOptions {
        target_currency: Some("USD".to_string()),
        target_time_scale: Some(TimeScale::Month),
        exclude_index_values: Some(true),
        fx_fallback: Some(fx_table(&[("ARS", 350.0), ("VEF", 248_832.0)])),
        ..Default::default()
    };
    let engine = NormalizationEngine::new(options).unwrap();

    let data = vec![
        DataPoint::new("ARG", "Wages", 1_674_890.75, "ARS/Month"),
        DataPoint::new("VEN", "Wages", 13_000_000.0, "VEF/Month"),
        DataPoint::new("CRI", "Wages", 6_225.77, "points"),
        DataPoint::new("USA", "Wages", 7.25, "USD/hour"),
    ];
    let outcome = engine.process(&data).unwrap();

    // CRI is filtered out; survivors keep input order
    assert_eq!(outcome.data.len(), 3);
    let ids: Vec<&str> = outcome.data.iter().map(|d| d.point.id.as_str()).collect();
    assert_eq!(ids, vec!["ARG", "VEN", "USA"]);
    assert_eq!(outcome.metrics.skipped, 1);

    for item in &outcome.data {
        assert_eq!(item.normalized_unit, "USD per month");
        assert_eq!(item.explain.as_ref().unwrap().domain, Domain::Wages);
    }

    let arg = &outcome.data[0];
    assert!((arg.normalized - 1_674_890.75 / 350.0).abs() < 1e-6);

    let usa = &outcome.data[2];
    assert!((usa.normalized - 7.25 * 730.5).abs() < 1e-9);
}

#[test]
fn count_scale_outlier_flagged_value_still_emitted() {
    let engine = NormalizationEngine::new(NormalizationOptions::default()).unwrap();
    let data = vec![
        DataPoint::new("ARG", "Tourist Arrivals", 520_394.0, "Thousand"),
        DataPoint::new("BRA", "Tourist Arrivals", 6_774.0, "Thousand"),
        DataPoint::new("VNM", "Tourist Arrivals", 1_467.0, "Thousand"),
        DataPoint::new("GRC", "Tourist Arrivals", 875.0, "Thousand"),
        DataPoint::new("MEX", "Tourist Arrivals", 3_200.0, "Thousand"),
    ];
    let outcome = engine.process(&data).unwrap();
    assert_eq!(outcome.data.len(), 5);

    let arg = &outcome.data[0];
    assert_eq!(arg.normalized, 5.20394e8);
    let explain = arg.explain.as_ref().unwrap();
    assert_eq!(explain.domain, Domain::Counts);
    assert!(explain
        .quality_warnings
        .iter()
        .any(|w| w.message.contains("dominant")));
    // Counts never touch currency
    assert!(explain.fx.is_none());
    assert!(explain.currency.is_none());

    for other in &outcome.data[1..] {
        assert!(other.explain.as_ref().unwrap().quality_warnings.is_empty());
        assert_eq!(other.normalized, other.point.value * 1000.0);
    }
}

#[test]
fn percentages_never_scaled_or_converted() {
    let options = NormalizationOptions {
        target_currency: Some("USD".to_string()),
        target_magnitude: Some(Magnitude::Millions),
        fx_fallback: Some(fx_table(&[("EUR", 0.92)])),
        ..Default::default()
    };
    let engine = NormalizationEngine::new(options).unwrap();

    let data = vec![
        DataPoint::new("USA", "Deposit Interest Rate", 3.5, "percent")
            .with_indicator_type(IndicatorType::Rate),
        DataPoint::new("EUR", "Deposit Interest Rate", 4.1, "percent")
            .with_indicator_type(IndicatorType::Rate),
    ];
    let outcome = engine.process(&data).unwrap();

    for item in &outcome.data {
        assert_eq!(item.normalized, item.point.value);
        assert_eq!(item.normalized_unit, "%");
        let explain = item.explain.as_ref().unwrap();
        assert_eq!(explain.domain, Domain::Percentages);
        assert!(explain.currency.is_none());
        assert!(explain.magnitude.is_none());
        assert!(explain.fx.is_none());
        assert!(explain.conversion.steps.is_empty());
    }
}

#[test]
fn exempt_indicators_pass_through_untouched() {
    let mut options = NormalizationOptions {
        target_currency: Some("USD".to_string()),
        fx_fallback: Some(fx_table(&[("EUR", 0.92)])),
        ..Default::default()
    };
    options.exemptions.indicator_ids = vec!["special".to_string()];
    let engine = NormalizationEngine::new(options).unwrap();

    let data = vec![DataPoint::new("special", "Odd Series", 42.0, "EUR Million")];
    let outcome = engine.process(&data).unwrap();
    let item = &outcome.data[0];
    assert_eq!(item.normalized, 42.0);
    let explain = item.explain.as_ref().unwrap();
    assert!(explain.exempted);
    assert_eq!(explain.domain, Domain::Exempt);
    assert!(explain.fx.is_none());
}

#[test]
fn stock_type_converts_currency_but_not_time() {
    let options = NormalizationOptions {
        target_currency: Some("USD".to_string()),
        target_time_scale: Some(TimeScale::Month),
        fx_fallback: Some(fx_table(&[("EUR", 0.92)])),
        ..Default::default()
    };
    let engine = NormalizationEngine::new(options).unwrap();

    let data = vec![DataPoint::new("DEU", "Government Debt", 100.0, "EUR Billion")
        .with_indicator_type(IndicatorType::Stock)
        .with_periodicity("Quarterly")];
    let outcome = engine.process(&data).unwrap();
    let item = &outcome.data[0];

    // FX applied, time left alone, and the unit carries no per-period suffix
    assert!((item.normalized - 100.0 / 0.92).abs() < 1e-9);
    assert_eq!(item.normalized_unit, "USD Billion");
    let explain = item.explain.as_ref().unwrap();
    assert!(explain.fx.is_some());
    assert!(explain.time.is_none());
}
