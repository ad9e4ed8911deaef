//! Per-domain conversion pipelines.
//!
//! Every non-identity transformation appends a step to the conversion trace,
//! so the chain of step factors always reproduces the normalized value from
//! the original one.

use tracing::debug;

use crate::convert::{rescale_magnitude, rescale_time, FxConverter, FxTable};
use crate::domain::{
    ConversionStep, ConversionTrace, CurrencyChange, DataPoint, Domain, ExplainRecord, FxExplain,
    FxSource, Magnitude, MagnitudeChange, NormalizedDataPoint, QualityWarning,
    QualityWarningKind, TargetSelection, TimeChange, TimeScale, UnitSemanticType,
};
use crate::units::{rulebook, ParsedUnit, TypeRules};

use super::options::NormalizationOptions;
use super::router::RouteDecision;

/// Source dimensions resolved for one item, after precedence rules.
#[derive(Debug, Clone)]
pub struct SourceDims {
    pub currency: Option<String>,
    pub magnitude: Option<Magnitude>,
    pub time: Option<TimeScale>,
    pub semantic: UnitSemanticType,
}

/// Resolve an item's source dimensions.
///
/// Precedence: caller currency wins over the parsed one; caller scale wins
/// only when the unit string itself carries no scale token (a conflicting
/// unit-embedded token wins and is flagged); caller periodicity wins over the
/// unit's time suffix.
pub fn resolve_dims(
    point: &DataPoint,
    parsed: &ParsedUnit,
    semantic: UnitSemanticType,
) -> (SourceDims, Vec<QualityWarning>) {
    let mut warnings = Vec::new();

    let currency = point
        .currency_code
        .as_ref()
        .map(|c| c.to_uppercase())
        .or_else(|| parsed.currency.clone());

    let caller_scale = point.scale.as_deref().and_then(Magnitude::parse_label);
    if point.scale.is_some() && caller_scale.is_none() {
        warnings.push(QualityWarning::new(
            QualityWarningKind::ScaleConflict,
            format!(
                "scale hint \"{}\" is not a recognized tier",
                point.scale.as_deref().unwrap_or_default()
            ),
        ));
    }
    let magnitude = match (parsed.magnitude, caller_scale) {
        (Some(embedded), Some(caller)) if embedded != caller => {
            warnings.push(QualityWarning::new(
                QualityWarningKind::ScaleConflict,
                format!(
                    "scale hint {} disagrees with unit-embedded {}; unit wins",
                    caller.label(),
                    embedded.label()
                ),
            ));
            Some(embedded)
        }
        (Some(embedded), _) => Some(embedded),
        (None, caller) => caller,
    };

    let time = point
        .periodicity
        .as_deref()
        .and_then(TimeScale::parse_label)
        .or(parsed.time_scale);

    (
        SourceDims {
            currency,
            magnitude,
            time,
            semantic,
        },
        warnings,
    )
}

/// Conversion target in effect for one group.
#[derive(Debug, Clone, Default)]
pub struct EffectiveTarget {
    pub currency: Option<String>,
    pub magnitude: Option<Magnitude>,
    pub time: Option<TimeScale>,
}

impl EffectiveTarget {
    pub fn from_options(options: &NormalizationOptions) -> Self {
        Self {
            currency: options.target_currency.clone(),
            magnitude: options.target_magnitude,
            time: options.target_time_scale,
        }
    }

    pub fn from_selection(selection: &TargetSelection) -> Self {
        Self {
            currency: selection.selected.currency.clone(),
            magnitude: selection.selected.magnitude,
            time: selection.selected.time,
        }
    }
}

/// Everything the per-item conversion needs, fixed per group.
pub struct ConversionContext<'a> {
    pub options: &'a NormalizationOptions,
    pub fx: Option<(&'a FxTable, FxSource)>,
    pub target: EffectiveTarget,
    pub target_selection: Option<TargetSelection>,
}

/// Per-item result: normalized, or deliberately dropped (wages index filter,
/// quality filter).
pub enum ItemOutcome {
    Normalized(Box<NormalizedDataPoint>),
    Dropped { id: String, reason: String },
}

struct Chain {
    value: f64,
    steps: Vec<ConversionStep>,
}

impl Chain {
    fn new(value: f64) -> Self {
        Self {
            value,
            steps: Vec::new(),
        }
    }

    fn apply(&mut self, label: String, factor: f64) {
        let input = self.value;
        self.value = input * factor;
        self.steps.push(ConversionStep {
            label,
            factor,
            input,
            output: self.value,
        });
    }

    fn into_trace(self, from_unit: &str, to_unit: &str) -> ConversionTrace {
        let summary = if self.steps.is_empty() {
            format!("pass-through ({from_unit})")
        } else {
            let total: f64 = self.steps.iter().map(|s| s.factor).product();
            format!("{from_unit} -> {to_unit} (x{total:.9})")
        };
        ConversionTrace {
            summary,
            steps: self.steps,
        }
    }
}

/// Normalize one routed item.
pub fn normalize_item(
    point: &DataPoint,
    parsed: &ParsedUnit,
    dims: &SourceDims,
    decision: RouteDecision,
    ctx: &ConversionContext<'_>,
    mut warnings: Vec<QualityWarning>,
) -> ItemOutcome {
    let indicator_type = point
        .indicator_type
        .unwrap_or_else(|| implied_type(parsed, dims));
    let rules = rulebook::rules_for(Some(indicator_type));

    match decision.domain {
        Domain::Exempt => pass_through(point, parsed, decision, ctx, warnings),
        Domain::Index => {
            // Index-valued series inside a wage family carry no usable wage
            // level; the wages policy filters them by default.
            let exclude_index = ctx.options.exclude_index_values.unwrap_or(true);
            if exclude_index && super::router::is_wage_name(&point.name) {
                debug!(item = %point.id, "index-valued wage series excluded");
                return ItemOutcome::Dropped {
                    id: point.id.clone(),
                    reason: "index-valued item excluded from wage normalization".to_string(),
                };
            }
            pass_through(point, parsed, decision, ctx, warnings)
        }
        Domain::Percentages | Domain::Ratios | Domain::Duration => {
            pass_through(point, parsed, decision, ctx, warnings)
        }
        Domain::Emissions
        | Domain::Energy
        | Domain::Commodities
        | Domain::Agriculture
        | Domain::Metals
        | Domain::Crypto => physical_pass_through(point, parsed, dims, decision, rules, ctx, warnings),
        Domain::Counts => counts(point, dims, decision, rules, ctx, warnings),
        Domain::Wages => {
            let exclude_index = ctx.options.exclude_index_values.unwrap_or(true);
            if exclude_index && dims.semantic == UnitSemanticType::Index {
                debug!(item = %point.id, "wage item excluded: index-valued");
                return ItemOutcome::Dropped {
                    id: point.id.clone(),
                    reason: "index-valued item excluded from wage normalization".to_string(),
                };
            }
            wages(point, dims, decision, ctx, warnings)
        }
        Domain::Monetary => monetary(point, parsed, dims, decision, rules, ctx, &mut warnings),
    }
}

/// Parser-inferred type for items the caller left unclassified.
///
/// A currency-bearing composite is a monetary flow when the denominator is a
/// time period and a unit price otherwise; a plain currency amount with a
/// periodicity is likewise a flow.
fn implied_type(parsed: &ParsedUnit, dims: &SourceDims) -> crate::domain::IndicatorType {
    use crate::domain::IndicatorType;
    match dims.semantic {
        UnitSemanticType::Rate if parsed.currency.is_some() => {
            if parsed.time_scale.is_some() {
                IndicatorType::Flow
            } else {
                IndicatorType::Price
            }
        }
        UnitSemanticType::CurrencyAmount if dims.time.is_some() => IndicatorType::Flow,
        other => rulebook::implied_indicator_type(other),
    }
}

fn explain_base(decision: RouteDecision, warnings: Vec<QualityWarning>) -> ExplainRecord {
    ExplainRecord {
        domain: decision.domain,
        router: decision.rule.to_string(),
        exempted: decision.domain == Domain::Exempt,
        currency: None,
        magnitude: None,
        time: None,
        fx: None,
        target_selection: None,
        conversion: ConversionTrace::pass_through(""),
        quality_warnings: warnings,
    }
}

fn finish(
    point: &DataPoint,
    ctx: &ConversionContext<'_>,
    normalized: f64,
    normalized_unit: String,
    mut explain: ExplainRecord,
) -> ItemOutcome {
    explain.target_selection = ctx.target_selection.clone();
    let explain = ctx.options.explain.then_some(explain);
    ItemOutcome::Normalized(Box::new(NormalizedDataPoint {
        point: point.clone(),
        normalized,
        normalized_unit,
        explain,
    }))
}

/// Dimensionless domains: value untouched, annotation only. Never an FX or
/// magnitude step.
fn pass_through(
    point: &DataPoint,
    parsed: &ParsedUnit,
    decision: RouteDecision,
    ctx: &ConversionContext<'_>,
    warnings: Vec<QualityWarning>,
) -> ItemOutcome {
    let unit = canonical_unit(decision.domain, parsed, &point.unit);
    let mut explain = explain_base(decision, warnings);
    explain.conversion = ConversionTrace::pass_through(format!(
        "pass-through ({})",
        decision.domain
    ));
    finish(point, ctx, point.value, unit, explain)
}

/// Physical registries: pass-through value, but magnitude/time rescale are
/// allowed when the rulebook permits them. No FX.
fn physical_pass_through(
    point: &DataPoint,
    parsed: &ParsedUnit,
    dims: &SourceDims,
    decision: RouteDecision,
    rules: TypeRules,
    ctx: &ConversionContext<'_>,
    warnings: Vec<QualityWarning>,
) -> ItemOutcome {
    let mut chain = Chain::new(point.value);
    let mut explain = explain_base(decision, warnings);

    if rules.allow_magnitude {
        apply_magnitude(&mut chain, &mut explain, dims.magnitude, ctx.target.magnitude);
    }
    if rules.allow_time {
        apply_time(&mut chain, &mut explain, dims.time, ctx.target.time);
    }

    let unit = canonical_unit(decision.domain, parsed, &point.unit);
    let normalized = chain.value;
    explain.conversion = chain.into_trace(&point.unit, &unit);
    finish(point, ctx, normalized, unit, explain)
}

/// Counts: magnitude forced to ones; time conversion permitted for flow
/// counts; currency never attaches.
fn counts(
    point: &DataPoint,
    dims: &SourceDims,
    decision: RouteDecision,
    rules: TypeRules,
    ctx: &ConversionContext<'_>,
    warnings: Vec<QualityWarning>,
) -> ItemOutcome {
    let mut chain = Chain::new(point.value);
    let mut explain = explain_base(decision, warnings);

    apply_magnitude(&mut chain, &mut explain, dims.magnitude, Some(Magnitude::Ones));
    if rules.allow_time {
        apply_time(&mut chain, &mut explain, dims.time, ctx.target.time);
    }

    let time_suffix = explain
        .time
        .as_ref()
        .map(|t| t.normalized)
        .or(dims.time)
        .filter(|_| !rules.skip_time_in_unit);
    let unit = match time_suffix {
        Some(t) => format!("units per {}", t.label()),
        None => "units".to_string(),
    };
    let normalized = chain.value;
    explain.conversion = chain.into_trace(&point.unit, &unit);
    finish(point, ctx, normalized, unit, explain)
}

/// Wages: absolute money per period. Magnitude forced to ones, FX to the
/// target currency, time to the configured target (month by default).
fn wages(
    point: &DataPoint,
    dims: &SourceDims,
    decision: RouteDecision,
    ctx: &ConversionContext<'_>,
    mut warnings: Vec<QualityWarning>,
) -> ItemOutcome {
    let target_currency = ctx.target.currency.clone();
    let target_time = ctx.target.time.or(Some(TimeScale::Month));

    let mut chain = Chain::new(point.value);
    let mut explain = explain_base(decision, Vec::new());

    apply_magnitude(&mut chain, &mut explain, dims.magnitude, Some(Magnitude::Ones));

    let mut final_currency = dims.currency.clone();
    if let (Some(src), Some(dst)) = (dims.currency.as_deref(), target_currency.as_deref()) {
        if src != dst {
            match fx_factor(ctx, src, dst) {
                Ok(Some(quote)) => {
                    chain.apply(format!("fx {src}->{dst}"), quote.0);
                    explain.currency = Some(CurrencyChange {
                        original: Some(src.to_string()),
                        normalized: dst.to_string(),
                    });
                    explain.fx = Some(FxExplain {
                        rate: quote.0,
                        source: quote.1,
                        as_of: quote.2,
                    });
                    final_currency = Some(dst.to_string());
                }
                Ok(None) | Err(_) => {
                    // No usable rate: keep the source currency, convert time only.
                    warnings.push(QualityWarning::new(
                        QualityWarningKind::MissingFxRate,
                        format!("no FX rate from {src} to {dst}; kept {src}"),
                    ));
                }
            }
        }
    }

    apply_time(&mut chain, &mut explain, dims.time, target_time);

    let unit_currency = final_currency.unwrap_or_else(|| "LCU".to_string());
    let unit_time = explain
        .time
        .as_ref()
        .map(|t| t.normalized)
        .or(dims.time)
        .or(target_time);
    let unit = match unit_time {
        Some(t) => format!("{unit_currency} per {}", t.label()),
        None => unit_currency,
    };

    explain.quality_warnings = warnings;
    let normalized = chain.value;
    explain.conversion = chain.into_trace(&point.unit, &unit);
    finish(point, ctx, normalized, unit, explain)
}

/// Default monetary flow: FX, then magnitude, then time, each gated by the
/// rulebook.
fn monetary(
    point: &DataPoint,
    parsed: &ParsedUnit,
    dims: &SourceDims,
    decision: RouteDecision,
    rules: TypeRules,
    ctx: &ConversionContext<'_>,
    warnings: &mut Vec<QualityWarning>,
) -> ItemOutcome {
    let mut chain = Chain::new(point.value);
    let mut explain = explain_base(decision, Vec::new());
    let mut final_currency = dims.currency.clone();

    if rules.allow_currency {
        if let (Some(src), Some(dst)) = (dims.currency.as_deref(), ctx.target.currency.as_deref())
        {
            if src != dst {
                match fx_factor(ctx, src, dst) {
                    Ok(Some(quote)) => {
                        chain.apply(format!("fx {src}->{dst}"), quote.0);
                        explain.currency = Some(CurrencyChange {
                            original: Some(src.to_string()),
                            normalized: dst.to_string(),
                        });
                        explain.fx = Some(FxExplain {
                            rate: quote.0,
                            source: quote.1,
                            as_of: quote.2,
                        });
                        final_currency = Some(dst.to_string());
                    }
                    Ok(None) => {
                        warnings.push(QualityWarning::new(
                            QualityWarningKind::MissingFxRate,
                            format!("no FX table available for {src}->{dst}; value passed through"),
                        ));
                        explain.quality_warnings = std::mem::take(warnings);
                        return pass_through_with_explain(point, parsed, decision, ctx, explain);
                    }
                    Err(err) => {
                        warnings.push(QualityWarning::new(
                            QualityWarningKind::MissingFxRate,
                            err.to_string(),
                        ));
                        explain.quality_warnings = std::mem::take(warnings);
                        return pass_through_with_explain(point, parsed, decision, ctx, explain);
                    }
                }
            }
        }
    }

    if rules.allow_magnitude {
        let source = dims.magnitude.unwrap_or(Magnitude::Ones);
        apply_magnitude(&mut chain, &mut explain, Some(source), ctx.target.magnitude);
    }
    if rules.allow_time {
        apply_time(&mut chain, &mut explain, dims.time, ctx.target.time);
    }

    let final_magnitude = explain
        .magnitude
        .as_ref()
        .map(|m| m.normalized)
        .or(dims.magnitude)
        .unwrap_or(Magnitude::Ones);
    let final_time = explain
        .time
        .as_ref()
        .map(|t| t.normalized)
        .or(dims.time)
        .filter(|_| !rules.skip_time_in_unit);

    let unit = monetary_unit(
        final_currency.as_deref(),
        final_magnitude,
        final_time,
        parsed,
        &point.unit,
    );

    explain.quality_warnings = std::mem::take(warnings);
    let normalized = chain.value;
    explain.conversion = chain.into_trace(&point.unit, &unit);
    finish(point, ctx, normalized, unit, explain)
}

fn pass_through_with_explain(
    point: &DataPoint,
    parsed: &ParsedUnit,
    decision: RouteDecision,
    ctx: &ConversionContext<'_>,
    mut explain: ExplainRecord,
) -> ItemOutcome {
    explain.currency = None;
    explain.fx = None;
    let unit = canonical_unit(decision.domain, parsed, &point.unit);
    explain.conversion =
        ConversionTrace::pass_through(format!("pass-through ({})", decision.domain));
    finish(point, ctx, point.value, unit, explain)
}

fn apply_magnitude(
    chain: &mut Chain,
    explain: &mut ExplainRecord,
    source: Option<Magnitude>,
    target: Option<Magnitude>,
) {
    let (Some(from), Some(to)) = (source, target) else {
        return;
    };
    if from == to {
        return;
    }
    let rescaled = rescale_magnitude(1.0, from, to);
    chain.apply(
        format!("magnitude {}->{}", from.label(), to.label()),
        rescaled.factor,
    );
    explain.magnitude = Some(MagnitudeChange {
        original: from,
        normalized: to,
        factor: rescaled.factor,
    });
}

fn apply_time(
    chain: &mut Chain,
    explain: &mut ExplainRecord,
    source: Option<TimeScale>,
    target: Option<TimeScale>,
) {
    let (Some(from), Some(to)) = (source, target) else {
        return;
    };
    if from == to {
        return;
    }
    let rescaled = rescale_time(1.0, from, to);
    chain.apply(
        format!("time {}->{}", from.label(), to.label()),
        rescaled.factor,
    );
    explain.time = Some(TimeChange {
        original: from,
        normalized: to,
        factor: rescaled.factor,
        day_count_model: TimeScale::DAY_COUNT_MODEL.to_string(),
    });
}

fn fx_factor(
    ctx: &ConversionContext<'_>,
    from: &str,
    to: &str,
) -> crate::domain::Result<Option<(f64, FxSource, Option<String>)>> {
    let Some((table, source)) = ctx.fx else {
        return Ok(None);
    };
    let converter = FxConverter::new(source);
    let quote = converter.factor(from, to, table)?;
    Ok(Some((quote.factor, quote.source, quote.as_of)))
}

/// Canonical output unit for annotation-only domains.
fn canonical_unit(domain: Domain, parsed: &ParsedUnit, original: &str) -> String {
    match domain {
        Domain::Percentages => "%".to_string(),
        Domain::Index => "points".to_string(),
        _ => {
            if parsed.normalized.is_empty() {
                original.to_string()
            } else {
                parsed.normalized.clone()
            }
        }
    }
}

fn monetary_unit(
    currency: Option<&str>,
    magnitude: Magnitude,
    time: Option<TimeScale>,
    parsed: &ParsedUnit,
    original: &str,
) -> String {
    let Some(code) = currency else {
        // Without a currency the unit cannot be rebuilt; keep the parsed form.
        if parsed.normalized.is_empty() {
            return original.to_string();
        }
        return parsed.normalized.clone();
    };
    let mut unit = code.to_string();
    if magnitude != Magnitude::Ones {
        unit.push(' ');
        unit.push_str(magnitude.unit_label());
    }
    if let Some(t) = time {
        unit.push_str(" per ");
        unit.push_str(t.label());
    }
    unit
}
