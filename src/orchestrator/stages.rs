//! The six classification stages: prompt builders, output schemas, and
//! parsers. Prompts feed forward everything earlier stages concluded.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::domain::{
    BooleanReviewResult, FamilyResult, FinalReviewResult, IndicatorDescriptor, NormalizationResult,
    StageName, TimeInferenceResult, TypeResult,
};

use super::schema::{fields, SchemaDescriptor, SchemaResult};

/// Accumulated prior stage outputs, fed into later prompts.
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    pub normalized: Option<NormalizationResult>,
    pub time: Option<TimeInferenceResult>,
    pub family: Option<FamilyResult>,
    pub type_result: Option<TypeResult>,
    pub review: Option<BooleanReviewResult>,
}

fn describe(descriptor: &IndicatorDescriptor) -> String {
    let mut lines = vec![
        format!("Indicator id: {}", descriptor.id),
        format!("Name: {}", descriptor.name),
    ];
    if let Some(units) = &descriptor.units_raw {
        lines.push(format!("Units: {units}"));
    }
    if let Some(long_name) = &descriptor.long_name {
        lines.push(format!("Long name: {long_name}"));
    }
    if let Some(periodicity) = &descriptor.periodicity {
        lines.push(format!("Declared periodicity: {periodicity}"));
    }
    if let Some(scale) = &descriptor.scale {
        lines.push(format!("Declared scale: {scale}"));
    }
    if let Some(currency) = &descriptor.currency_code {
        lines.push(format!("Currency code: {currency}"));
    }
    if let Some(source) = &descriptor.source_name {
        lines.push(format!("Source: {source}"));
    }
    if let Some(definition) = &descriptor.definition {
        lines.push(format!("Definition: {definition}"));
    }
    if !descriptor.sample_values.is_empty() {
        let samples: Vec<String> = descriptor
            .sample_values
            .iter()
            .rev()
            .take(10)
            .map(|s| format!("{}={}", s.date, s.value))
            .collect();
        lines.push(format!("Recent values: {}", samples.join(", ")));
    }
    lines.join("\n")
}

fn context_summary(ctx: &StageContext) -> String {
    let mut lines = Vec::new();
    if let Some(n) = &ctx.normalized {
        lines.push(format!(
            "Unit analysis: type={:?}, scale={}, currency={}",
            n.parsed_unit_type,
            n.normalized_scale,
            n.parsed_currency.as_deref().unwrap_or("none")
        ));
    }
    if let Some(t) = &ctx.time {
        lines.push(format!(
            "Time analysis: frequency={:?}, basis={:?}",
            t.reporting_frequency, t.time_basis
        ));
    }
    if let Some(f) = &ctx.family {
        lines.push(format!("Family: {:?}", f.family));
    }
    if let Some(ty) = &ctx.type_result {
        lines.push(format!(
            "Type: {} ({:?})",
            ty.indicator_type, ty.temporal_aggregation
        ));
    }
    if let Some(r) = &ctx.review {
        lines.push(format!(
            "Review: correct={}, flagged fields={:?}",
            r.is_correct, r.incorrect_fields
        ));
    }
    lines.join("\n")
}

// ---- Stage 1: unit normalization ----

pub static NORMALIZATION_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| SchemaDescriptor {
    name: "unit_normalization",
    schema: json!({
        "type": "object",
        "required": ["normalizedScale", "parsedUnitType", "parsingConfidence"],
        "properties": {
            "originalUnits": {"type": ["string", "null"]},
            "parsedScale": {"type": ["string", "null"]},
            "normalizedScale": {"enum": ["ones", "hundreds", "thousands", "millions", "billions", "trillions"]},
            "parsedUnitType": {"enum": ["percentage", "index", "count", "currency-amount", "physical", "rate", "ratio", "duration", "unknown"]},
            "parsedCurrency": {"type": ["string", "null"]},
            "parsingConfidence": {"type": "number", "minimum": 0, "maximum": 1},
            "matchedPattern": {"type": ["string", "null"]}
        }
    }),
});

pub fn normalization_prompt(descriptor: &IndicatorDescriptor) -> String {
    format!(
        "Analyze this economic indicator's units and report its unit semantics, \
         magnitude scale, and currency if any. Use the recent values to sanity-check \
         the scale.\n\n{}\n\nRespond with JSON matching the unit_normalization schema.",
        describe(descriptor)
    )
}

pub fn parse_normalization(value: &Value) -> SchemaResult<NormalizationResult> {
    Ok(NormalizationResult {
        original_units: fields::optional_str(value, "originalUnits"),
        parsed_scale: fields::optional_str(value, "parsedScale"),
        normalized_scale: fields::enum_value(value, "normalizedScale")?,
        parsed_unit_type: fields::enum_value(value, "parsedUnitType")?,
        parsed_currency: fields::optional_str(value, "parsedCurrency"),
        parsing_confidence: fields::require_confidence(value, "parsingConfidence")?,
        matched_pattern: fields::optional_str(value, "matchedPattern"),
    })
}

// ---- Stage 2: time inference ----

pub static TIME_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| SchemaDescriptor {
    name: "time_inference",
    schema: json!({
        "type": "object",
        "required": ["reportingFrequency", "timeBasis", "sourceUsed", "confidence", "reasoning"],
        "properties": {
            "reportingFrequency": {"enum": ["daily", "monthly", "quarterly", "annual", "point-in-time"]},
            "timeBasis": {"enum": ["per-period", "point-in-time", "cumulative"]},
            "sourceUsed": {"enum": ["units", "periodicity", "time-series", "unknown"]},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasoning": {"type": "string"}
        }
    }),
});

pub fn time_prompt(descriptor: &IndicatorDescriptor, ctx: &StageContext) -> String {
    format!(
        "Determine how this indicator relates to time: its reporting frequency, \
         whether values are per-period, point-in-time, or cumulative, and which \
         evidence you used (units, declared periodicity, or the time series itself).\n\n\
         {}\n\n{}\n\nRespond with JSON matching the time_inference schema.",
        describe(descriptor),
        context_summary(ctx)
    )
}

pub fn parse_time(value: &Value) -> SchemaResult<TimeInferenceResult> {
    Ok(TimeInferenceResult {
        reporting_frequency: fields::enum_value(value, "reportingFrequency")?,
        time_basis: fields::enum_value(value, "timeBasis")?,
        source_used: fields::enum_value(value, "sourceUsed")?,
        confidence: fields::require_confidence(value, "confidence")?,
        reasoning: fields::require_str(value, "reasoning")?.to_string(),
    })
}

// ---- Stage 3: family assignment ----

pub static FAMILY_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| SchemaDescriptor {
    name: "family_assignment",
    schema: json!({
        "type": "object",
        "required": ["family", "confidence", "reasoning"],
        "properties": {
            "family": {"enum": ["physical-fundamental", "numeric-measurement", "price-value", "change-movement", "composite-derived", "temporal", "qualitative"]},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasoning": {"type": "string"}
        }
    }),
});

pub fn family_prompt(descriptor: &IndicatorDescriptor, ctx: &StageContext) -> String {
    format!(
        "Assign this indicator to exactly one family: physical-fundamental, \
         numeric-measurement, price-value, change-movement, composite-derived, \
         temporal, or qualitative.\n\n{}\n\n{}\n\n\
         Respond with JSON matching the family_assignment schema.",
        describe(descriptor),
        context_summary(ctx)
    )
}

pub fn parse_family(value: &Value) -> SchemaResult<FamilyResult> {
    Ok(FamilyResult {
        family: fields::enum_value(value, "family")?,
        confidence: fields::require_confidence(value, "confidence")?,
        reasoning: fields::require_str(value, "reasoning")?.to_string(),
    })
}

// ---- Stage 4: type classification ----

pub static TYPE_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| SchemaDescriptor {
    name: "type_classification",
    schema: json!({
        "type": "object",
        "required": ["indicatorType", "temporalAggregation", "confidence", "reasoning"],
        "properties": {
            "indicatorType": {"enum": [
                "stock", "balance", "capacity", "gap", "threshold", "flow", "volume",
                "count", "percentage", "rate", "ratio", "share", "spread", "yield",
                "price", "index", "correlation", "elasticity", "multiplier", "volatility",
                "duration", "probability", "sentiment", "allocation", "score", "other"
            ]},
            "temporalAggregation": {"enum": ["point-in-time", "period-rate", "period-cumulative", "period-average", "period-total", "not-applicable"]},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasoning": {"type": "string"}
        }
    }),
});

pub fn type_prompt(descriptor: &IndicatorDescriptor, ctx: &StageContext) -> String {
    format!(
        "Classify this indicator's fine-grained type and its temporal aggregation \
         (how one reported value aggregates over its period).\n\n{}\n\n{}\n\n\
         Respond with JSON matching the type_classification schema.",
        describe(descriptor),
        context_summary(ctx)
    )
}

pub fn parse_type(value: &Value) -> SchemaResult<TypeResult> {
    Ok(TypeResult {
        indicator_type: fields::enum_value(value, "indicatorType")?,
        temporal_aggregation: fields::enum_value(value, "temporalAggregation")?,
        confidence: fields::require_confidence(value, "confidence")?,
        reasoning: fields::require_str(value, "reasoning")?.to_string(),
    })
}

// ---- Stage 5: boolean review ----

pub static REVIEW_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| SchemaDescriptor {
    name: "boolean_review",
    schema: json!({
        "type": "object",
        "required": ["isCorrect", "confidence", "reasoning"],
        "properties": {
            "isCorrect": {"type": "boolean"},
            "incorrectFields": {"type": "array", "items": {"type": "string"}},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasoning": {"type": "string"}
        }
    }),
});

pub fn review_prompt(descriptor: &IndicatorDescriptor, ctx: &StageContext) -> String {
    format!(
        "Review the classification below for internal consistency. Report whether \
         it is correct as a whole and list any fields that look wrong.\n\n{}\n\n{}\n\n\
         Respond with JSON matching the boolean_review schema.",
        describe(descriptor),
        context_summary(ctx)
    )
}

pub fn parse_review(value: &Value) -> SchemaResult<BooleanReviewResult> {
    Ok(BooleanReviewResult {
        is_correct: fields::require_bool(value, "isCorrect")?,
        incorrect_fields: fields::string_list(value, "incorrectFields")?,
        confidence: fields::require_confidence(value, "confidence")?,
        reasoning: fields::require_str(value, "reasoning")?.to_string(),
    })
}

// ---- Stage 6: final review ----

pub static FINAL_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| SchemaDescriptor {
    name: "final_review",
    schema: json!({
        "type": "object",
        "required": ["reviewMakesSense", "finalReasoning", "confidence"],
        "properties": {
            "reviewMakesSense": {"type": "boolean"},
            "correctionsApplied": {"type": "object", "additionalProperties": {"type": "string"}},
            "finalReasoning": {"type": "string"},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1}
        }
    }),
});

pub fn final_prompt(descriptor: &IndicatorDescriptor, ctx: &StageContext) -> String {
    format!(
        "An earlier review flagged problems (or overall confidence was low). \
         Re-examine the full classification, state whether the review's concerns \
         make sense, and list corrections as field-name to corrected-value pairs.\n\n\
         {}\n\n{}\n\nRespond with JSON matching the final_review schema.",
        describe(descriptor),
        context_summary(ctx)
    )
}

pub fn parse_final(value: &Value) -> SchemaResult<FinalReviewResult> {
    Ok(FinalReviewResult {
        review_makes_sense: fields::require_bool(value, "reviewMakesSense")?,
        corrections_applied: fields::string_map(value, "correctionsApplied")?,
        final_reasoning: fields::require_str(value, "finalReasoning")?.to_string(),
        confidence: fields::require_confidence(value, "confidence")?,
    })
}

pub fn schema_for(stage: StageName) -> &'static SchemaDescriptor {
    match stage {
        StageName::Normalization => &NORMALIZATION_SCHEMA,
        StageName::Time => &TIME_SCHEMA,
        StageName::Family => &FAMILY_SCHEMA,
        StageName::Type => &TYPE_SCHEMA,
        StageName::Review => &REVIEW_SCHEMA,
        StageName::Final => &FINAL_SCHEMA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IndicatorType, Magnitude, TemporalAggregation, UnitSemanticType};

    #[test]
    fn test_parse_normalization() {
        let value = json!({
            "originalUnits": "USD Million",
            "parsedScale": "Million",
            "normalizedScale": "millions",
            "parsedUnitType": "currency-amount",
            "parsedCurrency": "USD",
            "parsingConfidence": 0.95,
            "matchedPattern": "currency-amount"
        });
        let result = parse_normalization(&value).unwrap();
        assert_eq!(result.normalized_scale, Magnitude::Millions);
        assert_eq!(result.parsed_unit_type, UnitSemanticType::CurrencyAmount);
    }

    #[test]
    fn test_parse_type_rejects_unknown_enum() {
        let value = json!({
            "indicatorType": "vibe",
            "temporalAggregation": "period-total",
            "confidence": 0.8,
            "reasoning": "..."
        });
        let err = parse_type(&value).unwrap_err();
        assert_eq!(err.path, "indicatorType");
    }

    #[test]
    fn test_parse_type_round_trip() {
        let value = json!({
            "indicatorType": "flow",
            "temporalAggregation": "period-total",
            "confidence": 0.8,
            "reasoning": "monetary flow per month"
        });
        let result = parse_type(&value).unwrap();
        assert_eq!(result.indicator_type, IndicatorType::Flow);
        assert_eq!(result.temporal_aggregation, TemporalAggregation::PeriodTotal);
    }

    #[test]
    fn test_prompts_feed_prior_context_forward() {
        let descriptor = IndicatorDescriptor::new("GDP_USA", "GDP").with_units("USD Billion");
        let mut ctx = StageContext::default();
        ctx.normalized = Some(NormalizationResult {
            original_units: Some("USD Billion".to_string()),
            parsed_scale: Some("Billion".to_string()),
            normalized_scale: Magnitude::Billions,
            parsed_unit_type: UnitSemanticType::CurrencyAmount,
            parsed_currency: Some("USD".to_string()),
            parsing_confidence: 0.95,
            matched_pattern: None,
        });
        let prompt = family_prompt(&descriptor, &ctx);
        assert!(prompt.contains("GDP_USA"));
        assert!(prompt.contains("Unit analysis"));
    }

    #[test]
    fn test_schema_lookup_is_total() {
        for stage in StageName::PIPELINE {
            let schema = schema_for(stage);
            assert!(!schema.name.is_empty());
        }
    }
}
