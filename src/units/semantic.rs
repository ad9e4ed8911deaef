//! Unit semantic classifier: coarse nine-way label over the same pattern
//! registry the parser consults.

use serde::{Deserialize, Serialize};

use crate::domain::UnitSemanticType;

use super::parser::parse_detailed;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitClassification {
    #[serde(rename = "type")]
    pub semantic_type: UnitSemanticType,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
}

pub fn classify(s: &str) -> UnitClassification {
    let outcome = parse_detailed(s);
    let normalized = if outcome.unit.normalized.is_empty() {
        None
    } else {
        Some(outcome.unit.normalized)
    };
    UnitClassification {
        semantic_type: outcome.semantic,
        confidence: outcome.confidence,
        matched_pattern: outcome.matched,
        normalized,
    }
}
