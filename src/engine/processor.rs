//! Normalization engine entry points.
//!
//! `process` honors the configured auto-target flag; `process_by_indicator`
//! always derives the target per group. Output order equals input order, with
//! deliberately dropped items removed. Target selection consumes the whole
//! group before any item in that group is converted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{DataPoint, IndicatorOpsError, NormalizedDataPoint, QualityWarning, Result};
use crate::units::{parse_detailed, ParseOutcome};

use super::options::{ErrorHandling, NormalizationOptions};
use super::pipeline::{
    normalize_item, resolve_dims, ConversionContext, EffectiveTarget, ItemOutcome, SourceDims,
};
use super::quality::{
    assess_group, detect_scale_outliers, detect_type_inconsistency, GroupQuality,
};
use super::router::route;
use super::target::select_target;

/// Non-fatal finding surfaced alongside the batch output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetrics {
    pub total: usize,
    pub converted: usize,
    pub passed_through: usize,
    pub skipped: usize,
    pub quality_flags: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub data: Vec<NormalizedDataPoint>,
    pub warnings: Vec<EngineWarning>,
    pub metrics: ProcessMetrics,
}

struct Prepared {
    point: DataPoint,
    detail: ParseOutcome,
    dims: SourceDims,
    warnings: Vec<QualityWarning>,
}

pub struct NormalizationEngine {
    options: NormalizationOptions,
}

impl NormalizationEngine {
    pub fn new(options: NormalizationOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &NormalizationOptions {
        &self.options
    }

    /// Normalize a batch; auto-targeting runs only when configured.
    pub fn process(&self, data: &[DataPoint]) -> Result<ProcessOutcome> {
        self.run(data, self.options.auto_target_by_indicator)
    }

    /// Normalize a batch with auto-targeting always on per group.
    pub fn process_by_indicator(&self, data: &[DataPoint]) -> Result<ProcessOutcome> {
        self.run(data, true)
    }

    fn run(&self, data: &[DataPoint], auto_target: bool) -> Result<ProcessOutcome> {
        let mut warnings: Vec<EngineWarning> = Vec::new();
        let mut metrics = ProcessMetrics {
            total: data.len(),
            ..Default::default()
        };

        // Validate and prepare every item; invalid items are skipped (or the
        // batch fails, per configuration).
        let mut prepared: Vec<Option<Prepared>> = Vec::with_capacity(data.len());
        for point in data {
            match self.prepare(point) {
                Ok(p) => prepared.push(Some(p)),
                Err(err) => match self.options.handle_errors {
                    ErrorHandling::Skip => {
                        warn!(item = %point.id, error = %err, "skipping invalid data point");
                        warnings.push(EngineWarning {
                            item_id: Some(point.id.clone()),
                            message: err.to_string(),
                        });
                        metrics.skipped += 1;
                        prepared.push(None);
                    }
                    ErrorHandling::Fail => return Err(err),
                },
            }
        }

        // Group valid items by indicator key, preserving first-seen order.
        let mut group_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, slot) in prepared.iter().enumerate() {
            if let Some(p) = slot {
                let key = self.options.group_key(&p.point);
                let members = groups.entry(key.clone()).or_insert_with(|| {
                    group_order.push(key);
                    Vec::new()
                });
                members.push(idx);
            }
        }

        // Per-group analysis: quality detectors, then target derivation. The
        // whole group is inspected before any member is converted.
        let mut contexts: HashMap<String, ConversionContext<'_>> = HashMap::new();
        let mut drops: HashMap<usize, String> = HashMap::new();
        for key in &group_order {
            let members = &groups[key];
            let group_quality = self.analyze_group(key, members, &mut prepared, &mut warnings);
            for idx in &group_quality.drop {
                drops.insert(
                    members[*idx],
                    "unit type incompatible with the group's dominant type".to_string(),
                );
            }

            let target_selection = if auto_target {
                let dims: Vec<SourceDims> = members
                    .iter()
                    .filter_map(|i| prepared[*i].as_ref().map(|p| p.dims.clone()))
                    .collect();
                Some(select_target(key, &dims, &self.options))
            } else {
                None
            };
            let target = match &target_selection {
                Some(selection) => EffectiveTarget::from_selection(selection),
                None => EffectiveTarget::from_options(&self.options),
            };
            contexts.insert(
                key.clone(),
                ConversionContext {
                    options: &self.options,
                    fx: self.options.fx_table(),
                    target,
                    target_selection,
                },
            );
        }

        // Convert in input order.
        let mut output: Vec<NormalizedDataPoint> = Vec::with_capacity(data.len());
        for (idx, slot) in prepared.iter().enumerate() {
            let Some(p) = slot else { continue };
            if let Some(reason) = drops.get(&idx) {
                debug!(item = %p.point.id, reason = %reason, "item filtered before conversion");
                warnings.push(EngineWarning {
                    item_id: Some(p.point.id.clone()),
                    message: reason.clone(),
                });
                metrics.skipped += 1;
                continue;
            }
            let key = self.options.group_key(&p.point);
            let ctx = contexts
                .get(&key)
                .ok_or_else(|| IndicatorOpsError::internal("missing group context"))?;
            let decision = route(&p.point, &p.detail.unit, &self.options);
            let outcome = normalize_item(
                &p.point,
                &p.detail.unit,
                &p.dims,
                decision,
                ctx,
                p.warnings.clone(),
            );
            match outcome {
                ItemOutcome::Normalized(item) => {
                    if let Some(explain) = &item.explain {
                        metrics.quality_flags += explain.quality_warnings.len();
                        for w in &explain.quality_warnings {
                            warnings.push(EngineWarning {
                                item_id: Some(item.point.id.clone()),
                                message: w.message.clone(),
                            });
                        }
                    }
                    if item.normalized == item.point.value {
                        metrics.passed_through += 1;
                    } else {
                        metrics.converted += 1;
                    }
                    output.push(*item);
                }
                ItemOutcome::Dropped { id, reason } => {
                    warnings.push(EngineWarning {
                        item_id: Some(id),
                        message: reason,
                    });
                    metrics.skipped += 1;
                }
            }
        }

        info!(
            total = metrics.total,
            converted = metrics.converted,
            passed_through = metrics.passed_through,
            skipped = metrics.skipped,
            "normalization batch complete"
        );

        Ok(ProcessOutcome {
            data: output,
            warnings,
            metrics,
        })
    }

    fn prepare(&self, point: &DataPoint) -> Result<Prepared> {
        point.validate()?;

        let mut effective = point.clone();
        for unit_override in &self.options.special_handling.unit_overrides {
            if unit_override.applies_to(point) {
                debug!(
                    item = %point.id,
                    unit = %unit_override.override_unit,
                    reason = %unit_override.reason,
                    "unit override applied"
                );
                effective.unit = unit_override.override_unit.clone();
                effective.scale = unit_override.override_scale.map(|m| m.label().to_string());
                break;
            }
        }

        let detail = parse_detailed(&effective.unit);
        let (dims, warnings) = resolve_dims(&effective, &detail.unit, detail.semantic);
        Ok(Prepared {
            point: effective,
            detail,
            dims,
            warnings,
        })
    }

    /// Run the pre-routing detectors for one group and push their findings
    /// into the members' pending warning lists.
    fn analyze_group(
        &self,
        key: &str,
        members: &[usize],
        prepared: &mut [Option<Prepared>],
        warnings: &mut Vec<EngineWarning>,
    ) -> GroupQuality {
        let mut quality = GroupQuality::default();

        let effective_values: Vec<(usize, f64)> = members
            .iter()
            .enumerate()
            .filter_map(|(pos, idx)| {
                prepared[*idx].as_ref().map(|p| {
                    let factor = p.dims.magnitude.map(|m| m.factor()).unwrap_or(1.0);
                    (pos, p.point.value * factor)
                })
            })
            .collect();
        detect_scale_outliers(&effective_values, &self.options.quality, &mut quality);

        let semantics: Vec<(usize, crate::domain::UnitSemanticType)> = members
            .iter()
            .enumerate()
            .filter_map(|(pos, idx)| prepared[*idx].as_ref().map(|p| (pos, p.dims.semantic)))
            .collect();
        detect_type_inconsistency(&semantics, &self.options.quality, &mut quality);

        for (pos, flags) in &quality.warnings {
            if let Some(p) = prepared[members[*pos]].as_mut() {
                p.warnings.extend(flags.iter().cloned());
            }
        }

        let points: Vec<&DataPoint> = members
            .iter()
            .filter_map(|idx| prepared[*idx].as_ref().map(|p| &p.point))
            .collect();
        let sems: Vec<crate::domain::UnitSemanticType> =
            semantics.iter().map(|(_, s)| *s).collect();
        let assessment = assess_group(&points, &sems, &quality);
        if assessment.overall < self.options.min_quality_score {
            warnings.push(EngineWarning {
                item_id: None,
                message: format!(
                    "group \"{key}\" quality score {:.1} below threshold {:.1}",
                    assessment.overall, self.options.min_quality_score
                ),
            });
        }

        quality
    }
}

/// Incremental batch assembly over the same engine.
pub struct BatchSession {
    engine: NormalizationEngine,
    buffer: Vec<DataPoint>,
}

impl BatchSession {
    pub fn new(options: NormalizationOptions) -> Result<Self> {
        Ok(Self {
            engine: NormalizationEngine::new(options)?,
            buffer: Vec::new(),
        })
    }

    pub fn add_data_point(&mut self, point: DataPoint) {
        self.buffer.push(point);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Process everything buffered so far and clear the session.
    pub fn process(&mut self) -> Result<ProcessOutcome> {
        let batch = std::mem::take(&mut self.buffer);
        self.engine.process(&batch)
    }
}
