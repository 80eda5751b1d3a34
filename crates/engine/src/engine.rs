//! Field comparator: orchestrates the registry and value comparator across
//! all supplied documents and builds the consistency report.

use std::collections::BTreeMap;

use crate::compare::{analyze_values, format_value, SourcedValue};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{
    ConsistencyReport, CriticalIssue, Document, FieldCategory, FieldComparisonResult, FieldValue,
    ReportMeta, ReportSummary, RiskLevel,
};
use crate::registry::{registry, FieldMapping, EXPECTED_TYPES};

/// Compare two or more documents describing one shipment.
///
/// Fails only when fewer than two documents are supplied; every other
/// condition surfaces as data inside the report. Output is deterministic:
/// identical ordered inputs produce identical reports.
pub fn compare_documents(
    documents: &[Document],
    config: &EngineConfig,
) -> Result<ConsistencyReport, EngineError> {
    if documents.len() < 2 {
        return Err(EngineError::InsufficientDocuments {
            supplied: documents.len(),
        });
    }

    let mut comparisons: Vec<FieldComparisonResult> = Vec::new();
    let mut confidence_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for mapping in registry() {
        // A row only participates when at least one supplied document's type
        // maps the field; otherwise it is inapplicable to this input set.
        if !documents
            .iter()
            .any(|d| mapping.path_for(d.doc_type).is_some())
        {
            continue;
        }

        let mut sourced: Vec<SourcedValue> = Vec::new();
        let mut values: Vec<FieldValue> = Vec::new();
        for doc in documents {
            if let Some(leaf) = mapping.resolve(doc) {
                if let Some(c) = leaf.confidence {
                    let entry = confidence_sums.entry(doc.name.clone()).or_insert((0.0, 0));
                    entry.0 += c;
                    entry.1 += 1;
                }
                sourced.push(SourcedValue {
                    document: doc.name.clone(),
                    raw: leaf.value.clone(),
                });
                values.push(FieldValue {
                    document: doc.name.clone(),
                    raw: leaf.value.clone(),
                    formatted: format_value(&leaf.value),
                });
            }
        }

        let verdict = analyze_values(
            &sourced,
            mapping.comparison,
            mapping.tolerance.unwrap_or(0.0),
            config.text_similarity_threshold,
        );

        let recommended_action = if verdict.is_consistent {
            None
        } else {
            Some(recommended_action(mapping))
        };

        comparisons.push(FieldComparisonResult {
            field: mapping.field.to_string(),
            category: mapping.category,
            values,
            is_consistent: verdict.is_consistent,
            discrepancy: verdict.discrepancy,
            impact: mapping.category.impact(),
            explanation: verdict.explanation,
            recommended_action,
        });
    }

    let summary = build_summary(documents, &comparisons);
    let critical_issues = build_critical_issues(documents, &comparisons);
    let recommendations = build_recommendations(documents, &comparisons, &summary, config);

    let per_document_confidence = documents
        .iter()
        .map(|d| {
            let confidence = confidence_sums
                .get(&d.name)
                .map(|(sum, n)| sum / *n as f64)
                .unwrap_or(1.0);
            (d.name.clone(), confidence)
        })
        .collect();

    Ok(ConsistencyReport {
        meta: ReportMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: None,
            per_document_confidence,
        },
        summary,
        field_comparisons: comparisons,
        critical_issues,
        recommendations,
    })
}

fn recommended_action(mapping: &FieldMapping) -> String {
    match mapping.category {
        FieldCategory::Critical => format!(
            "URGENT: resolve the {} discrepancy before shipment clearance",
            mapping.field
        ),
        FieldCategory::Important => format!(
            "Review the {} discrepancy with shipping stakeholders before filing",
            mapping.field
        ),
        FieldCategory::Minor => format!("Note the {} variation for reference", mapping.field),
    }
}

fn build_summary(
    documents: &[Document],
    comparisons: &[FieldComparisonResult],
) -> ReportSummary {
    use crate::model::DiscrepancyType;

    let total = comparisons.len();
    let consistent = comparisons.iter().filter(|c| c.is_consistent).count();
    let missing = comparisons
        .iter()
        .filter(|c| c.discrepancy == DiscrepancyType::MissingData)
        .count();
    let discrepant = comparisons
        .iter()
        .filter(|c| !c.is_consistent && c.discrepancy != DiscrepancyType::MissingData)
        .count();

    let score = if total == 0 {
        1.0
    } else {
        consistent as f64 / total as f64
    };

    let critical_inconsistent = comparisons
        .iter()
        .filter(|c| c.category == FieldCategory::Critical && !c.is_consistent)
        .count();
    let risk_level = if critical_inconsistent > 2 {
        RiskLevel::High
    } else if critical_inconsistent > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    ReportSummary {
        total_documents: documents.len(),
        documents_compared: documents.iter().map(|d| d.name.clone()).collect(),
        total_fields_compared: total,
        consistent_fields: consistent,
        discrepant_fields: discrepant,
        missing_fields: missing,
        overall_consistency_score: score,
        risk_level,
    }
}

fn build_critical_issues(
    documents: &[Document],
    comparisons: &[FieldComparisonResult],
) -> Vec<CriticalIssue> {
    comparisons
        .iter()
        .filter(|c| c.category == FieldCategory::Critical && !c.is_consistent)
        .map(|c| {
            let documents = if c.values.is_empty() {
                documents.iter().map(|d| d.name.clone()).collect()
            } else {
                c.values.iter().map(|v| v.document.clone()).collect()
            };
            let business_impact = crate::registry::lookup(&c.field)
                .map(|m| m.business_impact.to_string())
                .unwrap_or_else(|| c.explanation.clone());
            CriticalIssue {
                field: c.field.clone(),
                documents,
                business_impact,
                recommended_action: c
                    .recommended_action
                    .clone()
                    .unwrap_or_else(|| c.explanation.clone()),
            }
        })
        .collect()
}

fn build_recommendations(
    documents: &[Document],
    comparisons: &[FieldComparisonResult],
    summary: &ReportSummary,
    config: &EngineConfig,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let critical = comparisons
        .iter()
        .filter(|c| c.category == FieldCategory::Critical && !c.is_consistent)
        .count();
    if critical > 0 {
        recommendations.push(format!(
            "URGENT: {critical} critical field discrepanc{} must be resolved before customs filing",
            if critical == 1 { "y" } else { "ies" }
        ));
    }

    let important = comparisons
        .iter()
        .filter(|c| c.category == FieldCategory::Important && !c.is_consistent)
        .count();
    if important > 0 {
        recommendations.push(format!(
            "Review {important} important field discrepanc{} with shipping stakeholders",
            if important == 1 { "y" } else { "ies" }
        ));
    }

    for expected in EXPECTED_TYPES {
        if !documents.iter().any(|d| d.doc_type == expected) {
            recommendations.push(format!(
                "Obtain the missing {expected} to complete cross-document checks"
            ));
        }
    }

    let score = summary.overall_consistency_score;
    if score >= config.ready_score {
        recommendations.push("Documents are consistent; shipment is ready to process".into());
    } else if score >= config.review_score {
        recommendations.push("Review the flagged items before processing".into());
    } else {
        recommendations
            .push("Low overall consistency; a comprehensive document review is required".into());
    }

    recommendations
}
