use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// The kind of source document a field map was extracted from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    AirWaybill,
    HouseWaybill,
    BillOfEntry,
    PackingList,
    DeliveryNote,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        Self::Invoice,
        Self::AirWaybill,
        Self::HouseWaybill,
        Self::BillOfEntry,
        Self::PackingList,
        Self::DeliveryNote,
    ];
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoice => write!(f, "invoice"),
            Self::AirWaybill => write!(f, "air_waybill"),
            Self::HouseWaybill => write!(f, "house_waybill"),
            Self::BillOfEntry => write!(f, "bill_of_entry"),
            Self::PackingList => write!(f, "packing_list"),
            Self::DeliveryNote => write!(f, "delivery_note"),
        }
    }
}

/// One document's extracted field map. Immutable once handed to the engine.
///
/// `fields` is the nested extraction record: leaves may be `null`, a bare
/// value, or a `{value, confidence}` wrapper. The wrapper is unwrapped once
/// at resolution time ([`unwrap_leaf`]), never checked ad hoc downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(rename = "documentName")]
    pub name: String,
    #[serde(rename = "documentType")]
    pub doc_type: DocumentType,
    pub fields: Value,
}

impl Document {
    pub fn new(name: impl Into<String>, doc_type: DocumentType, fields: Value) -> Self {
        Self {
            name: name.into(),
            doc_type,
            fields,
        }
    }
}

/// A resolved leaf value with its optional extraction confidence.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub value: Value,
    pub confidence: Option<f64>,
}

/// Normalize the `null | bare | {value, confidence}` leaf shape.
///
/// `null`, an empty string, or a wrapper around `null` all yield `None` —
/// absence is never an error here.
pub fn unwrap_leaf(raw: &Value) -> Option<Leaf> {
    let (inner, confidence) = match raw {
        Value::Object(map) if map.contains_key("value") => {
            let confidence = map.get("confidence").and_then(Value::as_f64);
            (map.get("value").unwrap_or(&Value::Null), confidence)
        }
        other => (other, None),
    };

    match inner {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        v => Some(Leaf {
            value: v.clone(),
            confidence,
        }),
    }
}

// ---------------------------------------------------------------------------
// Classification enums
// ---------------------------------------------------------------------------

/// Business-impact tier of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Critical,
    Important,
    Minor,
}

impl FieldCategory {
    pub fn impact(self) -> Impact {
        match self {
            Self::Critical => Impact::High,
            Self::Important => Impact::Medium,
            Self::Minor => Impact::Low,
        }
    }
}

impl std::fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Important => write!(f, "important"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

/// How a field's values are compared. Closed set, matched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    Exact,
    Numeric,
    Weight,
    TextSimilarity,
}

/// Outcome of comparing one field's values across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    ExactMatch,
    AcceptableVariance,
    MajorDiscrepancy,
    MissingData,
}

impl std::fmt::Display for DiscrepancyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactMatch => write!(f, "exact_match"),
            Self::AcceptableVariance => write!(f, "acceptable_variance"),
            Self::MajorDiscrepancy => write!(f, "major_discrepancy"),
            Self::MissingData => write!(f, "missing_data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-field comparison
// ---------------------------------------------------------------------------

/// One document's contribution to a field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub document: String,
    pub raw: Value,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldComparisonResult {
    pub field: String,
    pub category: FieldCategory,
    pub values: Vec<FieldValue>,
    pub is_consistent: bool,
    pub discrepancy: DiscrepancyType,
    pub impact: Impact,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
}

// ---------------------------------------------------------------------------
// Business rules
// ---------------------------------------------------------------------------

/// Result of one pure business rule. Rules are total: missing inputs make
/// them pass with `applicable = false` rather than fail or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRuleResult {
    pub rule: String,
    pub passed: bool,
    pub applicable: bool,
    pub severity: Severity,
    pub message: String,
}

impl BusinessRuleResult {
    pub fn pass(rule: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            passed: true,
            applicable: true,
            severity,
            message: message.into(),
        }
    }

    pub fn fail(rule: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            passed: false,
            applicable: true,
            severity,
            message: message.into(),
        }
    }

    /// Passing-by-convention result for a rule whose inputs are absent.
    pub fn not_applicable(rule: &str, severity: Severity) -> Self {
        Self {
            rule: rule.into(),
            passed: true,
            applicable: false,
            severity,
            message: "required inputs not present in supplied documents".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalIssue {
    pub field: String,
    pub documents: Vec<String>,
    pub business_impact: String,
    pub recommended_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_documents: usize,
    pub documents_compared: Vec<String>,
    pub total_fields_compared: usize,
    pub consistent_fields: usize,
    pub discrepant_fields: usize,
    pub missing_fields: usize,
    pub overall_consistency_score: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    pub engine_version: String,
    /// Stamped by the caller (CLI) after the engine returns; the engine
    /// itself never reads the clock so identical inputs give identical
    /// output bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    /// Mean extraction confidence of resolved leaves, per document.
    pub per_document_confidence: BTreeMap<String, f64>,
}

/// The full cross-document consistency report. Built fresh per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub meta: ReportMeta,
    pub summary: ReportSummary,
    pub field_comparisons: Vec<FieldComparisonResult>,
    pub critical_issues: Vec<CriticalIssue>,
    pub recommendations: Vec<String>,
}
