//! Report rendering.
//!
//! A finished [`ConsistencyReport`] renders to plain text, HTML, or JSON.
//! The JSON form round-trips losslessly through serde; the other two are
//! presentation-only.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::EngineError;
use crate::model::{ConsistencyReport, CriticalIssue, Severity};
use crate::relationship::CrossDocumentValidation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Html,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format '{other}'")),
        }
    }
}

/// Fold cross-document validation findings into a field-comparison report.
///
/// Failed error-severity rules become critical issues; all validation
/// recommendations are appended, deduplicated.
pub fn merge_validation(report: &mut ConsistencyReport, validation: &CrossDocumentValidation) {
    for rule in &validation.business_rules {
        if rule.applicable && !rule.passed && rule.severity == Severity::Error {
            report.critical_issues.push(CriticalIssue {
                field: rule.rule.clone(),
                documents: Vec::new(),
                business_impact: rule.message.clone(),
                recommended_action: format!("Resolve the failed {} check", rule.rule),
            });
        }
    }

    for rec in &validation.recommendations {
        if !report.recommendations.contains(rec) {
            report.recommendations.push(rec.clone());
        }
    }
}

/// Render the report in the requested format.
pub fn render(report: &ConsistencyReport, format: ReportFormat) -> Result<String, EngineError> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Html => Ok(render_html(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| EngineError::Render(e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

fn render_text(report: &ConsistencyReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    out.push_str("DOCUMENT CONSISTENCY REPORT\n");
    out.push_str("===========================\n\n");
    if let Some(at) = &report.meta.generated_at {
        let _ = writeln!(out, "Generated:  {at}");
    }
    let _ = writeln!(out, "Engine:     v{}", report.meta.engine_version);
    let _ = writeln!(out, "Documents:  {}", s.total_documents);
    let _ = writeln!(
        out,
        "Fields:     {} compared, {} consistent, {} discrepant, {} missing",
        s.total_fields_compared, s.consistent_fields, s.discrepant_fields, s.missing_fields
    );
    let _ = writeln!(
        out,
        "Score:      {:.1}%",
        s.overall_consistency_score * 100.0
    );
    let _ = writeln!(out, "Risk:       {}", s.risk_level);

    if !report.critical_issues.is_empty() {
        out.push_str("\nCRITICAL ISSUES\n---------------\n");
        for issue in &report.critical_issues {
            let _ = writeln!(out, "* {}: {}", issue.field, issue.business_impact);
            if !issue.documents.is_empty() {
                let _ = writeln!(out, "  documents: {}", issue.documents.join(", "));
            }
            let _ = writeln!(out, "  action: {}", issue.recommended_action);
        }
    }

    out.push_str("\nFIELD DETAILS\n-------------\n");
    for fc in &report.field_comparisons {
        let mark = if fc.is_consistent { "ok " } else { "!! " };
        let _ = writeln!(out, "{mark}{} [{}] {}", fc.field, fc.impact, fc.discrepancy);
        for value in &fc.values {
            let _ = writeln!(out, "    {}: {}", value.document, value.formatted);
        }
        let _ = writeln!(out, "    {}", fc.explanation);
        if let Some(action) = &fc.recommended_action {
            let _ = writeln!(out, "    action: {action}");
        }
    }

    if !report.recommendations.is_empty() {
        out.push_str("\nRECOMMENDATIONS\n---------------\n");
        for (i, rec) in report.recommendations.iter().enumerate() {
            let _ = writeln!(out, "{}. {rec}", i + 1);
        }
    }

    out
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_html(report: &ConsistencyReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Document Consistency Report</title>\n");
    out.push_str(
        "<style>\n\
         body { font-family: sans-serif; margin: 2em; }\n\
         table { border-collapse: collapse; width: 100%; }\n\
         th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }\n\
         .ok { color: #2a7a2a; }\n\
         .bad { color: #b03030; }\n\
         </style>\n</head>\n<body>\n",
    );

    out.push_str("<h1>Document Consistency Report</h1>\n");
    let _ = writeln!(
        out,
        "<p>Engine v{} &middot; {} documents &middot; score {:.1}% &middot; risk {}</p>",
        escape_html(&report.meta.engine_version),
        s.total_documents,
        s.overall_consistency_score * 100.0,
        s.risk_level
    );
    if let Some(at) = &report.meta.generated_at {
        let _ = writeln!(out, "<p>Generated {}</p>", escape_html(at));
    }

    if !report.critical_issues.is_empty() {
        out.push_str("<h2>Critical issues</h2>\n<ul>\n");
        for issue in &report.critical_issues {
            let _ = writeln!(
                out,
                "<li class=\"bad\"><strong>{}</strong>: {} ({})</li>",
                escape_html(&issue.field),
                escape_html(&issue.business_impact),
                escape_html(&issue.recommended_action)
            );
        }
        out.push_str("</ul>\n");
    }

    out.push_str("<h2>Field details</h2>\n<table>\n");
    out.push_str("<tr><th>Field</th><th>Impact</th><th>Status</th><th>Values</th><th>Explanation</th></tr>\n");
    for fc in &report.field_comparisons {
        let class = if fc.is_consistent { "ok" } else { "bad" };
        let values = fc
            .values
            .iter()
            .map(|v| format!("{}: {}", escape_html(&v.document), escape_html(&v.formatted)))
            .collect::<Vec<_>>()
            .join("<br>");
        let _ = writeln!(
            out,
            "<tr class=\"{class}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&fc.field),
            fc.impact,
            fc.discrepancy,
            values,
            escape_html(&fc.explanation)
        );
    }
    out.push_str("</table>\n");

    if !report.recommendations.is_empty() {
        out.push_str("<h2>Recommendations</h2>\n<ol>\n");
        for rec in &report.recommendations {
            let _ = writeln!(out, "<li>{}</li>", escape_html(rec));
        }
        out.push_str("</ol>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::compare_documents;
    use crate::model::{Document, DocumentType};
    use serde_json::json;

    fn sample_report() -> ConsistencyReport {
        let docs = vec![
            Document::new(
                "INV-1",
                DocumentType::Invoice,
                json!({
                    "identifiers": {"invoiceNumber": "INV-1"},
                    "parties": {"shipper": {"name": "R.A. LABONE & CO LTD"}},
                    "amounts": {"invoiceValue": {"amount": 100.0, "currency": "GBP"}}
                }),
            ),
            Document::new(
                "BE-1",
                DocumentType::BillOfEntry,
                json!({
                    "identifiers": {"invoiceNumber": "INV-9"},
                    "parties": {"shipper": {"name": "R.A LABONE & CO LTD"}},
                    "amounts": {"invoiceValue": {"amount": 100.0, "currency": "GBP"}}
                }),
            ),
        ];
        compare_documents(&docs, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn format_parsing() {
        assert_eq!("text".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert_eq!("HTML".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert_eq!(" json ".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn json_round_trips() {
        let report = sample_report();
        let rendered = render(&report, ReportFormat::Json).unwrap();
        let parsed: ConsistencyReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn text_report_sections_in_order() {
        let report = sample_report();
        let text = render(&report, ReportFormat::Text).unwrap();
        let summary = text.find("DOCUMENT CONSISTENCY REPORT").unwrap();
        let issues = text.find("CRITICAL ISSUES").unwrap();
        let fields = text.find("FIELD DETAILS").unwrap();
        let recs = text.find("RECOMMENDATIONS").unwrap();
        assert!(summary < issues && issues < fields && fields < recs);
        assert!(text.contains("invoiceNumber"));
    }

    #[test]
    fn html_report_escapes_values() {
        let report = sample_report();
        let html = render(&report, ReportFormat::Html).unwrap();
        assert!(html.contains("&amp; CO LTD"));
        assert!(!html.contains("R.A. LABONE & CO LTD"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn merge_appends_failed_error_rules_and_dedupes() {
        use crate::model::BusinessRuleResult;
        use crate::relationship::CrossDocumentValidation;
        use std::collections::BTreeMap;

        let mut report = sample_report();
        report.recommendations.push("Verify the shipment weights".into());
        let before_issues = report.critical_issues.len();

        let validation = CrossDocumentValidation {
            relationship_score: 0.4,
            business_rules: vec![
                BusinessRuleResult::fail(
                    "weight_consistency",
                    Severity::Error,
                    "gross weight 150 below net weight 166",
                ),
                BusinessRuleResult::fail(
                    "date_sequence_validation",
                    Severity::Warning,
                    "entry date precedes ship date",
                ),
            ],
            issues: Vec::new(),
            recommendations: vec![
                "Verify the shipment weights".into(),
                "Confirm the entry date with customs".into(),
            ],
            consolidated: BTreeMap::new(),
            pairings: Vec::new(),
        };

        merge_validation(&mut report, &validation);

        // Only the error-severity failure becomes a critical issue.
        assert_eq!(report.critical_issues.len(), before_issues + 1);
        assert_eq!(
            report.critical_issues.last().unwrap().field,
            "weight_consistency"
        );
        // Duplicate recommendation not re-added.
        let weight_recs = report
            .recommendations
            .iter()
            .filter(|r| r.as_str() == "Verify the shipment weights")
            .count();
        assert_eq!(weight_recs, 1);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("entry date")));
    }
}
