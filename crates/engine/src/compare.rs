//! Type-aware value comparator.
//!
//! Pure function over the values one canonical field yields across the
//! supplied documents. Non-numeric input under a numeric comparison degrades
//! to a major discrepancy; it never aborts the run.

use serde_json::Value;

use crate::model::{ComparisonType, DiscrepancyType};

/// A raw value with the document it came from.
#[derive(Debug, Clone)]
pub struct SourcedValue {
    pub document: String,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueVerdict {
    pub is_consistent: bool,
    pub discrepancy: DiscrepancyType,
    pub explanation: String,
}

impl ValueVerdict {
    fn new(is_consistent: bool, discrepancy: DiscrepancyType, explanation: String) -> Self {
        Self {
            is_consistent,
            discrepancy,
            explanation,
        }
    }
}

/// Compare one field's values across documents.
///
/// Zero values is missing data; a single value is vacuously consistent and
/// reported as an exact match (deliberate convention, see the report's
/// explanation string).
pub fn analyze_values(
    values: &[SourcedValue],
    comparison: ComparisonType,
    tolerance: f64,
    text_threshold: f64,
) -> ValueVerdict {
    match values.len() {
        0 => ValueVerdict::new(
            false,
            DiscrepancyType::MissingData,
            "no document supplied a value".into(),
        ),
        1 => ValueVerdict::new(
            true,
            DiscrepancyType::ExactMatch,
            format!("only one document ({}) supplied a value", values[0].document),
        ),
        _ => match comparison {
            ComparisonType::Exact => analyze_exact(values),
            ComparisonType::Numeric | ComparisonType::Weight => {
                analyze_numeric(values, tolerance)
            }
            ComparisonType::TextSimilarity => analyze_text(values, text_threshold),
        },
    }
}

fn analyze_exact(values: &[SourcedValue]) -> ValueVerdict {
    let mut distinct: Vec<String> = Vec::new();
    for v in values {
        let s = format_value(&v.raw);
        if !distinct.contains(&s) {
            distinct.push(s);
        }
    }

    if distinct.len() == 1 {
        ValueVerdict::new(
            true,
            DiscrepancyType::ExactMatch,
            format!("all {} documents agree", values.len()),
        )
    } else {
        ValueVerdict::new(
            false,
            DiscrepancyType::MajorDiscrepancy,
            format!("distinct values: {}", distinct.join(" / ")),
        )
    }
}

fn analyze_numeric(values: &[SourcedValue], tolerance: f64) -> ValueVerdict {
    let mut parsed: Vec<f64> = Vec::with_capacity(values.len());
    for v in values {
        match parse_magnitude(&v.raw) {
            Some(n) => parsed.push(n),
            None => {
                return ValueVerdict::new(
                    false,
                    DiscrepancyType::MajorDiscrepancy,
                    format!(
                        "value '{}' from {} is not numeric",
                        format_value(&v.raw),
                        v.document
                    ),
                );
            }
        }
    }

    let min = parsed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = parsed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range == 0.0 {
        ValueVerdict::new(
            true,
            DiscrepancyType::ExactMatch,
            format!("all {} documents agree", values.len()),
        )
    } else if range <= tolerance {
        ValueVerdict::new(
            true,
            DiscrepancyType::AcceptableVariance,
            format!("range {range:.4} within tolerance {tolerance:.4}"),
        )
    } else {
        ValueVerdict::new(
            false,
            DiscrepancyType::MajorDiscrepancy,
            format!("range {range:.4} exceeds tolerance {tolerance:.4} (min {min}, max {max})"),
        )
    }
}

fn analyze_text(values: &[SourcedValue], threshold: f64) -> ValueVerdict {
    let normalized: Vec<String> = values
        .iter()
        .map(|v| normalize_text(&format_value(&v.raw)))
        .collect();

    let mut distinct: Vec<&String> = Vec::new();
    for n in &normalized {
        if !distinct.contains(&n) {
            distinct.push(n);
        }
    }
    if distinct.len() == 1 {
        return ValueVerdict::new(
            true,
            DiscrepancyType::ExactMatch,
            format!("all {} documents agree", values.len()),
        );
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..normalized.len() {
        for j in (i + 1)..normalized.len() {
            total += strsim::normalized_levenshtein(&normalized[i], &normalized[j]);
            pairs += 1;
        }
    }
    let average = total / pairs as f64;

    if average > threshold {
        ValueVerdict::new(
            true,
            DiscrepancyType::AcceptableVariance,
            format!("average similarity {average:.2} above threshold {threshold:.2}"),
        )
    } else {
        ValueVerdict::new(
            false,
            DiscrepancyType::MajorDiscrepancy,
            format!("average similarity {average:.2} at or below threshold {threshold:.2}"),
        )
    }
}

/// Similarity of two strings after trim + lowercase normalization.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_text(a), &normalize_text(b))
}

fn normalize_text(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Render a raw leaf for display and exact comparison.
pub fn format_value(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Parse a numeric magnitude out of a leaf.
///
/// Strings may carry thousands separators and a trailing unit
/// ("1,234.5 KG"); the leading numeric token is taken.
pub fn parse_magnitude(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().replace(',', "");
            let token: String = cleaned
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+')
                .collect();
            token.parse().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sv(doc: &str, raw: Value) -> SourcedValue {
        SourcedValue {
            document: doc.into(),
            raw,
        }
    }

    #[test]
    fn zero_values_is_missing_data() {
        let v = analyze_values(&[], ComparisonType::Exact, 0.0, 0.8);
        assert!(!v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::MissingData);
    }

    #[test]
    fn single_value_is_vacuously_consistent() {
        let v = analyze_values(
            &[sv("INV-1", json!("098-80828764"))],
            ComparisonType::Exact,
            0.0,
            0.8,
        );
        assert!(v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::ExactMatch);
        assert!(v.explanation.contains("only one document"));
    }

    #[test]
    fn exact_agreement() {
        let v = analyze_values(
            &[
                sv("HAWB-1", json!("098-80828764")),
                sv("BE-1", json!("098-80828764")),
            ],
            ComparisonType::Exact,
            0.0,
            0.8,
        );
        assert!(v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::ExactMatch);
    }

    #[test]
    fn exact_mismatch_lists_values() {
        let v = analyze_values(
            &[
                sv("HAWB-1", json!("098-80828764")),
                sv("BE-1", json!("099-80828764")),
            ],
            ComparisonType::Exact,
            0.0,
            0.8,
        );
        assert!(!v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::MajorDiscrepancy);
        assert!(v.explanation.contains("098-80828764"));
        assert!(v.explanation.contains("099-80828764"));
    }

    #[test]
    fn numeric_within_tolerance() {
        let v = analyze_values(
            &[sv("AWB-1", json!(37.0)), sv("BE-1", json!(37.3))],
            ComparisonType::Weight,
            0.5,
            0.8,
        );
        assert!(v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::AcceptableVariance);
    }

    #[test]
    fn numeric_beyond_tolerance() {
        let v = analyze_values(
            &[sv("AWB-1", json!(37.0)), sv("BE-1", json!(38.0))],
            ComparisonType::Weight,
            0.5,
            0.8,
        );
        assert!(!v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::MajorDiscrepancy);
    }

    #[test]
    fn numeric_zero_range_is_exact() {
        let v = analyze_values(
            &[sv("A", json!(12)), sv("B", json!(12.0))],
            ComparisonType::Numeric,
            0.0,
            0.8,
        );
        assert!(v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::ExactMatch);
    }

    #[test]
    fn non_numeric_degrades_not_aborts() {
        let v = analyze_values(
            &[sv("A", json!("TWELVE")), sv("B", json!(12))],
            ComparisonType::Numeric,
            0.0,
            0.8,
        );
        assert!(!v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::MajorDiscrepancy);
        assert!(v.explanation.contains("TWELVE"));
    }

    #[test]
    fn numeric_string_with_unit_parses() {
        assert_eq!(parse_magnitude(&json!("1,234.5 KG")), Some(1234.5));
        assert_eq!(parse_magnitude(&json!("450.5")), Some(450.5));
        assert_eq!(parse_magnitude(&json!("-12")), Some(-12.0));
        assert_eq!(parse_magnitude(&json!("KG 450")), None);
    }

    #[test]
    fn text_near_identical_is_consistent() {
        let v = analyze_values(
            &[
                sv("INV-1", json!("R.A. LABONE & CO LTD")),
                sv("HAWB-1", json!("R.A LABONE & CO LTD")),
            ],
            ComparisonType::TextSimilarity,
            0.0,
            0.8,
        );
        assert!(v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::AcceptableVariance);
    }

    #[test]
    fn text_unrelated_is_inconsistent() {
        let v = analyze_values(
            &[
                sv("INV-1", json!("R.A. LABONE & CO LTD")),
                sv("HAWB-1", json!("SKI MANUFACTURING")),
            ],
            ComparisonType::TextSimilarity,
            0.0,
            0.8,
        );
        assert!(!v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::MajorDiscrepancy);
    }

    #[test]
    fn text_case_and_whitespace_normalized() {
        let v = analyze_values(
            &[
                sv("A", json!("  ACME EXPORTS ")),
                sv("B", json!("acme exports")),
            ],
            ComparisonType::TextSimilarity,
            0.0,
            0.8,
        );
        assert!(v.is_consistent);
        assert_eq!(v.discrepancy, DiscrepancyType::ExactMatch);
    }
}
