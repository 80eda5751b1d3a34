//! Business rule engine.
//!
//! Each rule is a pure total function over one document's own fields (or a
//! pair of fields handed in by the relationship validator). Rules never fail
//! on absent inputs: they return a passing result with `applicable = false`,
//! so compliance metrics can exclude vacuous passes from the denominator.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::compare::parse_magnitude;
use crate::config::EngineConfig;
use crate::hsn;
use crate::model::{BusinessRuleResult, Document, FieldCategory, Severity};
use crate::registry;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Package counts from two documents must agree when their units are
/// comparable (same unit after synonym normalization, or either unit absent).
pub fn package_count_consistency(
    count_a: Option<f64>,
    count_b: Option<f64>,
    unit_a: Option<&str>,
    unit_b: Option<&str>,
) -> BusinessRuleResult {
    const RULE: &str = "package_count_consistency";
    let (Some(a), Some(b)) = (count_a, count_b) else {
        return BusinessRuleResult::not_applicable(RULE, Severity::Error);
    };

    if !units_comparable(unit_a, unit_b) {
        return BusinessRuleResult::pass(
            RULE,
            Severity::Error,
            format!(
                "counts not comparable across units '{}' and '{}'",
                unit_a.unwrap_or("?"),
                unit_b.unwrap_or("?")
            ),
        );
    }

    if a == b {
        BusinessRuleResult::pass(RULE, Severity::Error, format!("package counts agree ({a})"))
    } else {
        BusinessRuleResult::fail(
            RULE,
            Severity::Error,
            format!("package counts differ: {a} vs {b}"),
        )
    }
}

/// Gross weight can never be below net weight.
pub fn weight_consistency(
    gross: Option<f64>,
    net: Option<f64>,
    unit: Option<&str>,
) -> BusinessRuleResult {
    const RULE: &str = "weight_consistency";
    let (Some(gross), Some(net)) = (gross, net) else {
        return BusinessRuleResult::not_applicable(RULE, Severity::Error);
    };

    let unit = unit.unwrap_or("KG");
    if gross < net {
        BusinessRuleResult::fail(
            RULE,
            Severity::Error,
            format!("gross weight {gross} {unit} is below net weight {net} {unit}"),
        )
    } else {
        BusinessRuleResult::pass(
            RULE,
            Severity::Error,
            format!("gross {gross} {unit} >= net {net} {unit}"),
        )
    }
}

/// Commercial vs. customs HSN classification must map.
pub fn hsn_code_mapping(commercial: Option<&str>, customs: Option<&str>) -> BusinessRuleResult {
    const RULE: &str = "hsn_code_mapping";
    let (Some(commercial), Some(customs)) = (commercial, customs) else {
        return BusinessRuleResult::not_applicable(RULE, Severity::Warning);
    };

    let mapping = hsn::map_codes(commercial, customs);
    if mapping.is_consistent {
        BusinessRuleResult::pass(RULE, Severity::Warning, mapping.explanation)
    } else {
        BusinessRuleResult::fail(
            RULE,
            Severity::Warning,
            format!(
                "{} (mapping confidence {:.1})",
                mapping.explanation, mapping.mapping_confidence
            ),
        )
    }
}

/// Invoice date <= ship date <= entry date, evaluated only when all three
/// are present.
pub fn date_sequence_validation(
    invoice_date: Option<NaiveDate>,
    ship_date: Option<NaiveDate>,
    entry_date: Option<NaiveDate>,
) -> BusinessRuleResult {
    const RULE: &str = "date_sequence_validation";
    let (Some(invoice), Some(ship), Some(entry)) = (invoice_date, ship_date, entry_date) else {
        return BusinessRuleResult::not_applicable(RULE, Severity::Warning);
    };

    if invoice <= ship && ship <= entry {
        BusinessRuleResult::pass(
            RULE,
            Severity::Warning,
            format!("dates in order: {invoice} <= {ship} <= {entry}"),
        )
    } else {
        BusinessRuleResult::fail(
            RULE,
            Severity::Warning,
            format!("dates out of order: invoice {invoice}, ship {ship}, entry {entry}"),
        )
    }
}

/// The duty/invoice ratio must fall inside the plausible band (0 to
/// `max_ratio`, calibrated against observed entries).
pub fn financial_consistency(
    invoice_amount: Option<f64>,
    duty_amount: Option<f64>,
    currency: Option<&str>,
    max_ratio: f64,
) -> BusinessRuleResult {
    const RULE: &str = "financial_consistency";
    let (Some(invoice), Some(duty)) = (invoice_amount, duty_amount) else {
        return BusinessRuleResult::not_applicable(RULE, Severity::Warning);
    };
    if invoice <= 0.0 {
        return BusinessRuleResult::fail(
            RULE,
            Severity::Warning,
            format!("invoice amount {invoice} is not positive"),
        );
    }

    let ratio = duty / invoice;
    let currency = currency.unwrap_or("");
    if (0.0..=max_ratio).contains(&ratio) {
        BusinessRuleResult::pass(
            RULE,
            Severity::Warning,
            format!("duty/invoice ratio {ratio:.3} within bound {max_ratio:.2} {currency}").trim().to_string(),
        )
    } else {
        BusinessRuleResult::fail(
            RULE,
            Severity::Warning,
            format!(
                "duty/invoice ratio {ratio:.3} outside plausible bound 0..{max_ratio:.2} {currency}"
            )
            .trim()
            .to_string(),
        )
    }
}

fn units_comparable(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => normalize_unit(a) == normalize_unit(b),
        // A missing unit is treated as comparable; count checks should not
        // be silenced by sloppy unit extraction.
        _ => true,
    }
}

fn normalize_unit(unit: &str) -> &'static str {
    match unit.trim().to_lowercase().as_str() {
        "pkg" | "pkgs" | "package" | "packages" => "package",
        "ctn" | "ctns" | "carton" | "cartons" => "carton",
        "box" | "boxes" => "box",
        "pc" | "pcs" | "piece" | "pieces" => "piece",
        "plt" | "plts" | "pallet" | "pallets" => "pallet",
        "nos" | "unit" | "units" => "unit",
        _ => "other",
    }
}

/// Parse the date formats extraction services actually emit.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Document quality score
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityFactors {
    pub identifier_consistency: f64,
    pub data_completion: f64,
    pub format_validation: f64,
    pub rule_compliance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    pub overall: f64,
    pub factors: QualityFactors,
    pub recommendations: Vec<String>,
}

/// Weighted blend of identifier consistency, completion, format validity,
/// and business-rule compliance for a single document.
pub fn document_quality(doc: &Document, config: &EngineConfig) -> QualityScore {
    let mut identifier_checked = 0usize;
    let mut identifier_ok = 0usize;
    let mut critical_configured = 0usize;
    let mut critical_populated = 0usize;
    let mut format_checked = 0usize;
    let mut format_ok = 0usize;

    for mapping in registry::registry() {
        let Some(path) = mapping.path_for(doc.doc_type) else {
            continue;
        };
        let leaf = mapping.resolve(doc);

        if mapping.category == FieldCategory::Critical {
            critical_configured += 1;
            if leaf.is_some() {
                critical_populated += 1;
            }
        }

        if let Some(leaf) = leaf {
            let ok = field_format_ok(mapping.field, &leaf.value);
            format_checked += 1;
            if ok {
                format_ok += 1;
            }
            if path.starts_with("identifiers.") {
                identifier_checked += 1;
                if ok {
                    identifier_ok += 1;
                }
            }
        }
    }

    let rule_results = single_document_rules(doc, config);
    let applicable: Vec<_> = rule_results.iter().filter(|r| r.applicable).collect();
    let rule_compliance = if applicable.is_empty() {
        1.0
    } else {
        applicable.iter().filter(|r| r.passed).count() as f64 / applicable.len() as f64
    };

    let factors = QualityFactors {
        identifier_consistency: fraction(identifier_ok, identifier_checked),
        data_completion: fraction(critical_populated, critical_configured),
        format_validation: fraction(format_ok, format_checked),
        rule_compliance,
    };

    let overall = 0.3 * factors.identifier_consistency
        + 0.25 * factors.data_completion
        + 0.25 * factors.format_validation
        + 0.2 * factors.rule_compliance;

    let recommendations = quality_recommendations(&factors);

    QualityScore {
        overall,
        factors,
        recommendations,
    }
}

/// The rules that can be evaluated from one document's own fields.
pub fn single_document_rules(doc: &Document, config: &EngineConfig) -> Vec<BusinessRuleResult> {
    let gross = magnitude_at(doc, "shipment.grossWeight.value");
    let net = magnitude_at(doc, "shipment.netWeight.value");
    let unit = string_at(doc, "shipment.grossWeight.unit");

    let invoice_amount = magnitude_at(doc, "amounts.invoiceValue.amount");
    let duty_amount = magnitude_at(doc, "customs.dutyAmount.amount");
    let currency = string_at(doc, "amounts.invoiceValue.currency");

    let invoice_date = date_at(doc, "dates.invoiceDate");
    let ship_date = date_at(doc, "dates.shipDate");
    let entry_date = date_at(doc, "dates.entryDate");

    vec![
        weight_consistency(gross, net, unit.as_deref()),
        date_sequence_validation(invoice_date, ship_date, entry_date),
        financial_consistency(
            invoice_amount,
            duty_amount,
            currency.as_deref(),
            config.max_duty_ratio,
        ),
    ]
}

fn quality_recommendations(factors: &QualityFactors) -> Vec<String> {
    let ranked = [
        (
            factors.identifier_consistency,
            "Re-extract or correct the document's reference numbers",
        ),
        (
            factors.data_completion,
            "Critical fields are missing; source a clearer copy of the document",
        ),
        (
            factors.format_validation,
            "Several field values fail format checks; verify the extraction output",
        ),
        (
            factors.rule_compliance,
            "The document's own figures are internally inconsistent; review before filing",
        ),
    ];

    let lowest = ranked
        .iter()
        .fold(f64::INFINITY, |acc, (score, _)| acc.min(*score));
    if lowest >= 0.9 {
        return Vec::new();
    }
    ranked
        .iter()
        .filter(|(score, _)| *score == lowest)
        .map(|(_, advice)| (*advice).to_string())
        .collect()
}

fn fraction(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        1.0
    } else {
        num as f64 / denom as f64
    }
}

// ---------------------------------------------------------------------------
// Field accessors + format checks
// ---------------------------------------------------------------------------

pub(crate) fn magnitude_at(doc: &Document, path: &str) -> Option<f64> {
    leaf_at(doc, path).and_then(|v| parse_magnitude(&v))
}

pub(crate) fn string_at(doc: &Document, path: &str) -> Option<String> {
    leaf_at(doc, path).and_then(|v| v.as_str().map(|s| s.trim().to_string()))
}

pub(crate) fn date_at(doc: &Document, path: &str) -> Option<NaiveDate> {
    string_at(doc, path).and_then(|s| parse_date(&s))
}

fn leaf_at(doc: &Document, path: &str) -> Option<Value> {
    registry::resolve_path(&doc.fields, path)
        .and_then(crate::model::unwrap_leaf)
        .map(|leaf| leaf.value)
}

fn awb_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{3}-?\d{8}$").expect("static pattern"))
}

fn currency_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("static pattern"))
}

/// Basic per-field format check used by the quality score.
fn field_format_ok(field: &str, value: &Value) -> bool {
    match field {
        "awbNumber" => value
            .as_str()
            .is_some_and(|s| awb_pattern().is_match(s.trim())),
        "hsnCode" => value
            .as_str()
            .is_some_and(|s| hsn::validate_code(s).is_valid),
        "currency" => value
            .as_str()
            .is_some_and(|s| currency_pattern().is_match(s.trim())),
        "invoiceDate" | "shipDate" | "entryDate" => value
            .as_str()
            .is_some_and(|s| parse_date(s).is_some()),
        "packageCount" | "grossWeight" | "netWeight" | "volume" | "invoiceValue"
        | "freightCharges" | "insuranceCharges" | "quantity" | "unitPrice" | "dutyAmount"
        | "exchangeRate" => parse_magnitude(value).is_some(),
        _ => match value {
            Value::String(s) => !s.trim().is_empty(),
            Value::Null => false,
            _ => true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentType;
    use serde_json::json;

    fn date(s: &str) -> Option<NaiveDate> {
        parse_date(s)
    }

    #[test]
    fn package_counts_differ_fails() {
        let r = package_count_consistency(Some(12.0), Some(9.0), Some("CTNS"), Some("cartons"));
        assert!(!r.passed);
        assert!(r.applicable);
        assert_eq!(r.severity, Severity::Error);
    }

    #[test]
    fn package_counts_incomparable_units_pass() {
        let r = package_count_consistency(Some(12.0), Some(480.0), Some("CTNS"), Some("PCS"));
        assert!(r.passed);
        assert!(r.message.contains("not comparable"));
    }

    #[test]
    fn package_counts_missing_is_vacuous_pass() {
        let r = package_count_consistency(None, Some(12.0), None, None);
        assert!(r.passed);
        assert!(!r.applicable);
    }

    #[test]
    fn gross_below_net_is_error() {
        let r = weight_consistency(Some(180.0), Some(187.5), Some("KG"));
        assert!(!r.passed);
        assert_eq!(r.severity, Severity::Error);

        let r = weight_consistency(Some(187.5), Some(180.0), Some("KG"));
        assert!(r.passed);
    }

    #[test]
    fn hsn_mapping_rule_delegates() {
        assert!(hsn_code_mapping(Some("84099199"), Some("84099199")).passed);
        let r = hsn_code_mapping(Some("84099199"), Some("39269099"));
        assert!(!r.passed);
        assert_eq!(r.severity, Severity::Warning);
        assert!(!hsn_code_mapping(Some("84099199"), None).applicable);
    }

    #[test]
    fn date_sequence_ordering() {
        let r = date_sequence_validation(date("2024-03-01"), date("2024-03-03"), date("2024-03-07"));
        assert!(r.passed);

        let r = date_sequence_validation(date("2024-03-05"), date("2024-03-03"), date("2024-03-07"));
        assert!(!r.passed);
        assert_eq!(r.severity, Severity::Warning);

        // Two of three present: not applicable.
        let r = date_sequence_validation(date("2024-03-01"), None, date("2024-03-07"));
        assert!(r.passed);
        assert!(!r.applicable);
    }

    #[test]
    fn financial_ratio_bounds() {
        assert!(financial_consistency(Some(18250.0), Some(2100.0), Some("GBP"), 0.5).passed);
        let r = financial_consistency(Some(1000.0), Some(900.0), Some("GBP"), 0.5);
        assert!(!r.passed);
        let r = financial_consistency(Some(1000.0), Some(-5.0), None, 0.5);
        assert!(!r.passed);
        assert!(!financial_consistency(None, Some(10.0), None, 0.5).applicable);
    }

    #[test]
    fn date_parsing_accepts_common_formats() {
        assert!(parse_date("2024-03-01").is_some());
        assert!(parse_date("01/03/2024").is_some());
        assert!(parse_date("01-03-2024").is_some());
        assert!(parse_date("not a date").is_none());
    }

    fn clean_invoice() -> Document {
        Document::new(
            "INV-1",
            DocumentType::Invoice,
            json!({
                "identifiers": {"invoiceNumber": "INV-2024-001"},
                "parties": {
                    "shipper": {"name": "R.A. LABONE & CO LTD", "country": "GB"},
                    "consignee": {"name": "ACME IMPORTS PVT LTD"}
                },
                "shipment": {
                    "packages": {"count": 12, "unit": "CTNS"},
                    "netWeight": {"value": 166.0, "unit": "KG"}
                },
                "amounts": {"invoiceValue": {"amount": 18250.0, "currency": "GBP"}},
                "customs": {"hsnCode": "84099199", "description": "ENGINE GASKET SETS",
                            "quantity": 480, "unitPrice": 38.02},
                "dates": {"invoiceDate": "2024-03-01"}
            }),
        )
    }

    #[test]
    fn quality_of_clean_document_is_high() {
        let q = document_quality(&clean_invoice(), &EngineConfig::default());
        assert!(q.overall > 0.9, "overall {} too low", q.overall);
        assert_eq!(q.factors.data_completion, 1.0);
        assert!(q.recommendations.is_empty());
    }

    #[test]
    fn quality_flags_lowest_factor() {
        let mut doc = clean_invoice();
        doc.fields["amounts"]["invoiceValue"]["currency"] = json!("POUNDS");
        doc.fields["customs"]["hsnCode"] = json!("84-09");
        let q = document_quality(&doc, &EngineConfig::default());
        assert!(q.factors.format_validation < 1.0);
        assert!(!q.recommendations.is_empty());
    }
}
