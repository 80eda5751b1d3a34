//! HSN (Harmonized System Nomenclature) code validation and cross-document
//! mapping. Codes set the duty rate, so commercial vs. customs divergence is
//! a classification risk even when both codes are individually valid.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::DiscrepancyType;

fn code_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{6,10}$").expect("static pattern"))
}

/// Classification granularity by digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HsnLevel {
    /// 6 digits: the international subheading.
    Subheading,
    /// 7-8 digits: national tariff item.
    TariffItem,
    /// 9-10 digits: statistical suffix.
    Statistical,
}

impl std::fmt::Display for HsnLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subheading => write!(f, "subheading"),
            Self::TariffItem => write!(f, "tariff_item"),
            Self::Statistical => write!(f, "statistical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HsnValidation {
    pub is_valid: bool,
    pub code_level: Option<HsnLevel>,
    pub product_category: Option<&'static str>,
}

/// Validate one code: 6-10 digits, with granularity and chapter category.
pub fn validate_code(code: &str) -> HsnValidation {
    let code = code.trim();
    if !code_pattern().is_match(code) {
        return HsnValidation {
            is_valid: false,
            code_level: None,
            product_category: None,
        };
    }

    let code_level = match code.len() {
        6 => Some(HsnLevel::Subheading),
        7 | 8 => Some(HsnLevel::TariffItem),
        _ => Some(HsnLevel::Statistical),
    };

    HsnValidation {
        is_valid: true,
        code_level,
        product_category: chapter_category(&code[..2]),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HsnMapping {
    pub is_consistent: bool,
    pub mapping_confidence: f64,
    pub discrepancy: DiscrepancyType,
    pub explanation: String,
    pub recommendations: Vec<String>,
}

/// Map the commercial-side code against the customs-side code.
///
/// Exact match or a shared subheading (6-digit prefix) is consistent; a
/// shallower shared prefix only lowers the mapping confidence.
pub fn map_codes(commercial: &str, customs: &str) -> HsnMapping {
    let commercial = commercial.trim();
    let customs = customs.trim();

    if !code_pattern().is_match(commercial) || !code_pattern().is_match(customs) {
        return HsnMapping {
            is_consistent: false,
            mapping_confidence: 0.0,
            discrepancy: DiscrepancyType::MajorDiscrepancy,
            explanation: format!("invalid HSN code format: '{commercial}' vs '{customs}'"),
            recommendations: vec![
                "Correct the HSN codes to 6-10 digit numeric format".into(),
            ],
        };
    }

    if commercial == customs {
        return HsnMapping {
            is_consistent: true,
            mapping_confidence: 1.0,
            discrepancy: DiscrepancyType::ExactMatch,
            explanation: format!("codes match exactly ({commercial})"),
            recommendations: Vec::new(),
        };
    }

    let prefix = common_prefix_len(commercial, customs);
    if prefix >= 6 {
        HsnMapping {
            is_consistent: true,
            mapping_confidence: 0.9,
            discrepancy: DiscrepancyType::AcceptableVariance,
            explanation: format!(
                "codes share the {} subheading ({commercial} vs {customs})",
                &commercial[..6]
            ),
            recommendations: vec![
                "Confirm the national tariff suffix with the customs broker".into(),
            ],
        }
    } else {
        let (confidence, scope) = match prefix {
            4 | 5 => (0.6, "heading"),
            2 | 3 => (0.3, "chapter"),
            _ => (0.1, "nothing"),
        };
        HsnMapping {
            is_consistent: false,
            mapping_confidence: confidence,
            discrepancy: DiscrepancyType::MajorDiscrepancy,
            explanation: format!(
                "codes diverge below the subheading, sharing {scope} only ({commercial} vs {customs})"
            ),
            recommendations: vec![
                "Reconcile the commercial and customs HSN classification before filing".into(),
                "An incorrect code can change the applicable duty rate".into(),
            ],
        }
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

/// Product category by HS chapter (first two digits), for the chapters that
/// dominate air-freight trade lanes.
fn chapter_category(chapter: &str) -> Option<&'static str> {
    Some(match chapter {
        "28" | "29" => "chemicals",
        "30" => "pharmaceuticals",
        "39" => "plastics and articles thereof",
        "40" => "rubber and articles thereof",
        "48" => "paper and paperboard",
        "61" | "62" => "apparel and clothing",
        "64" => "footwear",
        "71" => "precious stones and jewellery",
        "72" | "73" => "iron and steel articles",
        "76" => "aluminium and articles thereof",
        "84" => "machinery and mechanical appliances",
        "85" => "electrical machinery and equipment",
        "87" => "vehicles and parts",
        "90" => "optical and precision instruments",
        "94" => "furniture and lighting",
        "95" => "toys and sports equipment",
        _ => return None,
    })
}
