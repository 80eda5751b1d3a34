//! Relationship validator.
//!
//! Holds at most one document per type for a single shipment and reasons
//! across document-type pairs: business rules, entity-name similarity, a
//! relationship confidence score, per-pair match scores, and a consolidated
//! best-value-per-field view. The holder is built once per validation
//! session and owned exclusively by its caller for that session.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::compare::text_similarity;
use crate::config::EngineConfig;
use crate::model::{BusinessRuleResult, Document, DocumentType};
use crate::registry;
use crate::rules;

/// One document per type for a shipment; inserting a duplicate type
/// replaces the previous document (last write wins).
#[derive(Debug, Default)]
pub struct ShipmentDocuments {
    by_type: BTreeMap<DocumentType, Document>,
}

impl ShipmentDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the displaced document when the type was already present.
    pub fn insert(&mut self, doc: Document) -> Option<Document> {
        self.by_type.insert(doc.doc_type, doc)
    }

    pub fn get(&self, doc_type: DocumentType) -> Option<&Document> {
        self.by_type.get(&doc_type)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = DocumentType> + '_ {
        self.by_type.keys().copied()
    }

    fn iter(&self) -> impl Iterator<Item = &Document> {
        self.by_type.values()
    }
}

/// Match score between one pair of held document types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentPairing {
    pub left: DocumentType,
    pub right: DocumentType,
    pub fields_checked: usize,
    pub fields_matched: usize,
    pub match_score: f64,
}

/// Best value for a field across all held documents, by confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedValue {
    pub value: Value,
    pub confidence: f64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossDocumentValidation {
    pub relationship_score: f64,
    pub business_rules: Vec<BusinessRuleResult>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub consolidated: BTreeMap<String, ConsolidatedValue>,
    pub pairings: Vec<DocumentPairing>,
}

/// Validate the shipment's documents against each other.
pub fn validate_shipment_consistency(
    docs: &ShipmentDocuments,
    config: &EngineConfig,
) -> CrossDocumentValidation {
    let mut business_rules = Vec::new();
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    run_pair_rules(docs, config, &mut business_rules);
    for rule in &business_rules {
        if rule.applicable && !rule.passed {
            issues.push(format!("{}: {}", rule.rule, rule.message));
            recommendations.push(match rule.severity {
                crate::model::Severity::Error => {
                    format!("Resolve before clearance: {}", rule.message)
                }
                crate::model::Severity::Warning => format!("Verify: {}", rule.message),
            });
        }
    }

    let entity = check_entity_names(docs, config);
    issues.extend(entity.issues);
    recommendations.extend(entity.recommendations);

    let relationship_score = score_relationship(docs, config, &entity.similarities);
    let pairings = build_pairings(docs, config);
    let consolidated = consolidate(docs);

    CrossDocumentValidation {
        relationship_score,
        business_rules,
        issues,
        recommendations,
        consolidated,
        pairings,
    }
}

// ---------------------------------------------------------------------------
// Pairwise business rules
// ---------------------------------------------------------------------------

fn run_pair_rules(
    docs: &ShipmentDocuments,
    config: &EngineConfig,
    out: &mut Vec<BusinessRuleResult>,
) {
    use DocumentType::*;

    // Package count: invoice vs house waybill.
    if let (Some(inv), Some(hawb)) = (docs.get(Invoice), docs.get(HouseWaybill)) {
        out.push(rules::package_count_consistency(
            rules::magnitude_at(inv, "shipment.packages.count"),
            rules::magnitude_at(hawb, "shipment.packages.count"),
            rules::string_at(inv, "shipment.packages.unit").as_deref(),
            rules::string_at(hawb, "shipment.packages.unit").as_deref(),
        ));
    }

    // Weight sanity on every document that declares both weights.
    for doc_type in [Invoice, HouseWaybill, BillOfEntry] {
        if let Some(doc) = docs.get(doc_type) {
            let result = rules::weight_consistency(
                rules::magnitude_at(doc, "shipment.grossWeight.value"),
                rules::magnitude_at(doc, "shipment.netWeight.value"),
                rules::string_at(doc, "shipment.grossWeight.unit").as_deref(),
            );
            if result.applicable {
                out.push(BusinessRuleResult {
                    message: format!("{} ({})", result.message, doc.name),
                    ..result
                });
            }
        }
    }

    // HSN mapping and financial plausibility: invoice vs bill of entry.
    if let (Some(inv), Some(be)) = (docs.get(Invoice), docs.get(BillOfEntry)) {
        out.push(rules::hsn_code_mapping(
            rules::string_at(inv, "customs.hsnCode").as_deref(),
            rules::string_at(be, "customs.hsnCode").as_deref(),
        ));
        out.push(rules::financial_consistency(
            rules::magnitude_at(inv, "amounts.invoiceValue.amount"),
            rules::magnitude_at(be, "customs.dutyAmount.amount"),
            rules::string_at(inv, "amounts.invoiceValue.currency").as_deref(),
            config.max_duty_ratio,
        ));
    }

    // Date sequencing across the three timeline owners. The ship date may
    // come from either waybill.
    let invoice_date = docs
        .get(Invoice)
        .and_then(|d| rules::date_at(d, "dates.invoiceDate"));
    let ship_date = docs
        .get(HouseWaybill)
        .and_then(|d| rules::date_at(d, "dates.shipDate"))
        .or_else(|| {
            docs.get(AirWaybill)
                .and_then(|d| rules::date_at(d, "dates.shipDate"))
        });
    let entry_date = docs
        .get(BillOfEntry)
        .and_then(|d| rules::date_at(d, "dates.entryDate"));
    out.push(rules::date_sequence_validation(
        invoice_date,
        ship_date,
        entry_date,
    ));
}

// ---------------------------------------------------------------------------
// Entity names
// ---------------------------------------------------------------------------

struct EntityCheck {
    issues: Vec<String>,
    recommendations: Vec<String>,
    /// Average pairwise similarity per entity field, where >= 2 documents
    /// supplied a name.
    similarities: BTreeMap<&'static str, f64>,
}

fn check_entity_names(docs: &ShipmentDocuments, config: &EngineConfig) -> EntityCheck {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    let mut similarities = BTreeMap::new();

    for (field, label) in [("shipperName", "shipper"), ("consigneeName", "consignee")] {
        let Some(mapping) = registry::lookup(field) else {
            continue;
        };
        let names: Vec<(String, String)> = docs
            .iter()
            .filter_map(|doc| {
                mapping
                    .resolve(doc)
                    .and_then(|leaf| leaf.value.as_str().map(|s| (doc.name.clone(), s.to_string())))
            })
            .collect();
        if names.len() < 2 {
            continue;
        }

        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                total += text_similarity(&names[i].1, &names[j].1);
                pairs += 1;
            }
        }
        let average = total / pairs as f64;
        similarities.insert(field, average);

        if average < config.entity_similarity_threshold {
            issues.push(format!(
                "{label} name differs across documents (similarity {average:.2}): {}",
                names
                    .iter()
                    .map(|(doc, name)| format!("{doc}: '{name}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            recommendations.push(format!(
                "Confirm the {label} identity; the documents may belong to different shipments"
            ));
        }
    }

    EntityCheck {
        issues,
        recommendations,
        similarities,
    }
}

// ---------------------------------------------------------------------------
// Relationship score
// ---------------------------------------------------------------------------

/// Starts at 0.5; each identifier/entity/location signal moves it up or
/// down, floored at 0.1 and capped at 1.0.
fn score_relationship(
    docs: &ShipmentDocuments,
    config: &EngineConfig,
    entity_similarities: &BTreeMap<&'static str, f64>,
) -> f64 {
    let mut score: f64 = 0.5;

    for (field, weight) in [("awbNumber", 0.15), ("invoiceNumber", 0.1), ("hawbNumber", 0.1)] {
        match identifier_agreement(docs, field) {
            Some(true) => score += weight,
            Some(false) => score -= weight,
            None => {}
        }
    }

    for field in ["shipperName", "consigneeName"] {
        if let Some(similarity) = entity_similarities.get(field) {
            if *similarity >= config.entity_similarity_threshold {
                score += 0.1;
            } else {
                score -= 0.1;
            }
        }
    }

    match identifier_agreement(docs, "shipperCountry") {
        Some(true) => score += 0.05,
        Some(false) => score -= 0.05,
        None => {}
    }

    score.clamp(0.1, 1.0)
}

/// `Some(true)` when >= 2 documents supply the identifier and all agree.
fn identifier_agreement(docs: &ShipmentDocuments, field: &str) -> Option<bool> {
    let mapping = registry::lookup(field)?;
    let values: Vec<String> = docs
        .iter()
        .filter_map(|doc| {
            mapping
                .resolve(doc)
                .map(|leaf| crate::compare::format_value(&leaf.value))
        })
        .collect();
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().all(|v| v == &values[0]))
}

// ---------------------------------------------------------------------------
// Pairings + consolidation
// ---------------------------------------------------------------------------

const PAIRING_FIELDS: [&str; 6] = [
    "awbNumber",
    "invoiceNumber",
    "hawbNumber",
    "jobNumber",
    "shipperName",
    "consigneeName",
];

fn build_pairings(docs: &ShipmentDocuments, config: &EngineConfig) -> Vec<DocumentPairing> {
    let types: Vec<DocumentType> = docs.types().collect();
    let mut pairings = Vec::new();

    for i in 0..types.len() {
        for j in (i + 1)..types.len() {
            let (left, right) = (types[i], types[j]);
            let (left_doc, right_doc) = match (docs.get(left), docs.get(right)) {
                (Some(l), Some(r)) => (l, r),
                _ => continue,
            };

            let mut checked = 0usize;
            let mut matched = 0usize;
            for field in PAIRING_FIELDS {
                let Some(mapping) = registry::lookup(field) else {
                    continue;
                };
                let (Some(a), Some(b)) = (mapping.resolve(left_doc), mapping.resolve(right_doc))
                else {
                    continue;
                };
                checked += 1;

                let matches = match mapping.comparison {
                    crate::model::ComparisonType::TextSimilarity => {
                        let (Some(a), Some(b)) = (a.value.as_str(), b.value.as_str()) else {
                            continue;
                        };
                        text_similarity(a, b) >= config.entity_similarity_threshold
                    }
                    _ => {
                        crate::compare::format_value(&a.value)
                            == crate::compare::format_value(&b.value)
                    }
                };
                if matches {
                    matched += 1;
                }
            }

            let match_score = if checked == 0 {
                0.0
            } else {
                matched as f64 / checked as f64
            };
            pairings.push(DocumentPairing {
                left,
                right,
                fields_checked: checked,
                fields_matched: matched,
                match_score,
            });
        }
    }

    pairings
}

/// For each canonical field, keep the value with the highest extraction
/// confidence across held documents (unwrapped values count as 1.0; ties
/// keep the first document in type order).
fn consolidate(docs: &ShipmentDocuments) -> BTreeMap<String, ConsolidatedValue> {
    let mut consolidated: BTreeMap<String, ConsolidatedValue> = BTreeMap::new();

    for mapping in registry::registry() {
        for doc in docs.iter() {
            let Some(leaf) = mapping.resolve(doc) else {
                continue;
            };
            let confidence = leaf.confidence.unwrap_or(1.0);
            let better = consolidated
                .get(mapping.field)
                .is_none_or(|current| confidence > current.confidence);
            if better {
                consolidated.insert(
                    mapping.field.to_string(),
                    ConsolidatedValue {
                        value: leaf.value,
                        confidence,
                        source: doc.name.clone(),
                    },
                );
            }
        }
    }

    consolidated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice() -> Document {
        Document::new(
            "INV-2024-001",
            DocumentType::Invoice,
            json!({
                "identifiers": {"invoiceNumber": "INV-2024-001"},
                "parties": {
                    "shipper": {"name": "R.A. LABONE & CO LTD", "country": "GB"},
                    "consignee": {"name": "ACME IMPORTS PVT LTD"}
                },
                "shipment": {"packages": {"count": 12, "unit": "CTNS"},
                             "netWeight": {"value": 166.0, "unit": "KG"}},
                "amounts": {"invoiceValue": {"amount": 18250.0, "currency": "GBP"}},
                "customs": {"hsnCode": "84099199"},
                "dates": {"invoiceDate": "2024-03-01"}
            }),
        )
    }

    fn hawb() -> Document {
        Document::new(
            "HAWB-44312",
            DocumentType::HouseWaybill,
            json!({
                "identifiers": {"awbNumber": "098-80828764", "hawbNumber": "HAWB-44312"},
                "parties": {
                    "shipper": {"name": "R.A LABONE & CO LTD"},
                    "consignee": {"name": "ACME IMPORTS PVT LTD"}
                },
                "shipment": {
                    "packages": {"count": 12, "unit": "CTNS"},
                    "grossWeight": {"value": 187.3, "unit": "KG"},
                    "netWeight": {"value": 166.0, "unit": "KG"}
                },
                "dates": {"shipDate": "2024-03-03"}
            }),
        )
    }

    fn bill_of_entry() -> Document {
        Document::new(
            "BE-556677",
            DocumentType::BillOfEntry,
            json!({
                "identifiers": {
                    "awbNumber": {"value": "098-80828764", "confidence": 0.98},
                    "beNumber": "BE-556677",
                    "invoiceNumber": "INV-2024-001",
                    "hawbNumber": "HAWB-44312"
                },
                "parties": {
                    "shipper": {"name": "R.A. LABONE AND CO LTD", "country": "GB"},
                    "consignee": {"name": "ACME IMPORTS PVT LTD"}
                },
                "shipment": {"grossWeight": {"value": 187.0, "unit": "KG"},
                             "netWeight": {"value": 166.0, "unit": "KG"}},
                "amounts": {"invoiceValue": {"amount": 18250.0, "currency": "GBP"}},
                "customs": {"hsnCode": "84099199", "dutyAmount": {"amount": 2150.0}},
                "dates": {"invoiceDate": "2024-03-01", "entryDate": "2024-03-07"}
            }),
        )
    }

    fn full_set() -> ShipmentDocuments {
        let mut docs = ShipmentDocuments::new();
        docs.insert(invoice());
        docs.insert(hawb());
        docs.insert(bill_of_entry());
        docs
    }

    #[test]
    fn last_write_wins_per_type() {
        let mut docs = ShipmentDocuments::new();
        assert!(docs.insert(invoice()).is_none());
        let mut second = invoice();
        second.name = "INV-REVISED".into();
        let displaced = docs.insert(second).unwrap();
        assert_eq!(displaced.name, "INV-2024-001");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs.get(DocumentType::Invoice).unwrap().name, "INV-REVISED");
    }

    #[test]
    fn consistent_shipment_scores_high() {
        let v = validate_shipment_consistency(&full_set(), &EngineConfig::default());
        assert!(
            v.relationship_score > 0.8,
            "score {} too low",
            v.relationship_score
        );
        assert!(v.issues.is_empty(), "unexpected issues: {:?}", v.issues);
        assert!(v
            .business_rules
            .iter()
            .filter(|r| r.applicable)
            .all(|r| r.passed));
    }

    #[test]
    fn entity_mismatch_is_flagged() {
        let mut docs = full_set();
        let mut rogue = hawb();
        rogue.fields["parties"]["consignee"]["name"] = json!("SKI MANUFACTURING");
        docs.insert(rogue);
        let v = validate_shipment_consistency(&docs, &EngineConfig::default());
        assert!(v.issues.iter().any(|i| i.contains("consignee")));
        assert!(v
            .recommendations
            .iter()
            .any(|r| r.contains("consignee")));
    }

    #[test]
    fn mismatching_identifiers_drag_the_score_down() {
        let mut docs = full_set();
        let mut rogue = bill_of_entry();
        rogue.fields["identifiers"]["awbNumber"] = json!("777-11112222");
        rogue.fields["identifiers"]["invoiceNumber"] = json!("INV-9999-999");
        rogue.fields["identifiers"]["hawbNumber"] = json!("HAWB-00000");
        docs.insert(rogue);
        let v = validate_shipment_consistency(&docs, &EngineConfig::default());
        let clean = validate_shipment_consistency(&full_set(), &EngineConfig::default());
        assert!(v.relationship_score < clean.relationship_score);
    }

    #[test]
    fn score_is_floored() {
        let mut docs = ShipmentDocuments::new();
        let mut inv = invoice();
        inv.fields["identifiers"]["invoiceNumber"] = json!("INV-A");
        inv.fields["parties"]["shipper"]["name"] = json!("ALPHA TRADING LLC");
        inv.fields["parties"]["consignee"]["name"] = json!("BETA RETAIL GMBH");
        inv.fields["parties"]["shipper"]["country"] = json!("AE");
        docs.insert(inv);
        let mut be = bill_of_entry();
        be.fields["identifiers"]["invoiceNumber"] = json!("INV-B");
        be.fields["parties"]["shipper"]["name"] = json!("GAMMA EXPORTS");
        be.fields["parties"]["consignee"]["name"] = json!("DELTA STORES");
        be.fields["parties"]["shipper"]["country"] = json!("GB");
        docs.insert(be);
        let v = validate_shipment_consistency(&docs, &EngineConfig::default());
        assert!(v.relationship_score >= 0.1);
    }

    #[test]
    fn failed_rule_becomes_issue() {
        let mut docs = full_set();
        let mut bad = hawb();
        bad.fields["shipment"]["grossWeight"]["value"] = json!(150.0);
        bad.fields["shipment"]["netWeight"]["value"] = json!(166.0);
        docs.insert(bad);
        let v = validate_shipment_consistency(&docs, &EngineConfig::default());
        assert!(v
            .business_rules
            .iter()
            .any(|r| r.rule == "weight_consistency" && !r.passed));
        assert!(v.issues.iter().any(|i| i.contains("weight")));
    }

    #[test]
    fn pairings_cover_held_pairs() {
        let v = validate_shipment_consistency(&full_set(), &EngineConfig::default());
        // 3 documents -> 3 pairs.
        assert_eq!(v.pairings.len(), 3);
        for pairing in &v.pairings {
            assert!((0.0..=1.0).contains(&pairing.match_score));
            assert!(pairing.fields_matched <= pairing.fields_checked);
        }
        // Invoice and bill of entry share the invoice number.
        let inv_be = v
            .pairings
            .iter()
            .find(|p| {
                p.left == DocumentType::Invoice && p.right == DocumentType::BillOfEntry
                    || p.left == DocumentType::BillOfEntry && p.right == DocumentType::Invoice
            })
            .unwrap();
        assert!(inv_be.match_score > 0.9);
    }

    #[test]
    fn consolidation_prefers_highest_confidence() {
        let mut docs = full_set();
        let mut low = hawb();
        low.fields["identifiers"]["awbNumber"] =
            json!({"value": "098-80828765", "confidence": 0.4});
        docs.insert(low);
        let v = validate_shipment_consistency(&docs, &EngineConfig::default());
        let awb = &v.consolidated["awbNumber"];
        // Bill of entry's 0.98-confidence value beats the 0.4 re-extraction.
        assert_eq!(awb.value, json!("098-80828764"));
        assert_eq!(awb.source, "BE-556677");
        assert!((awb.confidence - 0.98).abs() < 1e-9);
    }

    #[test]
    fn empty_holder_validates_to_neutral() {
        let docs = ShipmentDocuments::new();
        let v = validate_shipment_consistency(&docs, &EngineConfig::default());
        assert_eq!(v.relationship_score, 0.5);
        assert!(v.issues.is_empty());
        assert!(v.consolidated.is_empty());
        assert!(v.pairings.is_empty());
    }
}
