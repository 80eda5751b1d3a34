//! Canonical field-mapping registry.
//!
//! One static row per canonical field: adding a document type or field means
//! adding a row (or a path tuple), never a new branch. Resolving a field for
//! a document whose type has no configured path, or whose instance lacks the
//! leaf, yields no value — absence is data, not an error.

use serde_json::Value;

use crate::model::{unwrap_leaf, ComparisonType, Document, DocumentType, FieldCategory, Leaf};

use DocumentType::*;

#[derive(Debug)]
pub struct FieldMapping {
    pub field: &'static str,
    pub category: FieldCategory,
    pub comparison: ComparisonType,
    /// Absolute numeric tolerance; `None` means exact (0).
    pub tolerance: Option<f64>,
    pub business_impact: &'static str,
    paths: &'static [(DocumentType, &'static str)],
}

impl FieldMapping {
    pub fn path_for(&self, doc_type: DocumentType) -> Option<&'static str> {
        self.paths
            .iter()
            .find(|(t, _)| *t == doc_type)
            .map(|(_, p)| *p)
    }

    /// Resolve this field inside one document, unwrapping the leaf shape.
    pub fn resolve(&self, doc: &Document) -> Option<Leaf> {
        let path = self.path_for(doc.doc_type)?;
        let node = resolve_path(&doc.fields, path)?;
        unwrap_leaf(node)
    }
}

/// Walk a dotted path into a nested field record.
pub fn resolve_path<'a>(fields: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = fields;
    for segment in path.split('.') {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Look up a registry row by canonical field name.
pub fn lookup(field: &str) -> Option<&'static FieldMapping> {
    REGISTRY.iter().find(|m| m.field == field)
}

/// The full registry, in report order.
pub fn registry() -> &'static [FieldMapping] {
    REGISTRY
}

/// Document types a complete shipment file is expected to contain.
pub const EXPECTED_TYPES: [DocumentType; 3] = [Invoice, HouseWaybill, BillOfEntry];

static REGISTRY: &[FieldMapping] = &[
    // -- identifiers --------------------------------------------------------
    FieldMapping {
        field: "invoiceNumber",
        category: FieldCategory::Critical,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Customs filing and payment reconciliation key off the invoice number",
        paths: &[
            (Invoice, "identifiers.invoiceNumber"),
            (BillOfEntry, "identifiers.invoiceNumber"),
            (PackingList, "identifiers.invoiceNumber"),
            (DeliveryNote, "identifiers.invoiceNumber"),
        ],
    },
    FieldMapping {
        field: "awbNumber",
        category: FieldCategory::Critical,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "The AWB number groups all documents of one shipment; a mismatch may mean mixed-up shipments",
        paths: &[
            (AirWaybill, "identifiers.awbNumber"),
            (HouseWaybill, "identifiers.awbNumber"),
            (BillOfEntry, "identifiers.awbNumber"),
        ],
    },
    FieldMapping {
        field: "hawbNumber",
        category: FieldCategory::Important,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "House waybill number links the consolidation to the customs entry",
        paths: &[
            (HouseWaybill, "identifiers.hawbNumber"),
            (BillOfEntry, "identifiers.hawbNumber"),
        ],
    },
    FieldMapping {
        field: "beNumber",
        category: FieldCategory::Important,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Bill of entry number is the customs clearance reference",
        paths: &[(BillOfEntry, "identifiers.beNumber")],
    },
    FieldMapping {
        field: "jobNumber",
        category: FieldCategory::Minor,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Forwarder job number ties internal files together",
        paths: &[
            (HouseWaybill, "identifiers.jobNumber"),
            (BillOfEntry, "identifiers.jobNumber"),
            (DeliveryNote, "identifiers.jobNumber"),
        ],
    },
    FieldMapping {
        field: "deliveryNoteNumber",
        category: FieldCategory::Minor,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Delivery note number closes out proof of delivery",
        paths: &[(DeliveryNote, "identifiers.deliveryNoteNumber")],
    },
    // -- parties ------------------------------------------------------------
    FieldMapping {
        field: "shipperName",
        category: FieldCategory::Critical,
        comparison: ComparisonType::TextSimilarity,
        tolerance: None,
        business_impact: "Shipper identity drives export compliance screening",
        paths: &[
            (Invoice, "parties.shipper.name"),
            (AirWaybill, "parties.shipper.name"),
            (HouseWaybill, "parties.shipper.name"),
            (BillOfEntry, "parties.shipper.name"),
            (PackingList, "parties.shipper.name"),
        ],
    },
    FieldMapping {
        field: "shipperCountry",
        category: FieldCategory::Minor,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Country of export feeds origin declarations",
        paths: &[
            (Invoice, "parties.shipper.country"),
            (AirWaybill, "parties.shipper.country"),
            (BillOfEntry, "parties.shipper.country"),
        ],
    },
    FieldMapping {
        field: "consigneeName",
        category: FieldCategory::Critical,
        comparison: ComparisonType::TextSimilarity,
        tolerance: None,
        business_impact: "Consignee identity determines duty liability and delivery",
        paths: &[
            (Invoice, "parties.consignee.name"),
            (AirWaybill, "parties.consignee.name"),
            (HouseWaybill, "parties.consignee.name"),
            (BillOfEntry, "parties.consignee.name"),
            (DeliveryNote, "parties.consignee.name"),
        ],
    },
    FieldMapping {
        field: "consigneeAddress",
        category: FieldCategory::Minor,
        comparison: ComparisonType::TextSimilarity,
        tolerance: None,
        business_impact: "Delivery address mismatches delay final-mile handover",
        paths: &[
            (Invoice, "parties.consignee.address"),
            (HouseWaybill, "parties.consignee.address"),
            (DeliveryNote, "parties.consignee.address"),
        ],
    },
    // -- shipment physicals -------------------------------------------------
    FieldMapping {
        field: "packageCount",
        category: FieldCategory::Critical,
        comparison: ComparisonType::Numeric,
        tolerance: None,
        business_impact: "Package count discrepancies trigger customs examination and short-landing claims",
        paths: &[
            (Invoice, "shipment.packages.count"),
            (AirWaybill, "shipment.packages.count"),
            (HouseWaybill, "shipment.packages.count"),
            (PackingList, "shipment.packages.count"),
            (DeliveryNote, "shipment.packages.count"),
        ],
    },
    FieldMapping {
        field: "grossWeight",
        category: FieldCategory::Critical,
        comparison: ComparisonType::Weight,
        tolerance: Some(0.5),
        business_impact: "Gross weight drives freight charges and aircraft load planning",
        paths: &[
            (AirWaybill, "shipment.grossWeight.value"),
            (HouseWaybill, "shipment.grossWeight.value"),
            (BillOfEntry, "shipment.grossWeight.value"),
            (PackingList, "shipment.grossWeight.value"),
        ],
    },
    FieldMapping {
        field: "netWeight",
        category: FieldCategory::Important,
        comparison: ComparisonType::Weight,
        tolerance: Some(0.5),
        business_impact: "Net weight feeds duty assessment for weight-based tariff lines",
        paths: &[
            (Invoice, "shipment.netWeight.value"),
            (BillOfEntry, "shipment.netWeight.value"),
            (PackingList, "shipment.netWeight.value"),
        ],
    },
    FieldMapping {
        field: "volume",
        category: FieldCategory::Minor,
        comparison: ComparisonType::Numeric,
        tolerance: Some(0.01),
        business_impact: "Chargeable weight may be volumetric",
        paths: &[
            (AirWaybill, "shipment.volume"),
            (HouseWaybill, "shipment.volume"),
        ],
    },
    // -- commercial amounts -------------------------------------------------
    FieldMapping {
        field: "invoiceValue",
        category: FieldCategory::Critical,
        comparison: ComparisonType::Numeric,
        tolerance: Some(0.01),
        business_impact: "Declared value is the duty base; a mismatch is an undervaluation flag",
        paths: &[
            (Invoice, "amounts.invoiceValue.amount"),
            (BillOfEntry, "amounts.invoiceValue.amount"),
        ],
    },
    FieldMapping {
        field: "currency",
        category: FieldCategory::Critical,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Currency mismatches corrupt the assessable value computation",
        paths: &[
            (Invoice, "amounts.invoiceValue.currency"),
            (BillOfEntry, "amounts.invoiceValue.currency"),
        ],
    },
    FieldMapping {
        field: "freightCharges",
        category: FieldCategory::Important,
        comparison: ComparisonType::Numeric,
        tolerance: Some(0.01),
        business_impact: "Freight is added to the assessable value on CIF entries",
        paths: &[
            (Invoice, "amounts.freight.amount"),
            (AirWaybill, "amounts.freight.amount"),
            (BillOfEntry, "amounts.freight.amount"),
        ],
    },
    FieldMapping {
        field: "insuranceCharges",
        category: FieldCategory::Minor,
        comparison: ComparisonType::Numeric,
        tolerance: Some(0.01),
        business_impact: "Insurance is part of the CIF assessable value",
        paths: &[
            (Invoice, "amounts.insurance.amount"),
            (BillOfEntry, "amounts.insurance.amount"),
        ],
    },
    // -- product / customs classification -----------------------------------
    FieldMapping {
        field: "goodsDescription",
        category: FieldCategory::Important,
        comparison: ComparisonType::TextSimilarity,
        tolerance: None,
        business_impact: "Description drives tariff classification review",
        paths: &[
            (Invoice, "customs.description"),
            (AirWaybill, "customs.description"),
            (HouseWaybill, "customs.description"),
            (BillOfEntry, "customs.description"),
            (PackingList, "customs.description"),
        ],
    },
    FieldMapping {
        field: "hsnCode",
        category: FieldCategory::Important,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "HSN code sets the duty rate; divergent codes mean a misclassification risk",
        paths: &[
            (Invoice, "customs.hsnCode"),
            (BillOfEntry, "customs.hsnCode"),
        ],
    },
    FieldMapping {
        field: "quantity",
        category: FieldCategory::Important,
        comparison: ComparisonType::Numeric,
        tolerance: None,
        business_impact: "Quantity discrepancies point at short shipment or split invoicing",
        paths: &[
            (Invoice, "customs.quantity"),
            (BillOfEntry, "customs.quantity"),
            (PackingList, "customs.quantity"),
        ],
    },
    FieldMapping {
        field: "unitPrice",
        category: FieldCategory::Minor,
        comparison: ComparisonType::Numeric,
        tolerance: Some(0.01),
        business_impact: "Unit price supports valuation scrutiny",
        paths: &[(Invoice, "customs.unitPrice")],
    },
    FieldMapping {
        field: "dutyAmount",
        category: FieldCategory::Important,
        comparison: ComparisonType::Numeric,
        tolerance: Some(0.01),
        business_impact: "Assessed duty must agree with the declared computation",
        paths: &[(BillOfEntry, "customs.dutyAmount.amount")],
    },
    FieldMapping {
        field: "exchangeRate",
        category: FieldCategory::Minor,
        comparison: ComparisonType::Numeric,
        tolerance: Some(0.0001),
        business_impact: "Customs exchange rate converts the invoice currency",
        paths: &[(BillOfEntry, "customs.exchangeRate")],
    },
    // -- dates ---------------------------------------------------------------
    FieldMapping {
        field: "invoiceDate",
        category: FieldCategory::Important,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Invoice date anchors the commercial timeline",
        paths: &[
            (Invoice, "dates.invoiceDate"),
            (BillOfEntry, "dates.invoiceDate"),
        ],
    },
    FieldMapping {
        field: "shipDate",
        category: FieldCategory::Important,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Ship date fixes the applicable exchange rate and transit SLA",
        paths: &[
            (AirWaybill, "dates.shipDate"),
            (HouseWaybill, "dates.shipDate"),
        ],
    },
    FieldMapping {
        field: "entryDate",
        category: FieldCategory::Important,
        comparison: ComparisonType::Exact,
        tolerance: None,
        business_impact: "Entry date determines duty rates in force",
        paths: &[(BillOfEntry, "dates.entryDate")],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_field_names_are_unique() {
        let mut names: Vec<_> = REGISTRY.iter().map(|m| m.field).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REGISTRY.len());
    }

    #[test]
    fn path_for_unmapped_type_is_none() {
        let mapping = lookup("awbNumber").unwrap();
        assert!(mapping.path_for(DocumentType::Invoice).is_none());
        assert!(mapping.path_for(DocumentType::HouseWaybill).is_some());
    }

    #[test]
    fn resolve_missing_leaf_is_none() {
        let doc = Document::new(
            "HAWB-1",
            DocumentType::HouseWaybill,
            json!({"identifiers": {}}),
        );
        assert!(lookup("awbNumber").unwrap().resolve(&doc).is_none());
    }

    #[test]
    fn resolve_unwraps_confidence() {
        let doc = Document::new(
            "HAWB-1",
            DocumentType::HouseWaybill,
            json!({"identifiers": {"awbNumber": {"value": "098-80828764", "confidence": 0.97}}}),
        );
        let leaf = lookup("awbNumber").unwrap().resolve(&doc).unwrap();
        assert_eq!(leaf.value, json!("098-80828764"));
        assert_eq!(leaf.confidence, Some(0.97));
    }

    #[test]
    fn resolve_path_walks_nesting() {
        let fields = json!({"shipment": {"grossWeight": {"value": 450.5, "unit": "KG"}}});
        assert_eq!(
            resolve_path(&fields, "shipment.grossWeight.value"),
            Some(&json!(450.5))
        );
        assert!(resolve_path(&fields, "shipment.netWeight.value").is_none());
    }

    #[test]
    fn weight_rows_carry_calibrated_tolerance() {
        assert_eq!(lookup("grossWeight").unwrap().tolerance, Some(0.5));
        assert_eq!(lookup("netWeight").unwrap().tolerance, Some(0.5));
    }
}
