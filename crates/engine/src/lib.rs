//! `docrecon-engine` — Cross-document consistency engine for trade and
//! logistics documents.
//!
//! Pure engine crate: receives pre-extracted documents, returns consistency
//! reports. No CLI or IO dependencies, and no clock access, so identical
//! inputs give identical output bytes.

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod hsn;
pub mod model;
pub mod registry;
pub mod relationship;
pub mod report;
pub mod rules;

pub use config::EngineConfig;
pub use engine::compare_documents;
pub use error::EngineError;
pub use model::{ConsistencyReport, Document, DocumentType, RiskLevel};
pub use relationship::{validate_shipment_consistency, ShipmentDocuments};
pub use report::{merge_validation, render, ReportFormat};
pub use rules::{document_quality, QualityScore};
