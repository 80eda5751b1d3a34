//! Loading extraction JSON files from disk.

use std::path::Path;

use docrecon_engine::Document;

use crate::exit_codes::EXIT_PARSE;
use crate::CliError;

/// Read one extraction JSON file into a document.
pub fn load_document(path: &Path) -> Result<Document, CliError> {
    let data = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_PARSE,
        message: format!("cannot read {}: {e}", path.display()),
        hint: None,
    })?;
    serde_json::from_str(&data).map_err(|e| CliError {
        code: EXIT_PARSE,
        message: format!("cannot parse {}: {e}", path.display()),
        hint: Some(
            "expected extraction JSON with documentName, documentType and fields".into(),
        ),
    })
}

pub fn load_documents(paths: &[impl AsRef<Path>]) -> Result<Vec<Document>, CliError> {
    paths.iter().map(|p| load_document(p.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrecon_engine::DocumentType;
    use std::io::Write;

    #[test]
    fn load_valid_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"documentName": "INV-1.pdf", "documentType": "invoice",
                "fields": {{"identifiers": {{"invoiceNumber": "INV-1"}}}}}}"#
        )
        .unwrap();
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.name, "INV-1.pdf");
        assert_eq!(doc.doc_type, DocumentType::Invoice);
    }

    #[test]
    fn missing_file_is_parse_exit() {
        let err = load_document(Path::new("/nonexistent/doc.json")).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE);
        assert!(err.message.contains("cannot read"));
    }

    #[test]
    fn malformed_json_carries_hint() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = load_document(file.path()).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE);
        assert!(err.hint.is_some());
    }

    #[test]
    fn unknown_document_type_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"documentName": "X", "documentType": "fax_coversheet", "fields": {{}}}}"#
        )
        .unwrap();
        let err = load_document(file.path()).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE);
    }
}
