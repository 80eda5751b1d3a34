use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// Fewer than two documents were supplied to `compare_documents`.
    InsufficientDocuments { supplied: usize },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (threshold out of range, inverted bands, etc.).
    ConfigValidation(String),
    /// Report serialization error.
    Render(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientDocuments { supplied } => write!(
                f,
                "need at least two successfully extracted documents, got {supplied}"
            ),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Render(msg) => write!(f, "report render error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
