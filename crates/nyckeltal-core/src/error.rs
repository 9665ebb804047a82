use std::path::PathBuf;

use crate::oracle::OracleError;

#[derive(Debug, thiserror::Error)]
pub enum NyckeltalError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid overlap: {0}")]
    InvalidOverlap(String),

    #[error("input path does not exist: {0}")]
    MissingInput(PathBuf),

    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("failed to load metric dictionary from {path}: {reason}")]
    MetricsLoad { path: PathBuf, reason: String },

    #[error("invalid metric dictionary: {0}")]
    MetricsInvalid(String),

    #[error("oracle call failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("oracle call failed after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: OracleError },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NyckeltalError {
    /// The oracle answered, but the answer cannot be used: it was cut short
    /// (even after retries) or could not be read. Such an answer costs one
    /// segment, not the run.
    pub fn is_unusable_response(&self) -> bool {
        match self {
            NyckeltalError::Oracle(e) | NyckeltalError::RetriesExhausted { last: e, .. } => {
                matches!(e, OracleError::Truncated { .. } | OracleError::Malformed(_))
            }
            _ => false,
        }
    }
}
