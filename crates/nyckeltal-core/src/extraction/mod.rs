pub mod labels;
pub mod ocr;
pub mod pdftotext;

use serde::{Deserialize, Serialize};

use crate::error::NyckeltalError;

/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Physical page number, 1-based, in document order.
    pub number: usize,
    pub text: String,
}

impl Page {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Trait for PDF text extraction backends.
pub trait PdfExtractor {
    /// Extract text content from PDF bytes, returning one Page per page.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<Page>, NyckeltalError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
