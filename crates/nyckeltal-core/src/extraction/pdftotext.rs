use crate::error::NyckeltalError;
use crate::extraction::{Page, PdfExtractor};
use std::io::Write;
use std::process::Command;

/// PDF extraction backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -layout` so that table rows keep their label and figures
/// on one line.
pub struct PdftotextExtractor {
    layout: bool,
}

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor { layout: true }
    }

    /// Use pdftotext's reading-order mode instead of `-layout`.
    pub fn reading_order() -> Self {
        PdftotextExtractor { layout: false }
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<Page>, NyckeltalError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| NyckeltalError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| NyckeltalError::Extraction(e.to_string()))?;

        let mut cmd = Command::new("pdftotext");
        if self.layout {
            cmd.arg("-layout");
        }
        let output = cmd
            .arg(tmpfile.path())
            .arg("-") // output to stdout
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    NyckeltalError::PdftotextNotFound
                } else {
                    NyckeltalError::Extraction(format!("pdftotext failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(NyckeltalError::PdftotextFailed { code, stderr });
        }

        Ok(split_pages(&String::from_utf8_lossy(&output.stdout)))
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Split pdftotext output into pages on form feeds.
///
/// pdftotext terminates every page with `\x0c`, so the piece after the last
/// form feed is dropped when empty.
fn split_pages(text: &str) -> Vec<Page> {
    let mut pieces: Vec<&str> = text.split('\x0c').collect();
    if pieces.len() > 1 && pieces.last().is_some_and(|p| p.trim().is_empty()) {
        pieces.pop();
    }
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, page_text)| Page::new(i + 1, page_text.trim_end()))
        .collect()
}
