use serde::{Deserialize, Serialize};
use std::process::Command;

use crate::error::NyckeltalError;
use crate::extraction::{Page, PdfExtractor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    /// Tesseract language code passed to ocrmypdf.
    pub language: String,
    /// Minimum text growth factor before the OCR text is preferred.
    pub gain: f64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            language: "swe".into(),
            gain: 1.5,
        }
    }
}

/// Wraps another extractor and re-reads the PDF after running `ocrmypdf`,
/// keeping whichever version yields substantially more text.
///
/// Scanned annual reports often carry only a thin text layer (headers,
/// page numbers); the OCR pass recovers the tables.
pub struct OcrEnhancedExtractor<E> {
    inner: E,
    config: OcrConfig,
}

impl<E: PdfExtractor> OcrEnhancedExtractor<E> {
    pub fn new(inner: E, config: OcrConfig) -> Self {
        Self { inner, config }
    }

    fn ocr_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<Page>, NyckeltalError> {
        let dir = tempfile::tempdir().map_err(|e| NyckeltalError::OcrFailed(e.to_string()))?;
        let input = dir.path().join("input.pdf");
        let output = dir.path().join("input_ocr.pdf");
        std::fs::write(&input, pdf_bytes)?;

        let result = Command::new("ocrmypdf")
            .arg("--language")
            .arg(&self.config.language)
            .arg("--deskew")
            .arg("--force-ocr")
            .arg(&input)
            .arg(&output)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    NyckeltalError::OcrFailed("ocrmypdf not found".into())
                } else {
                    NyckeltalError::OcrFailed(e.to_string())
                }
            })?;

        if !result.status.success() {
            return Err(NyckeltalError::OcrFailed(
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }

        let ocr_bytes = std::fs::read(&output)?;
        self.inner.extract_pages(&ocr_bytes)
    }
}

impl<E: PdfExtractor> PdfExtractor for OcrEnhancedExtractor<E> {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<Page>, NyckeltalError> {
        let original = self.inner.extract_pages(pdf_bytes)?;
        if !self.config.enabled {
            return Ok(original);
        }

        match self.ocr_pages(pdf_bytes) {
            Ok(ocr) => Ok(prefer_richer(original, ocr, self.config.gain)),
            Err(e) => {
                tracing::warn!(error = %e, "OCR failed, using original text");
                Ok(original)
            }
        }
    }

    fn backend_name(&self) -> &str {
        if self.config.enabled {
            "ocrmypdf"
        } else {
            self.inner.backend_name()
        }
    }
}

fn text_len(pages: &[Page]) -> usize {
    pages.iter().map(|p| p.text.trim().chars().count()).sum()
}

/// Pick the OCR pages only if they hold more than `gain` times the text.
fn prefer_richer(original: Vec<Page>, ocr: Vec<Page>, gain: f64) -> Vec<Page> {
    let original_len = text_len(&original);
    let ocr_len = text_len(&ocr);
    tracing::info!(original_len, ocr_len, "compared OCR text length");
    if ocr_len as f64 > original_len as f64 * gain {
        tracing::info!("using OCR-enhanced text");
        ocr
    } else {
        tracing::info!("OCR did not significantly improve content, using original");
        original
    }
}
