pub mod analysis;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod extraction;
pub mod metrics;
pub mod model;
pub mod oracle;
pub mod parsing;
pub mod prompts;
pub mod segment;
pub mod vote;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use analysis::{Analyzer, DocumentOutcome, RunOutcome};
use error::NyckeltalError;
use extraction::PdfExtractor;
use model::Document;

/// Resolve input paths to the PDF files to analyze.
///
/// A file is taken as is; a directory is searched recursively for `*.pdf`
/// (any case). The result is sorted and free of duplicates so documents are
/// always processed in the same order.
pub fn discover_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, NyckeltalError> {
    let options = glob::MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };
    let mut found = BTreeSet::new();

    for path in paths {
        if path.is_file() {
            found.insert(path.clone());
        } else if path.is_dir() {
            let pattern = format!(
                "{}/**/*.pdf",
                glob::Pattern::escape(&path.to_string_lossy())
            );
            let matches = glob::glob_with(&pattern, options)
                .map_err(|e| NyckeltalError::Config(format!("invalid search pattern {pattern}: {e}")))?;
            for entry in matches {
                match entry {
                    Ok(p) if p.is_file() => {
                        found.insert(p);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
                }
            }
        } else {
            return Err(NyckeltalError::MissingInput(path.clone()));
        }
    }

    tracing::info!(files = found.len(), "discovered input PDFs");
    Ok(found.into_iter().collect())
}

/// Read a PDF and extract its pages.
pub fn read_document(path: &Path, extractor: &dyn PdfExtractor) -> Result<Document, NyckeltalError> {
    let bytes = std::fs::read(path)?;
    let pages = extractor.extract_pages(&bytes)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    tracing::debug!(name = %name, pages = pages.len(), backend = extractor.backend_name(), "extracted text");
    Ok(Document::new(name, pages))
}

/// Main API entry point: analyze a set of PDF files.
///
/// Files whose text cannot be extracted are recorded as skipped and the run
/// continues. The returned dataset is `None` when no document yielded any
/// key figures.
pub fn analyze_pdfs(
    paths: &[PathBuf],
    extractor: &dyn PdfExtractor,
    analyzer: &Analyzer<'_>,
) -> Result<RunOutcome, NyckeltalError> {
    let mut run = analyzer.start();
    for path in paths {
        match read_document(path, extractor) {
            Ok(document) => run.add(&document)?,
            Err(e) => run.skip(DocumentOutcome::SkippedUnreadable {
                name: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
    Ok(run.finish())
}
