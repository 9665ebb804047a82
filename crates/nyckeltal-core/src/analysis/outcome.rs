use serde::Serialize;

use crate::consolidate::Dataset;

/// What happened to one input document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Analyzed(DocumentReport),
    /// No page had any text (typically a scan without a text layer).
    SkippedEmpty { name: String },
    /// The file could not be read or its text could not be extracted.
    SkippedUnreadable { name: String, reason: String },
}

impl DocumentOutcome {
    pub fn name(&self) -> &str {
        match self {
            DocumentOutcome::Analyzed(report) => &report.name,
            DocumentOutcome::SkippedEmpty { name } => name,
            DocumentOutcome::SkippedUnreadable { name, .. } => name,
        }
    }

    pub fn is_skipped(&self) -> bool {
        !matches!(self, DocumentOutcome::Analyzed(_))
    }
}

/// Facts about an analyzed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub name: String,
    /// Inferred page-numbering offset.
    pub offset: i32,
    /// Inferred reporting year, if any page revealed one.
    pub year: Option<i32>,
    pub segments: usize,
    /// Segments whose response parsed into a fragment.
    pub fragments: usize,
    /// Segments whose response was not a JSON object.
    pub skipped_segments: usize,
    pub conflicts: usize,
    /// Records absorbed by conflict resolution.
    pub merged: usize,
    /// Entity the document's figures were filed under.
    pub entity: Option<String>,
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    /// `None` when no document produced any fragment, as opposed to an
    /// analyzed but empty dataset.
    pub dataset: Option<Dataset>,
    pub documents: Vec<DocumentOutcome>,
}

impl RunOutcome {
    pub fn analyzed(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents.iter().filter_map(|d| match d {
            DocumentOutcome::Analyzed(report) => Some(report),
            _ => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.documents.iter().filter(|d| d.is_skipped()).count()
    }
}
