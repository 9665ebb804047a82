pub mod dataset;
pub mod entity;
pub mod resolve;

pub use dataset::{Dataset, Row};
pub use entity::{consolidate, preferred_name};
pub use resolve::resolve;

use serde::Serialize;

use crate::model::Conflict;

/// One document's fragments folded into a single-entity dataset.
#[derive(Debug, Clone, Serialize)]
pub struct Consolidation {
    pub dataset: Dataset,
    /// Every disagreement seen while merging, in the order found.
    pub conflicts: Vec<Conflict>,
    /// Records absorbed by conflict resolution.
    pub merged: usize,
}

/// Merge a document's fragments, fold entity aliases into the preferred
/// name, and resolve conflicts if any were found.
///
/// Returns `None` when the fragments hold no entity at all.
pub fn consolidate_fragments(fragments: Vec<Dataset>, source_prefix: &str) -> Option<Consolidation> {
    let (merged, mut conflicts) = Dataset::merge_all(fragments);
    let (dataset, folded) = consolidate(merged)?;
    conflicts.extend(folded);

    if conflicts.is_empty() {
        return Some(Consolidation {
            dataset,
            conflicts,
            merged: 0,
        });
    }

    tracing::warn!(conflicts = conflicts.len(), "merging fragments produced conflicts");
    for conflict in &conflicts {
        tracing::debug!(%conflict, "conflict");
    }
    let (dataset, merged) = resolve(dataset, source_prefix);
    if merged > 0 {
        tracing::info!(merged, "merged duplicate values");
    } else {
        tracing::warn!("no conflicting values could be merged");
    }
    Some(Consolidation {
        dataset,
        conflicts,
        merged,
    })
}
