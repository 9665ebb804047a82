use super::dataset::{merge_entry, Dataset, Years};
use crate::model::Conflict;

/// The name kept for an entity reported under several aliases: the
/// longest by character count, the first encountered among equals.
pub fn preferred_name(dataset: &Dataset) -> Option<&str> {
    dataset
        .entities
        .keys()
        .fold(None, |best: Option<&String>, name| match best {
            Some(b) if b.chars().count() >= name.chars().count() => Some(b),
            _ => Some(name),
        })
        .map(String::as_str)
}

/// Fold every entity of a document's dataset into the preferred name.
///
/// Returns `None` for an empty dataset. Otherwise the merged dataset has
/// exactly one entity; observations that disagree with one already stored
/// under the same year and metric are appended to a conflict list and
/// reported.
pub fn consolidate(dataset: Dataset) -> Option<(Dataset, Vec<Conflict>)> {
    let preferred = preferred_name(&dataset)?.to_string();

    let mut merged = Years::new();
    let mut conflicts = Vec::new();
    for (name, years) in dataset.entities {
        if name != preferred {
            tracing::debug!(alias = %name, preferred = %preferred, "folding entity alias");
        }
        for (year, metrics) in years {
            let target = merged.entry(year.clone()).or_default();
            for (metric, entry) in metrics {
                conflicts.extend(merge_entry(target, &preferred, &year, metric, entry));
            }
        }
    }

    let mut out = Dataset::default();
    out.entities.insert(preferred, merged);
    Some((out, conflicts))
}
