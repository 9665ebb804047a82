use rust_decimal::Decimal;
use serde_json::Value;
use std::cmp::Ordering;

use super::dataset::{Dataset, Metrics};
use crate::model::{MetricEntry, Observation, ValueRecord};
use crate::parsing::{scaled_amount_of, Scale};

/// What two observations are compared on: the parsed amount and its unit
/// scale when there is one, so that `"100"`, `100` and `"100 kr"` agree but
/// `"820 tkr"` and `"820 mkr"` do not; otherwise the raw value.
#[derive(Debug, Clone, PartialEq)]
enum ValueKey {
    Amount(Decimal, Scale),
    Raw(Value),
}

impl ValueKey {
    fn of(value: &Value) -> Self {
        match scaled_amount_of(value) {
            Some((amount, scale)) => ValueKey::Amount(amount, scale),
            None => ValueKey::Raw(value.clone()),
        }
    }
}

/// Collapse conflict lists whose candidates agree on the value.
///
/// For every metric holding a list of value-records, records with the same
/// value become one record carrying the union of their page references.
/// Distinct values all survive, as a list when there is more than one.
/// A single record whose metric name is a prefix of other metric names in
/// the same year also picks up the sources of those that agree with it;
/// the longer-named metrics stay in place.
///
/// Returns the resolved dataset and how many records were absorbed into
/// another record with the same value.
pub fn resolve(mut dataset: Dataset, source_prefix: &str) -> (Dataset, usize) {
    let mut merged = 0;
    for years in dataset.entities.values_mut() {
        for metrics in years.values_mut() {
            merged += resolve_year(metrics, source_prefix);
        }
    }
    (dataset, merged)
}

fn resolve_year(metrics: &mut Metrics, prefix: &str) -> usize {
    let mut merged = 0;
    let keys: Vec<String> = metrics.keys().cloned().collect();

    for key in &keys {
        let Some(entry) = metrics.get(key) else {
            continue;
        };
        match entry {
            MetricEntry::Conflict(list) if list.len() > 1 => {
                let Some(records) = all_records(list) else {
                    continue;
                };
                let (entry, absorbed) = group_records(records, prefix);
                merged += absorbed;
                metrics.insert(key.clone(), entry);
            }
            MetricEntry::Single(Observation::Record(primary)) => {
                let primary_key = ValueKey::of(&primary.value);
                let agreeing: Vec<&str> = keys
                    .iter()
                    .filter(|alt| *alt != key && alt.starts_with(key.as_str()))
                    .filter_map(|alt| match metrics.get(alt) {
                        Some(MetricEntry::Single(Observation::Record(r)))
                            if ValueKey::of(&r.value) == primary_key =>
                        {
                            Some(r.source.as_str())
                        }
                        _ => None,
                    })
                    .collect();
                if agreeing.is_empty() {
                    continue;
                }
                tracing::debug!(metric = %key, similar = agreeing.len(), "linking sources of similar metrics");
                let mut record = primary.clone();
                record.source = join_sources(
                    std::iter::once(primary.source.as_str()).chain(agreeing),
                    prefix,
                );
                metrics.insert(key.clone(), MetricEntry::Single(Observation::Record(record)));
            }
            _ => {}
        }
    }
    merged
}

fn all_records(list: &[Observation]) -> Option<Vec<ValueRecord>> {
    list.iter()
        .map(|obs| match obs {
            Observation::Record(r) => Some(r.clone()),
            Observation::Scalar(_) => None,
        })
        .collect()
}

/// Group records by value in first-seen order. Returns the new entry and
/// the number of records absorbed.
fn group_records(records: Vec<ValueRecord>, prefix: &str) -> (MetricEntry, usize) {
    let mut groups: Vec<(ValueKey, Vec<ValueRecord>)> = Vec::new();
    for record in records {
        let key = ValueKey::of(&record.value);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(record),
            None => groups.push((key, vec![record])),
        }
    }

    let mut absorbed = 0;
    let mut resolved: Vec<Observation> = Vec::with_capacity(groups.len());
    for (_, members) in groups {
        absorbed += members.len() - 1;
        let source = join_sources(members.iter().map(|r| r.source.as_str()), prefix);
        let mut iter = members.into_iter();
        if let Some(mut first) = iter.next() {
            first.source = source;
            resolved.push(Observation::Record(first));
        }
    }

    let entry = if resolved.len() == 1 {
        MetricEntry::Single(resolved.remove(0))
    } else {
        MetricEntry::Conflict(resolved)
    };
    (entry, absorbed)
}

/// Union of page references, e.g. `["Sida 7", "Sida 3, 7"]` -> `"Sida 3, 7"`.
pub fn join_sources<'s>(sources: impl IntoIterator<Item = &'s str>, prefix: &str) -> String {
    let mut pages: Vec<String> = Vec::new();
    for source in sources {
        for part in source.split(',') {
            let page = strip_prefix(part.trim(), prefix);
            if !page.is_empty() && !pages.iter().any(|p| p == page) {
                pages.push(page.to_string());
            }
        }
    }
    if pages.is_empty() {
        return String::new();
    }
    pages.sort_by(|a, b| page_order(a, b));
    if prefix.is_empty() {
        pages.join(", ")
    } else {
        format!("{} {}", prefix, pages.join(", "))
    }
}

fn strip_prefix<'a>(part: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return part;
    }
    match part.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => part[prefix.len()..]
            .trim_start_matches(|c: char| c == '.' || c == ':')
            .trim(),
        _ => part,
    }
}

/// Numbers first in numeric order, then other labels (Roman numerals,
/// free text) alphabetically.
fn page_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
