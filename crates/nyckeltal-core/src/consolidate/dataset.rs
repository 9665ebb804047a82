use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Conflict, MetricEntry, Observation};

pub type Metrics = IndexMap<String, MetricEntry>;
pub type Years = IndexMap<String, Metrics>;

/// Extracted key figures: entity name -> year -> metric -> entry.
///
/// Every level keeps keys in the order they were first seen, starting from
/// the key order of the oracle's JSON. Serializes as the plain nested JSON
/// object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    pub entities: IndexMap<String, Years>,
}

/// One observation flattened for tabular output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub entity: String,
    pub year: String,
    pub metric: String,
    pub value: Value,
    pub source: String,
}

impl Dataset {
    /// Build a dataset from one parsed oracle response.
    ///
    /// Entities or years that are not JSON objects are skipped with a
    /// warning, as are null metric values.
    pub fn from_fragment(fragment: Map<String, Value>) -> Self {
        let mut dataset = Dataset::default();
        for (entity, years) in fragment {
            let Value::Object(years) = years else {
                tracing::warn!(%entity, "ignoring entity that is not an object");
                continue;
            };
            let mut entity_years = Years::new();
            for (year, metrics) in years {
                let Value::Object(metrics) = metrics else {
                    tracing::warn!(%entity, %year, "ignoring year that is not an object");
                    continue;
                };
                let mut year_metrics = Metrics::new();
                for (metric, raw) in metrics {
                    if raw.is_null() {
                        continue;
                    }
                    match serde_json::from_value::<MetricEntry>(raw) {
                        Ok(entry) => {
                            year_metrics.insert(metric, entry);
                        }
                        Err(e) => {
                            tracing::warn!(%entity, %year, %metric, error = %e, "ignoring unreadable value")
                        }
                    }
                }
                entity_years.insert(year, year_metrics);
            }
            dataset.entities.insert(entity, entity_years);
        }
        dataset
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Deep merge `other` into `self`.
    ///
    /// Mappings merge key by key. Where both sides hold a metric with
    /// differing observations, the incoming ones are appended to the
    /// existing entry as a conflict list; nothing is overwritten. Returns
    /// one [`Conflict`] per appended observation.
    pub fn merge(&mut self, other: Dataset) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for (entity, years) in other.entities {
            let target_years = self.entities.entry(entity.clone()).or_default();
            for (year, metrics) in years {
                let target = target_years.entry(year.clone()).or_default();
                for (metric, entry) in metrics {
                    conflicts.extend(merge_entry(target, &entity, &year, metric, entry));
                }
            }
        }
        conflicts
    }

    /// Merge datasets in order into one.
    pub fn merge_all(datasets: impl IntoIterator<Item = Dataset>) -> (Dataset, Vec<Conflict>) {
        let mut merged = Dataset::default();
        let mut conflicts = Vec::new();
        for dataset in datasets {
            conflicts.extend(merged.merge(dataset));
        }
        (merged, conflicts)
    }

    /// Number of stored observations, counting each conflict candidate.
    pub fn observation_count(&self) -> usize {
        self.entries().map(|(_, _, _, e)| e.observations().len()).sum()
    }

    /// Number of metrics currently holding more than one candidate.
    pub fn conflict_count(&self) -> usize {
        self.entries().filter(|(_, _, _, e)| e.is_conflict()).count()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str, &MetricEntry)> {
        self.entities.iter().flat_map(|(entity, years)| {
            years.iter().flat_map(move |(year, metrics)| {
                metrics
                    .iter()
                    .map(move |(metric, entry)| (entity.as_str(), year.as_str(), metric.as_str(), entry))
            })
        })
    }

    /// One row per observation; a conflict yields one row per candidate.
    pub fn rows(&self) -> Vec<Row> {
        self.entries()
            .flat_map(|(entity, year, metric, entry)| {
                entry.observations().iter().map(move |obs| Row {
                    entity: entity.to_string(),
                    year: year.to_string(),
                    metric: metric.to_string(),
                    value: obs.value().clone(),
                    source: obs.source().unwrap_or_default().to_string(),
                })
            })
            .collect()
    }
}

/// Merge one incoming metric entry into `target`, absorbing differing
/// observations into a conflict list.
pub(crate) fn merge_entry(
    target: &mut Metrics,
    entity: &str,
    year: &str,
    metric: String,
    incoming: MetricEntry,
) -> Vec<Conflict> {
    let observations: Vec<Observation> = incoming
        .into_observations()
        .into_iter()
        .filter(|o| !o.is_null())
        .collect();
    let Some(existing) = target.get_mut(&metric) else {
        match observations.len() {
            0 => {}
            1 => {
                let single = observations.into_iter().next().map(MetricEntry::Single);
                if let Some(entry) = single {
                    target.insert(metric, entry);
                }
            }
            _ => {
                target.insert(metric, MetricEntry::Conflict(observations));
            }
        }
        return Vec::new();
    };

    let mut conflicts = Vec::new();
    for obs in observations {
        let before = existing.clone();
        if !existing.absorb(vec![obs.clone()]).is_empty() {
            conflicts.push(Conflict {
                entity: entity.to_string(),
                year: year.to_string(),
                metric: metric.clone(),
                existing: before,
                incoming: obs,
            });
        }
    }
    conflicts
}
