use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::extraction::Page;

/// One input report: its pages in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// File name the document was read from.
    pub name: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            name: name.into(),
            pages,
        }
    }

    /// True if at least one page has non-whitespace text.
    pub fn has_text(&self) -> bool {
        self.pages.iter().any(|p| !p.text.trim().is_empty())
    }
}

/// A single extracted figure with its provenance.
///
/// Read from either English or Swedish field names (`värde`, `källa`,
/// `säkerhet`, `kommentar`); a JSON object without a value is not a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ValueRecord {
    pub value: Value,
    /// Page reference(s), e.g. "Sida 3, 7".
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certainty: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Value>,
    /// Any other keys the oracle attached; carried through untouched.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ValueRecord {
    pub fn new(value: impl Into<Value>, source: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: source.into(),
            certainty: None,
            comment: None,
            extra: IndexMap::new(),
        }
    }
}

impl TryFrom<Map<String, Value>> for ValueRecord {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut take = |keys: [&str; 2]| keys.iter().find_map(|k| map.shift_remove(*k));
        let value = take(["value", "värde"]).ok_or("value-record without a value")?;
        let source = take(["source", "källa"])
            .map(source_text)
            .unwrap_or_default();
        let certainty = take(["certainty", "säkerhet"]);
        let comment = take(["comment", "kommentar"]);
        Ok(Self {
            value,
            source,
            certainty,
            comment,
            extra: map.into_iter().collect(),
        })
    }
}

/// Accepts a string, a number, or a list of either for `source`.
fn source_text(raw: Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(&other),
    }
}

pub(crate) fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// What one fragment said about one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    Record(ValueRecord),
    Scalar(Value),
}

impl Observation {
    pub fn is_null(&self) -> bool {
        matches!(self, Observation::Scalar(Value::Null))
    }

    pub fn value(&self) -> &Value {
        match self {
            Observation::Record(r) => &r.value,
            Observation::Scalar(v) => v,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Observation::Record(r) if !r.source.trim().is_empty() => Some(r.source.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Record(r) if r.source.is_empty() => write!(f, "{}", scalar_text(&r.value)),
            Observation::Record(r) => write!(f, "{} ({})", scalar_text(&r.value), r.source),
            Observation::Scalar(v) => write!(f, "{}", scalar_text(v)),
        }
    }
}

/// The stored state of one (entity, year, metric) key: either a single
/// observation or the ordered list of competing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricEntry {
    Conflict(Vec<Observation>),
    Single(Observation),
}

impl MetricEntry {
    pub fn observations(&self) -> &[Observation] {
        match self {
            MetricEntry::Conflict(list) => list,
            MetricEntry::Single(obs) => std::slice::from_ref(obs),
        }
    }

    pub fn into_observations(self) -> Vec<Observation> {
        match self {
            MetricEntry::Conflict(list) => list,
            MetricEntry::Single(obs) => vec![obs],
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, MetricEntry::Conflict(list) if list.len() > 1)
    }

    /// Append every incoming observation not already present, turning a
    /// single value into a conflict list when needed. Returns the
    /// observations that were appended; nothing is ever replaced.
    pub fn absorb(&mut self, incoming: Vec<Observation>) -> Vec<Observation> {
        let mut added = Vec::new();
        for obs in incoming {
            if obs.is_null() || self.observations().contains(&obs) {
                continue;
            }
            if let MetricEntry::Single(existing) = self {
                let first = existing.clone();
                *self = MetricEntry::Conflict(vec![first]);
            }
            if let MetricEntry::Conflict(list) = self {
                list.push(obs.clone());
            }
            added.push(obs);
        }
        added
    }
}

/// Two fragments disagreeing on the same (entity, year, metric) key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub entity: String,
    pub year: String,
    pub metric: String,
    pub existing: MetricEntry,
    pub incoming: Observation,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let existing: Vec<String> = self
            .existing
            .observations()
            .iter()
            .map(|o| o.to_string())
            .collect();
        write!(
            f,
            "{} / {}: [{}] vs {}",
            self.year,
            self.metric,
            existing.join("; "),
            self.incoming
        )
    }
}
