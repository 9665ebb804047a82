use serde::{Deserialize, Serialize};

/// One key figure the oracle is asked to extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDef {
    pub name: String,
    /// Other labels the figure appears under in reports.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Heading the figure is listed under in tabular output.
    pub group: String,
}

impl MetricDef {
    /// Name followed by aliases.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn is_known_as(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        self.labels().any(|l| l.to_lowercase() == label)
    }
}

/// Ordered list of metric definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricDictionary {
    pub metrics: Vec<MetricDef>,
}

impl MetricDictionary {
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricDef> {
        self.metrics.iter()
    }

    /// Every name and alias, for line repair.
    pub fn labels(&self) -> Vec<String> {
        self.metrics
            .iter()
            .flat_map(|m| m.labels().map(str::to_string))
            .collect()
    }

    /// Definition a dataset metric key refers to (by name or alias,
    /// ignoring case).
    pub fn lookup(&self, key: &str) -> Option<&MetricDef> {
        self.metrics.iter().find(|m| m.is_known_as(key))
    }

    pub fn group_of(&self, key: &str) -> Option<&str> {
        self.lookup(key).map(|m| m.group.as_str())
    }

    /// Pretty JSON for the system prompt, non-ASCII kept as is.
    pub fn to_prompt_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
