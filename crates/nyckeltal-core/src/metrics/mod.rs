pub mod builtin;
pub mod schema;

use crate::error::NyckeltalError;
use schema::MetricDictionary;
use std::collections::HashMap;
use std::path::Path;

/// Load a metric dictionary from a JSON file.
pub fn load_metrics(path: &Path) -> Result<MetricDictionary, NyckeltalError> {
    let content = std::fs::read_to_string(path).map_err(|e| NyckeltalError::MetricsLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_metrics(&content, path)
}

/// Parse a metric dictionary from a JSON string read from `source`.
pub fn parse_metrics(json: &str, source: &Path) -> Result<MetricDictionary, NyckeltalError> {
    let dict: MetricDictionary =
        serde_json::from_str(json).map_err(|e| NyckeltalError::MetricsLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_metrics(&dict)?;
    Ok(dict)
}

/// Parse a metric dictionary from a JSON string (no file path context).
pub fn parse_metrics_str(json: &str) -> Result<MetricDictionary, NyckeltalError> {
    let dict: MetricDictionary = serde_json::from_str(json)?;
    validate_metrics(&dict)?;
    Ok(dict)
}

/// Validate that a metric dictionary is well-formed: at least one metric,
/// non-empty unique names, and no label claimed by two metrics.
pub fn validate_metrics(dict: &MetricDictionary) -> Result<(), NyckeltalError> {
    if dict.is_empty() {
        return Err(NyckeltalError::MetricsInvalid(
            "metric list must not be empty".into(),
        ));
    }

    let mut owners: HashMap<String, &str> = HashMap::new();
    for metric in dict.iter() {
        if metric.name.trim().is_empty() {
            return Err(NyckeltalError::MetricsInvalid(
                "metric name must not be empty".into(),
            ));
        }
        if metric.group.trim().is_empty() {
            return Err(NyckeltalError::MetricsInvalid(format!(
                "metric '{}' has no group",
                metric.name
            )));
        }

        let mut own_labels: Vec<String> = Vec::new();
        for label in metric.labels() {
            let key = label.trim().to_lowercase();
            if key.is_empty() {
                return Err(NyckeltalError::MetricsInvalid(format!(
                    "metric '{}' has an empty alias",
                    metric.name
                )));
            }
            if own_labels.contains(&key) {
                continue;
            }
            if let Some(owner) = owners.get(&key) {
                return Err(NyckeltalError::MetricsInvalid(format!(
                    "label '{}' is used by both '{}' and '{}'",
                    label, owner, metric.name
                )));
            }
            own_labels.push(key);
        }
        for key in own_labels {
            owners.insert(key, &metric.name);
        }
    }

    Ok(())
}
