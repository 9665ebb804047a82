pub mod analyze;
pub mod config;
pub mod metrics;
pub mod segment;

use nyckeltal_core::config::{load_config, AnalysisConfig};
use nyckeltal_core::error::NyckeltalError;
use nyckeltal_core::metrics::builtin::builtin_metrics;
use nyckeltal_core::metrics::load_metrics;
use nyckeltal_core::metrics::schema::MetricDictionary;
use std::path::Path;

pub(crate) fn config_or_default(path: Option<&Path>) -> Result<AnalysisConfig, NyckeltalError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(AnalysisConfig::default()),
    }
}

pub(crate) fn metrics_or_builtin(path: Option<&Path>) -> Result<MetricDictionary, NyckeltalError> {
    match path {
        Some(path) => load_metrics(path),
        None => builtin_metrics(),
    }
}
