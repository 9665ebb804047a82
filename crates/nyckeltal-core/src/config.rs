use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::NyckeltalError;
use crate::extraction::ocr::OcrConfig;
use crate::oracle::openai::OracleConfig;
use crate::oracle::retry::RetryConfig;
use crate::parsing::RepairConfig;
use crate::segment::SegmenterConfig;
use crate::vote::VotingConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause between two extraction calls.
    pub segment_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            segment_delay_ms: 5000,
        }
    }
}

/// Everything that tunes an analysis run. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub model: String,
    pub voting: VotingConfig,
    pub segmenter: SegmenterConfig,
    pub retry: RetryConfig,
    pub pacing: PacingConfig,
    pub repair: RepairConfig,
    /// Word in the `[<marker> <label>]` line in front of each page.
    pub page_marker: String,
    /// Word in front of merged page references, e.g. "Sida 3, 7".
    pub source_prefix: String,
    pub ocr: OcrConfig,
    pub oracle: OracleConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            voting: VotingConfig::default(),
            segmenter: SegmenterConfig::default(),
            retry: RetryConfig::default(),
            pacing: PacingConfig::default(),
            repair: RepairConfig::default(),
            page_marker: "Sida".into(),
            source_prefix: "Sida".into(),
            ocr: OcrConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

/// Load a config from a JSON file and validate it.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, NyckeltalError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| NyckeltalError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    let config: AnalysisConfig = serde_json::from_str(&content)
        .map_err(|e| NyckeltalError::Config(format!("{}: {}", path.display(), e)))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate value ranges across the config.
pub fn validate_config(config: &AnalysisConfig) -> Result<(), NyckeltalError> {
    let invalid = |msg: String| Err(NyckeltalError::Config(msg));

    if config.model.trim().is_empty() {
        return invalid("model must not be empty".into());
    }

    let voting = &config.voting;
    if voting.min_samples == 0 {
        return invalid("voting.min_samples must be at least 1".into());
    }
    if !(voting.agreement_threshold > 0.0 && voting.agreement_threshold <= 1.0) {
        return invalid(format!(
            "voting.agreement_threshold {} must be in (0, 1]",
            voting.agreement_threshold
        ));
    }
    if voting.offset_limit < 0 {
        return invalid("voting.offset_limit must not be negative".into());
    }
    if voting.year_floor > voting.year_ceiling {
        return invalid(format!(
            "voting.year_floor {} is above year_ceiling {}",
            voting.year_floor, voting.year_ceiling
        ));
    }

    if config.segmenter.max_tokens == 0 {
        return invalid("segmenter.max_tokens must be positive".into());
    }
    if let Some(overlap) = &config.segmenter.overlap {
        overlap.resolve(config.segmenter.max_tokens)?;
    }

    if config.retry.max_attempts == 0 {
        return invalid("retry.max_attempts must be at least 1".into());
    }
    if config.retry.factor < 1.0 {
        return invalid(format!("retry.factor {} must be at least 1", config.retry.factor));
    }

    if config.page_marker.trim().is_empty() {
        return invalid("page_marker must not be empty".into());
    }
    if config.ocr.gain <= 0.0 {
        return invalid("ocr.gain must be positive".into());
    }
    if config.oracle.timeout_secs == 0 {
        return invalid("oracle.timeout_secs must be positive".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Overlap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        validate_config(&AnalysisConfig::default()).unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model": "gpt-4o-mini", "segmenter": {{"overlap": "200"}}, "voting": {{"min_samples": 3}}}}"#
        )
        .unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.segmenter.overlap, Some(Overlap::Tokens(200)));
        assert_eq!(config.segmenter.max_tokens, 4000);
        assert_eq!(config.voting.min_samples, 3);
        assert_eq!(config.voting.agreement_threshold, 0.8);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_overlap_too_large_is_config_error() {
        let mut config = AnalysisConfig::default();
        config.segmenter.max_tokens = 100;
        config.segmenter.overlap = Some(Overlap::Tokens(100));
        assert!(matches!(
            validate_config(&config),
            Err(NyckeltalError::InvalidOverlap(_))
        ));
    }

    #[test]
    fn test_bad_threshold() {
        let mut config = AnalysisConfig::default();
        config.voting.agreement_threshold = 1.5;
        assert!(matches!(validate_config(&config), Err(NyckeltalError::Config(_))));
    }

    #[test]
    fn test_unreadable_file() {
        let err = load_config(Path::new("/nonexistent/nyckeltal.json")).unwrap_err();
        assert!(matches!(err, NyckeltalError::Config(_)));
    }
}
