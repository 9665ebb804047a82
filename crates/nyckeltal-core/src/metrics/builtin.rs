use crate::error::NyckeltalError;
use crate::metrics::parse_metrics_str;
use crate::metrics::schema::MetricDictionary;

const NYCKELTAL_JSON: &str = include_str!("../../../../metrics/nyckeltal.json");

/// The metric dictionary shipped with the crate.
pub fn builtin_metrics() -> Result<MetricDictionary, NyckeltalError> {
    parse_metrics_str(NYCKELTAL_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let dict = builtin_metrics().unwrap();
        assert!(!dict.is_empty());
        assert_eq!(dict.group_of("Förvaltningsavgift"), Some("Avgifter"));
    }

    #[test]
    fn test_builtin_alias_lookup() {
        let dict = builtin_metrics().unwrap();
        assert_eq!(
            dict.lookup("nav-kurs").map(|m| m.name.as_str()),
            Some("Andelsvärde")
        );
    }
}
