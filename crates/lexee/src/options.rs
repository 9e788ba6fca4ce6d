//! Engine options

use crate::error::{EngineError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

/// Options for formula execution
///
/// Loaded from JSON with every field optional:
///
/// ```json
/// { "random_seed": 42, "today": "2025-06-15", "log_results": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOptions {
    /// Seed for random-generation formulas (None = entropy)
    pub random_seed: Option<u64>,
    /// Date reported as "today" (None = local calendar date)
    pub today: Option<NaiveDate>,
    /// Log result field names (never values) after each call
    pub log_results: bool,
}

impl EngineOptions {
    /// Read options from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|err| match err {
            EngineError::Options { source, .. } => EngineError::Options {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse options from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| EngineError::Options {
            path: Default::default(),
            source,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::from_json_str("{}").unwrap();
        assert_eq!(options, EngineOptions::default());
        assert!(!options.log_results);
    }

    #[test]
    fn test_parse_all_fields() {
        let options = EngineOptions::from_json_str(
            r#"{"random_seed": 42, "today": "2025-06-15", "log_results": true}"#,
        )
        .unwrap();
        assert_eq!(options.random_seed, Some(42));
        assert_eq!(options.today, NaiveDate::from_ymd_opt(2025, 6, 15));
        assert!(options.log_results);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(EngineOptions::from_json_str(r#"{"seed": 1}"#).is_err());
    }
}
