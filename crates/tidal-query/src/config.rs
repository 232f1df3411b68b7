//! Query configuration - can be loaded from YAML

use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Query engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Group-by settings
    pub group_by: GroupBySettings,
}

/// Group-by settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupBySettings {
    /// Upper bound on the number of windows one query may produce
    pub max_windows: u64,
}

impl Default for GroupBySettings {
    fn default() -> Self {
        Self {
            max_windows: 1_000_000,
        }
    }
}

impl QueryConfig {
    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            QueryError::Config(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| QueryError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_section_missing() {
        let config = QueryConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, QueryConfig::default());
        assert_eq!(config.group_by.max_windows, 1_000_000);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "group_by:\n  max_windows: 42").unwrap();

        let config = QueryConfig::from_file(file.path()).unwrap();
        assert_eq!(config.group_by.max_windows, 42);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            QueryConfig::from_yaml_str("group_by: [1, 2"),
            Err(QueryError::Config(_))
        ));
        assert!(matches!(
            QueryConfig::from_file("/nonexistent/tidal.yml"),
            Err(QueryError::Config(_))
        ));
    }
}
