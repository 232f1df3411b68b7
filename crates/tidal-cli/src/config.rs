//! CLI configuration - can be loaded from YAML

use serde::{Deserialize, Serialize};
use std::path::Path;
use tidal_query::QueryConfig;
use tracing::Level;

/// Complete CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Logging configuration
    pub logging: LoggingSettings,
    /// Query engine configuration
    pub query: QueryConfig,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Include target in logs
    pub show_target: bool,
    /// Include thread IDs in logs
    pub show_thread_ids: bool,
    /// Include file and line numbers
    pub show_location: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_location: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: CliConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, falling back to defaults otherwise
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to load {}: {}", path.display(), e);
                eprintln!("Using default configuration");
                Self::default()
            }
        }
    }

    pub fn log_level(&self) -> Level {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Write the default configuration as YAML
    pub fn write_default(path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(&CliConfig::default())?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_or_default(&dir.path().join("tidal.yml"));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.query.group_by.max_windows, 1_000_000);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidal.yml");
        std::fs::write(&path, "logging:\n  level: debug\nquery:\n  group_by:\n    max_windows: 10\n")
            .unwrap();

        let config = CliConfig::load_or_default(&path);
        assert_eq!(config.log_level(), Level::DEBUG);
        assert!(config.logging.show_target);
        assert_eq!(config.query.group_by.max_windows, 10);
    }

    #[test]
    fn test_written_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidal.yml");
        CliConfig::write_default(&path).unwrap();

        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config.query, QueryConfig::default());
        assert_eq!(config.log_level(), Level::INFO);
    }
}
