//! `codemonster.toml` loading.
//!
//! Every section is optional; a missing file yields the defaults so
//! `codemonster generate` works against a local endpoint with no setup.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use toolchain::{Interpreters, DEFAULT_MAX_FILE_BYTES};

pub const DEFAULT_GENERATION_ENDPOINT: &str = "http://127.0.0.1:8080/generate";
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub pipeline: PipelineConfig,
    pub collection: CollectionSettings,
    pub generation: GenerationSettings,
    pub validation: Interpreters,
    pub logging: LoggingSettings,
}

impl CliConfig {
    /// Reads and validates `path`. Returns `Ok(None)` when the file does not
    /// exist.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        let config = Self::parse(&content).with_context(|| format!("loading {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if self.generation.endpoint.trim().is_empty() {
            bail!("generation.endpoint must not be empty");
        }
        if self.logging.status_interval_secs == 0 {
            bail!("logging.status_interval_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Knobs for the directory source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub max_file_bytes: u64,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub endpoint: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GENERATION_ENDPOINT.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    /// How often `run` logs a status snapshot.
    pub status_interval_secs: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            status_interval_secs: DEFAULT_STATUS_INTERVAL_SECS,
        }
    }
}

impl LoggingSettings {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::Language;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.generation.endpoint, DEFAULT_GENERATION_ENDPOINT);
        assert_eq!(config.validation.python, "python3");
    }

    #[test]
    fn test_full_file_parses() {
        let config = CliConfig::parse(
            r#"
[pipeline]
collection_interval_secs = 600
max_retries = 3
queue_capacity = 64

[[pipeline.sources]]
name = "workspace"
location = "/srv/code"

[[pipeline.sources]]
name = "scripts"
location = "/srv/scripts"
language = "python"

[collection]
max_file_bytes = 4096

[generation]
endpoint = "http://gen.internal/v1/generate"

[validation]
node = "/opt/node/bin/node"

[logging]
format = "json"
status_interval_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(config.pipeline.collection_interval_secs, 600);
        assert_eq!(config.pipeline.max_retries, 3);
        assert_eq!(config.pipeline.queue_capacity, Some(64));
        assert_eq!(config.pipeline.sources.len(), 2);
        assert_eq!(config.pipeline.sources[1].language, Some(Language::Python));
        assert_eq!(config.collection.max_file_bytes, 4096);
        assert_eq!(config.generation.endpoint, "http://gen.internal/v1/generate");
        assert_eq!(config.validation.python, "python3");
        assert_eq!(config.validation.node, "/opt/node/bin/node");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.status_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_pipeline_settings_are_rejected() {
        let err = CliConfig::parse("[pipeline]\ncollection_interval_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        assert!(CliConfig::parse("[logging]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn test_zero_status_interval_is_rejected() {
        assert!(CliConfig::parse("[logging]\nstatus_interval_secs = 0\n").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CliConfig::load(&dir.path().join("codemonster.toml")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_reports_the_path_on_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codemonster.toml");
        std::fs::write(&path, "[pipeline\n").unwrap();

        let err = CliConfig::load(&path).await.unwrap_err();

        assert!(format!("{err:#}").contains("codemonster.toml"));
    }
}
