//! Engine configuration: the project-wide YAML/JSON config file that sets
//! defaults discovery, scheduling, and reporting all read from.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::priority::{ExecutionMode, Priority};
use crate::value::Value;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config references unknown required priority level: {0}")]
    UnknownRequiredPriority(String),
}

/// Top-level project configuration. Every section has a default, so an
/// empty file (or no file at all, via `EngineConfig::default()`) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub project_name: String,
    pub test_directory: String,
    pub globals: GlobalsConfig,
    pub discovery: DiscoveryConfig,
    pub priorities: PrioritiesConfig,
    pub execution: ExecutionConfig,
    pub reporting: ReportingConfig,
    pub filters: FiltersConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_name: "testflow".to_string(),
            test_directory: "tests".to_string(),
            globals: GlobalsConfig::default(),
            discovery: DiscoveryConfig::default(),
            priorities: PrioritiesConfig::default(),
            execution: ExecutionConfig::default(),
            reporting: ReportingConfig::default(),
            filters: FiltersConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(yaml: &str, path_for_errors: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
                path: path_for_errors.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    /// Load from a file if it exists, otherwise fall back to defaults. This
    /// is the entry point the CLI uses: a `testflow` config file is opt-in.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for level in &self.priorities.required {
            level
                .parse::<Priority>()
                .map_err(ConfigError::UnknownRequiredPriority)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalsConfig {
    pub variables: HashMap<String, Value>,
    pub timeouts: TimeoutsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub request_ms: u64,
    pub suite_ms: u64,
    pub script_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_ms: 30_000,
            suite_ms: 120_000,
            script_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            patterns: vec!["**/*.suite.yaml".to_string(), "**/*.suite.yml".to_string()],
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritiesConfig {
    pub levels: Vec<Priority>,
    pub required: Vec<String>,
    pub fail_fast_on_required: bool,
}

impl Default for PrioritiesConfig {
    fn default() -> Self {
        Self {
            levels: vec![
                Priority::Critical,
                Priority::High,
                Priority::Medium,
                Priority::Low,
            ],
            required: vec!["critical".to_string()],
            fail_fast_on_required: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    pub max_parallel: usize,
    pub timeout_ms: u64,
    pub continue_on_failure: bool,
    pub retry_failed: RetryConfig,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            max_parallel: 8,
            timeout_ms: 300_000,
            continue_on_failure: true,
            retry_failed: RetryConfig::default(),
        }
    }
}

/// Retry policy for a failed HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 1,
            delay_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub formats: Vec<String>,
    pub output_dir: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            formats: vec!["json".to_string()],
            output_dir: "testflow-report".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub node_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.execution.max_parallel, 8);
        assert_eq!(config.priorities.required, vec!["critical"]);
    }

    #[test]
    fn empty_yaml_document_still_parses_to_defaults() {
        let config = EngineConfig::from_yaml("{}", "inline").unwrap();
        assert_eq!(config.project_name, "testflow");
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let yaml = r#"
project_name: "checkout-api"
execution:
  max_parallel: 16
  mode: sequential
"#;
        let config = EngineConfig::from_yaml(yaml, "inline").unwrap();
        assert_eq!(config.project_name, "checkout-api");
        assert_eq!(config.execution.max_parallel, 16);
        assert_eq!(config.execution.mode, ExecutionMode::Sequential);
        assert!(!config.execution.retry_failed.enabled);
        assert_eq!(config.discovery.patterns.len(), 2);
    }

    #[test]
    fn unknown_required_priority_is_rejected() {
        let yaml = r#"
priorities:
  required: ["urgent"]
"#;
        assert!(matches!(
            EngineConfig::from_yaml(yaml, "inline"),
            Err(ConfigError::UnknownRequiredPriority(_))
        ));
    }

    #[test]
    fn nested_retry_failed_config_parses() {
        let yaml = r#"
execution:
  retry_failed:
    enabled: true
    max_attempts: 3
    delay_ms: 100
"#;
        let config = EngineConfig::from_yaml(yaml, "inline").unwrap();
        assert!(config.execution.retry_failed.enabled);
        assert_eq!(config.execution.retry_failed.max_attempts, 3);
        assert_eq!(config.execution.retry_failed.delay_ms, 100);
    }
}
