//! Configuration loading
//!
//! Reads a JSON5 file, applies environment overrides and validates the
//! result. A missing file is not an error: every section has defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::graph::{HttpClientConfig, DEFAULT_API_VERSION, DEFAULT_GRAPH_HOST};
use crate::graph::http::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use crate::logging::LoggingConfig;
use crate::publish::{FailureMode, MediaKind, PipelineSettings, ResourceRegistry, TimingOverride};

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "GRAPHPOST_CONFIG_PATH";
pub const HOST_ENV: &str = "GRAPHPOST_HOST";
pub const API_VERSION_ENV: &str = "GRAPHPOST_API_VERSION";
pub const LOG_LEVEL_ENV: &str = "GRAPHPOST_LOG_LEVEL";

const CONFIG_DIR_NAME: &str = "graphpost";
const CONFIG_FILE_NAME: &str = "config.json5";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub graph: GraphConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialsConfig,
    /// Per-resource timing overrides keyed by resource key
    pub resources: BTreeMap<String, TimingOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphConfig {
    pub host: String,
    pub api_version: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GRAPH_HOST.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub continue_on_fail: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialsConfig {
    /// Keychain account the access token is stored under
    pub account: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            account: "default".to_string(),
        }
    }
}

impl Config {
    /// Parse JSON5 text. `path` is only used in error messages.
    pub fn from_json5(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let value: Value = json5::from_str(raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let value = if value.is_null() {
            Value::Object(Default::default())
        } else {
            value
        };
        serde_json::from_value(value).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `GRAPHPOST_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(host) = non_empty(HOST_ENV) {
            self.graph.host = host;
        }
        if let Some(version) = non_empty(API_VERSION_ENV) {
            self.graph.api_version = version;
        }
        if let Some(level) = non_empty(LOG_LEVEL_ENV) {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = url::Url::parse(&self.graph.host)
            .map_err(|e| ConfigError::Invalid(format!("graph.host '{}': {}", self.graph.host, e)))?;
        if !matches!(host.scheme(), "http" | "https") || host.host_str().is_none() {
            return Err(ConfigError::Invalid(format!(
                "graph.host '{}' must be an http or https URL",
                self.graph.host
            )));
        }
        if self.graph.api_version.trim().is_empty() {
            return Err(ConfigError::Invalid("graph.apiVersion must not be empty".to_string()));
        }
        if self.graph.timeout_seconds == 0 || self.graph.connect_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "graph timeouts must be positive".to_string(),
            ));
        }
        if self.credentials.account.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "credentials.account must not be empty".to_string(),
            ));
        }
        for key in self.resources.keys() {
            if MediaKind::from_key(key).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "resources.{}: unknown resource",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Registry with this config's timing overrides applied
    pub fn resource_registry(&self) -> ResourceRegistry {
        ResourceRegistry::with_overrides(
            self.resources
                .iter()
                .filter_map(|(key, patch)| MediaKind::from_key(key).map(|kind| (kind, patch))),
        )
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.graph.timeout_seconds),
            connect_timeout: Duration::from_secs(self.graph.connect_timeout_seconds),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            host: self.graph.host.clone(),
            default_api_version: self.graph.api_version.clone(),
            failure_mode: FailureMode::from_continue_flag(self.pipeline.continue_on_fail),
        }
    }
}

/// Config file location: `$GRAPHPOST_CONFIG_PATH`, else the platform
/// config directory.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Load a config file without environment overrides.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Config::from_json5(&raw, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Config::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Load, override from the environment and validate.
pub fn load_config() -> Result<Config, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    config.apply_env_overrides(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.graph.host, "https://graph.facebook.com");
        assert_eq!(config.graph.api_version, "v22.0");
        assert_eq!(config.credentials.account, "default");
        assert!(!config.pipeline.continue_on_fail);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_json5_with_comments() {
        let raw = r#"{
            // staging proxy
            graph: { host: "https://graph.staging.example.com", apiVersion: "v21.0" },
            pipeline: { continueOnFail: true },
            logging: { level: "debug", format: "json" },
            resources: {
                reels: { maxPollAttempts: 90, pollIntervalMs: 5000 },
            },
        }"#;
        let config = Config::from_json5(raw, Path::new("test.json5")).unwrap();
        assert_eq!(config.graph.host, "https://graph.staging.example.com");
        assert_eq!(config.graph.api_version, "v21.0");
        assert_eq!(config.graph.timeout_seconds, 60);
        assert!(config.pipeline.continue_on_fail);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());

        let registry = config.resource_registry();
        let reels = registry.lookup("reels").unwrap().timing;
        assert_eq!(reels.max_poll_attempts.get(), 90);
        assert_eq!(reels.poll_interval_ms.get(), 5000);
        assert_eq!(reels.publish_max_attempts.get(), 5);
        let image = registry.lookup("image").unwrap().timing;
        assert_eq!(image, MediaKind::Image.default_timing());
    }

    #[test]
    fn test_zero_timing_is_rejected() {
        let raw = r#"{ resources: { image: { maxPollAttempts: 0 } } }"#;
        assert!(matches!(
            Config::from_json5(raw, Path::new("c.json5")),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_unknown_resource_is_rejected() {
        let raw = r#"{ resources: { comments: { maxPollAttempts: 3 } } }"#;
        let config = Config::from_json5(raw, Path::new("c.json5")).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("resources.comments"));
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let mut config = Config::default();
        config.graph.host = "graph.facebook.com".to_string();
        assert!(config.validate().is_err());

        config.graph.host = "ftp://graph.facebook.com".to_string();
        assert!(config.validate().is_err());

        config.graph.host = "http://localhost:8080".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (HOST_ENV, "http://127.0.0.1:9000"),
            (API_VERSION_ENV, "v20.0"),
            (LOG_LEVEL_ENV, ""),
        ]);
        let mut config = Config::default();
        config.apply_env_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.graph.host, "http://127.0.0.1:9000");
        assert_eq!(config.graph.api_version, "v20.0");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.json5")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "{{ credentials: {{ account: 'brand' }}, graph: {{ timeoutSeconds: 5 }} }}"
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.credentials.account, "brand");
        assert_eq!(config.http_client_config().timeout, Duration::from_secs(5));
        assert_eq!(
            config.http_client_config().connect_timeout,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ graph: ").unwrap();
        let err = load_config_from(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_pipeline_settings_follow_config() {
        let mut config = Config::default();
        config.pipeline.continue_on_fail = true;
        let settings = config.pipeline_settings();
        assert_eq!(settings.failure_mode, FailureMode::ContinueOnFail);
        assert_eq!(settings.default_api_version, "v22.0");
    }
}
