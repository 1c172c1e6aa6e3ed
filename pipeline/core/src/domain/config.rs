// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Pipeline Configuration Types
//
// Defines the configuration schema for an attribution pipeline run:
// - Touchpoint store connection
// - IHC API endpoint, credentials and capacity limits
// - Request timeout and rate-limit pacing
// - Default artifact paths

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_IHC_ENDPOINT: &str = "https://api.ihc-attribution.com/v1/compute_ihc";

/// Top-level pipeline configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Touchpoint store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// IHC attribution API
    #[serde(default)]
    pub api: ApiConfig,

    /// Intermediate and output artifacts
    #[serde(default)]
    pub pipeline: ArtifactConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. `sqlite://attribution.db`
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scoring endpoint; `conv_type_id` is appended as a query parameter
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Conversion type the IHC model was trained for
    #[serde(default)]
    pub conv_type_id: String,

    /// Journey ceiling per request
    #[serde(default = "default_max_journeys")]
    pub max_journeys_per_request: usize,

    /// Touchpoint (session) ceiling per request
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_request: usize,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Pause after every call, successful or not
    #[serde(default = "default_rate_limit_delay", with = "humantime_serde")]
    pub rate_limit_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            conv_type_id: String::new(),
            max_journeys_per_request: default_max_journeys(),
            max_sessions_per_request: default_max_sessions(),
            request_timeout: default_request_timeout(),
            rate_limit_delay: default_rate_limit_delay(),
        }
    }
}

impl ApiConfig {
    /// Resolve the API key, following `env:` indirection.
    pub fn resolve_api_key(&self) -> anyhow::Result<String> {
        let raw = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("api.api_key is not configured"))?;

        let key = match raw.strip_prefix("env:") {
            Some(var) => std::env::var(var).map_err(|_| {
                anyhow::anyhow!("api.api_key references environment variable '{}' which is not set", var)
            })?,
            None => raw.to_string(),
        };

        if key.trim().is_empty() {
            anyhow::bail!("api.api_key is empty");
        }
        Ok(key)
    }

    /// Settings the scoring client cannot run without.
    pub fn validate_credentials(&self) -> anyhow::Result<()> {
        if self.conv_type_id.trim().is_empty() {
            anyhow::bail!("api.conv_type_id cannot be empty");
        }
        self.resolve_api_key().map(|_| ())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_journeys_path")]
    pub journeys_path: PathBuf,

    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            journeys_path: default_journeys_path(),
            report_path: default_report_path(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. ATTRIBUTION_CONFIG_PATH environment variable
    /// 2. ./attribution-config.yaml (working directory)
    /// 3. ~/.attribution/config.yaml (user home)
    /// 4. /etc/attribution/config.yaml (system, Unix) or C:\ProgramData\Attribution\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ATTRIBUTION_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./attribution-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".attribution").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/attribution/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Attribution\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ATTRIBUTION_DATABASE_URL") {
            tracing::info!("Environment override: ATTRIBUTION_DATABASE_URL");
            self.database.url = url;
        }

        if let Ok(key) = std::env::var("IHC_API_KEY") {
            tracing::info!("Environment override: IHC_API_KEY");
            self.api.api_key = Some(key);
        }

        if let Ok(conv_type_id) = std::env::var("IHC_CONV_TYPE_ID") {
            tracing::info!("Environment override: IHC_CONV_TYPE_ID={}", conv_type_id);
            self.api.conv_type_id = conv_type_id;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url cannot be empty");
        }

        if self.api.endpoint.trim().is_empty() {
            anyhow::bail!("api.endpoint cannot be empty");
        }

        if !self.api.endpoint.starts_with("http://") && !self.api.endpoint.starts_with("https://") {
            anyhow::bail!("api.endpoint must be an http(s) URL: '{}'", self.api.endpoint);
        }

        if self.api.max_journeys_per_request == 0 {
            anyhow::bail!("api.max_journeys_per_request must be greater than zero");
        }

        if self.api.max_sessions_per_request == 0 {
            anyhow::bail!("api.max_sessions_per_request must be greater than zero");
        }

        if self.api.request_timeout.is_zero() {
            anyhow::bail!("api.request_timeout must be greater than zero");
        }

        Ok(())
    }
}

fn default_database_url() -> String {
    "sqlite://attribution.db".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_IHC_ENDPOINT.to_string()
}

fn default_max_journeys() -> usize {
    100
}

fn default_max_sessions() -> usize {
    3000
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_rate_limit_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_journeys_path() -> PathBuf {
    PathBuf::from("customer_journeys.csv")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("channel_reporting.csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.database.url, "sqlite://attribution.db");
        assert_eq!(config.api.endpoint, DEFAULT_IHC_ENDPOINT);
        assert_eq!(config.api.max_journeys_per_request, 100);
        assert_eq!(config.api.max_sessions_per_request, 3000);
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
        assert_eq!(config.api.rate_limit_delay, Duration::from_secs(1));
        assert_eq!(config.pipeline.journeys_path, PathBuf::from("customer_journeys.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
database:
  url: "sqlite::memory:"
api:
  api_key: secret
  conv_type_id: purchase
  max_journeys_per_request: 50
  request_timeout: 5s
  rate_limit_delay: 250ms
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.api.conv_type_id, "purchase");
        assert_eq!(config.api.max_journeys_per_request, 50);
        assert_eq!(config.api.max_sessions_per_request, 3000);
        assert_eq!(config.api.request_timeout, Duration::from_secs(5));
        assert_eq!(config.api.rate_limit_delay, Duration::from_millis(250));
        assert_eq!(config.api.resolve_api_key().unwrap(), "secret");
        assert!(config.api.validate_credentials().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = PipelineConfig::default();

        config.api.max_journeys_per_request = 0;
        assert!(config.validate().is_err());
        config.api.max_journeys_per_request = 10;

        config.api.max_sessions_per_request = 0;
        assert!(config.validate().is_err());
        config.api.max_sessions_per_request = 10;

        config.api.endpoint = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
        config.api.endpoint = DEFAULT_IHC_ENDPOINT.to_string();

        config.api.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.api.request_timeout = Duration::from_secs(1);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_required_for_scoring() {
        let mut api = ApiConfig::default();
        assert!(api.validate_credentials().is_err());

        api.conv_type_id = "purchase".to_string();
        assert!(api.validate_credentials().is_err());

        api.api_key = Some("env:ATTRIBUTION_TEST_KEY_THAT_IS_NOT_SET".to_string());
        assert!(api.resolve_api_key().is_err());

        api.api_key = Some("   ".to_string());
        assert!(api.resolve_api_key().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = PipelineConfig::default();
        config.api.conv_type_id = "lead".to_string();
        config.api.rate_limit_delay = Duration::from_millis(500);

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = PipelineConfig::from_yaml_str(&yaml).unwrap();

        assert_eq!(parsed.api.conv_type_id, "lead");
        assert_eq!(parsed.api.rate_limit_delay, Duration::from_millis(500));
        assert!(parsed.api.api_key.is_none());
    }
}
