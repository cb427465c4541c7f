use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Configuration keys enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ApiBaseUrl,
    RequestTimeoutSecs,
    RetryMaxAttempts,
    RetryBaseDelayMs,
    UserAgent,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ApiBaseUrl => "api_base_url",
            ConfigKey::RequestTimeoutSecs => "request_timeout_secs",
            ConfigKey::RetryMaxAttempts => "retry_max_attempts",
            ConfigKey::RetryBaseDelayMs => "retry_base_delay_ms",
            ConfigKey::UserAgent => "user_agent",
        }
    }

    /// Get all config keys
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ApiBaseUrl,
            ConfigKey::RequestTimeoutSecs,
            ConfigKey::RetryMaxAttempts,
            ConfigKey::RetryBaseDelayMs,
            ConfigKey::UserAgent,
        ]
    }
}

/// Filename for the project-specific configuration within the .issuekeeper directory.
pub const PROJECT_CONFIG_FILENAME: &str = "config.json";
/// Directory name for project-specific configuration.
pub const PROJECT_CONFIG_DIR: &str = ".issuekeeper";

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_USER_AGENT: &str = "issuekeeper";

/// Parses a JSON configuration file content into a map of configuration values.
///
/// Expects `content` to be a JSON object with configuration keys
/// (e.g., {"api_base_url": "...", "retry_max_attempts": 5}).
///
/// - Returns `Ok(HashMap<ConfigKey, Value>)` containing the recognised keys; unknown keys are skipped.
/// - Returns an empty HashMap if the input `content` is empty or contains only whitespace.
/// - Returns an `Err` if the JSON parsing fails or the document is not an object.
pub fn parse_config(content: &[u8]) -> Result<HashMap<ConfigKey, Value>> {
    if content.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(HashMap::new());
    }

    let value: Value = serde_json::from_slice(content).context("Failed to parse config JSON")?;

    if let Value::Object(map) = &value {
        let config_map = ConfigKey::all()
            .iter()
            .filter_map(|key| map.get(key.as_str()).map(|val| (*key, val.clone())))
            .collect();
        return Ok(config_map);
    }

    Err(anyhow::anyhow!("Config must be a JSON object"))
}

/// Merges `updates` into `base_config` and returns a new configuration map.
///
/// If a key exists in both, the value from `updates` wins. Neither input is modified.
pub fn update_config(
    base_config: &HashMap<ConfigKey, Value>,
    updates: &HashMap<ConfigKey, Value>,
) -> HashMap<ConfigKey, Value> {
    let mut new_config = base_config.clone();
    for (key, value) in updates {
        new_config.insert(*key, value.clone());
    }
    new_config
}

/// Reads `<project_dir>/.issuekeeper/config.json`.
///
/// A missing file is not an error and yields an empty map.
pub fn load_project_config(project_dir: &Path) -> Result<HashMap<ConfigKey, Value>> {
    let path = project_dir
        .join(PROJECT_CONFIG_DIR)
        .join(PROJECT_CONFIG_FILENAME);
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Transport settings for [`crate::github::GitHubClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientSettings {
    /// Loads the project config file and layers `overrides` on top of it.
    pub fn load(project_dir: &Path, overrides: &HashMap<ConfigKey, Value>) -> Result<Self> {
        let project = load_project_config(project_dir)?;
        Self::from_config(&update_config(&project, overrides))
    }

    /// Builds settings from a parsed config map, falling back to defaults for absent keys.
    pub fn from_config(config: &HashMap<ConfigKey, Value>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(value) = config.get(&ConfigKey::ApiBaseUrl) {
            settings.api_base_url = expect_str(ConfigKey::ApiBaseUrl, value)?;
        }
        if let Some(value) = config.get(&ConfigKey::RequestTimeoutSecs) {
            settings.request_timeout =
                Duration::from_secs(expect_u64(ConfigKey::RequestTimeoutSecs, value)?);
        }
        if let Some(value) = config.get(&ConfigKey::RetryMaxAttempts) {
            settings.retry_max_attempts = usize::try_from(expect_u64(
                ConfigKey::RetryMaxAttempts,
                value,
            )?)
            .context("retry_max_attempts is out of range")?;
        }
        if let Some(value) = config.get(&ConfigKey::RetryBaseDelayMs) {
            settings.retry_base_delay_ms = expect_u64(ConfigKey::RetryBaseDelayMs, value)?;
        }
        if let Some(value) = config.get(&ConfigKey::UserAgent) {
            settings.user_agent = expect_str(ConfigKey::UserAgent, value)?;
        }
        Ok(settings)
    }
}

fn expect_str(key: ConfigKey, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Config key {} must be a string", key.as_str()))
}

fn expect_u64(key: ConfigKey, value: &Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        anyhow::anyhow!(
            "Config key {} must be a non-negative integer",
            key.as_str()
        )
    })
}
