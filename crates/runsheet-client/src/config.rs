use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SheetError};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

pub const ENV_CONFIG_PATH: &str = "CONFIG_PATH";
pub const ENV_CREDENTIALS_PATH: &str = "GOOGLE_CREDENTIALS_PATH";
pub const ENV_SPREADSHEET_ID: &str = "DEFAULT_SPREADSHEET_ID";

/// Retry settings from the `retry:` block
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Initial delay in seconds
    pub delay: f64,
    pub backoff: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: 1.0,
            backoff: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay).unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(SheetError::Configuration(format!(
                "retry.delay must be a non-negative number of seconds, got {}",
                self.delay
            )));
        }
        if !self.backoff.is_finite() || self.backoff < 0.0 {
            return Err(SheetError::Configuration(format!(
                "retry.backoff must be a non-negative number, got {}",
                self.backoff
            )));
        }
        Ok(())
    }
}

/// Layout of the YAML file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    credentials_path: Option<PathBuf>,
    spreadsheet_id: Option<String>,
    retry: Option<RetryConfig>,
}

/// Client configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Service-account key file
    pub credentials_path: Option<PathBuf>,
    /// Spreadsheet used when the caller does not name one
    pub default_spreadsheet_id: Option<String>,
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from `CONFIG_PATH` (or `config/config.yaml`),
    /// honouring a `.env` file and environment overrides
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_path(path)
    }

    /// Load configuration from a YAML file, then apply environment overrides
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SheetError::Configuration(format!("Failed to load config {}: {}", path.display(), e))
        })?;

        let config = Self::from_yaml_str(&text)?.with_overrides(|key| env::var(key).ok());
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse YAML without consulting the environment
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: FileConfig = serde_saphyr::from_str(text)
            .map_err(|e| SheetError::Configuration(format!("Failed to load config: {}", e)))?;

        let retry = file.retry.unwrap_or_default();
        retry.validate()?;

        Ok(Self {
            credentials_path: file.credentials_path,
            default_spreadsheet_id: file.spreadsheet_id,
            retry,
        })
    }

    /// Let variables returned by `lookup` take precedence over the file
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_CREDENTIALS_PATH).filter(|v| !v.is_empty()) {
            self.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(id) = lookup(ENV_SPREADSHEET_ID).filter(|v| !v.is_empty()) {
            self.default_spreadsheet_id = Some(id);
        }
        self
    }

    /// Pick the credentials file: an explicit path wins over configuration
    pub fn resolve_credentials_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.credentials_path.clone())
            .ok_or_else(|| {
                SheetError::Configuration(format!(
                    "No credentials path given; set {} or credentials_path",
                    ENV_CREDENTIALS_PATH
                ))
            })
    }
}
