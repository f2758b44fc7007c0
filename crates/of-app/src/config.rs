//! Runtime configuration.
//!
//! Resolution order, later wins: built-in defaults, YAML file, the
//! `OPTIFLOW_API_BASE_URL` environment variable, explicit overrides from the
//! command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const ENV_API_BASE_URL: &str = "OPTIFLOW_API_BASE_URL";
pub const DEFAULT_CONFIG_FILE: &str = "optiflow.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Delay between training progress requests.
    pub poll_interval_ms: u64,
    /// Pause between training completion and the results step.
    pub results_delay_ms: u64,
    pub request_timeout_s: Option<u64>,
    /// Sent as the `writer` field of dataset uploads.
    pub writer: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 3000,
            results_delay_ms: 2000,
            request_timeout_s: Some(30),
            writer: "optiflow".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Full resolution against the process environment. An explicit `path`
    /// must exist; otherwise `optiflow.yaml` is used when present.
    pub fn load(path: Option<&Path>, api_override: Option<&str>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        let mut config = base.with_env(|key| std::env::var(key).ok());
        if let Some(api) = api_override {
            config.api_base_url = api.to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(AppError::Config("api_base_url must not be empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_s == Some(0) {
            return Err(AppError::Config(
                "request_timeout_s must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn results_delay(&self) -> Duration {
        Duration::from_millis(self.results_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_s.map(Duration::from_secs)
    }
}
