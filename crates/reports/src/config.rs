//! Engine configuration loading.
//!
//! Settings come from a toml file, with `SKOPOS_ENGINE_*` environment
//! variables taking precedence so deployments can keep the token out of the
//! file. Validation runs before any store is built.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Base URL of the time-series engine.
    pub url: String,
    pub org: String,
    pub token: String,
    /// Bucket all report measurements live in.
    pub bucket: String,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Config {
    /// Load from a toml file, apply environment overrides, validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&raw)?;
        config.apply_env(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Build purely from `SKOPOS_ENGINE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config {
            engine: EngineSection {
                url: String::new(),
                org: String::new(),
                token: String::new(),
                bucket: String::new(),
                timeout_seconds: None,
            },
        };
        config.apply_env(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get("SKOPOS_ENGINE_URL") {
            self.engine.url = url;
        }
        if let Some(org) = get("SKOPOS_ENGINE_ORG") {
            self.engine.org = org;
        }
        if let Some(token) = get("SKOPOS_ENGINE_TOKEN") {
            self.engine.token = token;
        }
        if let Some(bucket) = get("SKOPOS_ENGINE_BUCKET") {
            self.engine.bucket = bucket;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("engine.url", &self.engine.url),
            ("engine.org", &self.engine.org),
            ("engine.token", &self.engine.token),
            ("engine.bucket", &self.engine.bucket),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must be set")));
            }
        }
        if self.engine.timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid("engine.timeout_seconds must be positive".into()));
        }
        Ok(())
    }

    /// Connection settings for [`fluxline::HttpTimeSeries`].
    pub fn http_config(&self) -> fluxline::HttpConfig {
        fluxline::HttpConfig {
            url: self.engine.url.clone(),
            org: self.engine.org.clone(),
            token: self.engine.token.clone(),
            timeout: self.engine.timeout_seconds.map(Duration::from_secs),
        }
    }
}
