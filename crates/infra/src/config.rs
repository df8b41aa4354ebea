//! Backend configuration loaded from the environment.

use std::time::Duration;

use thiserror::Error;

pub const STORE_URL_VAR: &str = "FIELDQUOTE_STORE_URL";
pub const STORE_KEY_VAR: &str = "FIELDQUOTE_STORE_KEY";
pub const TIMEOUT_VAR: &str = "FIELDQUOTE_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Where the hosted store lives and how to talk to it.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Project base URL, without trailing slash.
    pub base_url: String,
    /// Public API key sent as `apikey` on every request.
    pub api_key: String,
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `FIELDQUOTE_STORE_URL`, `FIELDQUOTE_STORE_KEY` and the optional
    /// `FIELDQUOTE_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`StoreConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let base_url = required(STORE_URL_VAR)?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: STORE_URL_VAR,
                reason: format!("'{base_url}' is not an http(s) URL"),
            });
        }
        let api_key = required(STORE_KEY_VAR)?;

        let mut config = Self::new(base_url, api_key);
        if let Some(raw) = lookup(TIMEOUT_VAR).filter(|v| !v.trim().is_empty()) {
            let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                var: TIMEOUT_VAR,
                reason: format!("{e}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: TIMEOUT_VAR,
                    reason: "must be at least 1 second".into(),
                });
            }
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

impl core::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
