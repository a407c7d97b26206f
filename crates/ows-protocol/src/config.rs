//! Client configuration.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "OWS_CLIENT_TIMEOUT_MS";
/// Environment variable overriding the User-Agent header.
pub const ENV_USER_AGENT: &str = "OWS_CLIENT_USER_AGENT";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Settings shared by every client instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connect and whole-request timeout in milliseconds; 0 waits forever.
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            user_agent: format!("ows-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// `None` means no timeout.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Defaults overridden by `OWS_CLIENT_TIMEOUT_MS` / `OWS_CLIENT_USER_AGENT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            config.timeout_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_TIMEOUT_MS,
                        value: value.clone(),
                    })?;
        }
        if let Some(value) = lookup(ENV_USER_AGENT) {
            if !value.trim().is_empty() {
                config.user_agent = value;
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_is_infinite() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_ms, 0);
        assert_eq!(config.timeout(), None);
        assert!(config.user_agent.starts_with("ows-client/"));
    }

    #[test]
    fn test_from_env_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_TIMEOUT_MS, "2500"),
            (ENV_USER_AGENT, "catalogue-harvester"),
        ]))
        .unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.user_agent, "catalogue-harvester");
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_TIMEOUT_MS,
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig = serde_json::from_str(r#"{"timeout_ms": 100}"#).unwrap();
        assert_eq!(config.timeout_ms, 100);
        assert!(!config.user_agent.is_empty());
    }
}
