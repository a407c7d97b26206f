//! CLI configuration file.
//!
//! ```yaml
//! client:
//!   timeout_ms: 5000
//!   user_agent: catalogue-harvester
//! namespaces:
//!   app: http://example.com/app
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use ows_protocol::ClientConfig;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub client: ClientConfig,
    /// Prefix to namespace URI bindings for `--type-name` values.
    pub namespaces: BTreeMap<String, String>,
}

impl CliConfig {
    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: CliConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(
            path = %path.display(),
            timeout_ms = config.client.timeout_ms,
            namespaces = config.namespaces.len(),
            "Loaded CLI config"
        );
        Ok(config)
    }

    /// File settings (or defaults) with command line values on top.
    pub fn resolve(
        path: Option<&Path>,
        timeout_ms: Option<u64>,
        user_agent: Option<String>,
    ) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(timeout_ms) = timeout_ms {
            config.client.timeout_ms = timeout_ms;
        }
        if let Some(user_agent) = user_agent.filter(|ua| !ua.trim().is_empty()) {
            config.client.user_agent = user_agent;
        }
        Ok(config)
    }
}
