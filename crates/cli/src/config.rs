use std::path::Path;

use anyhow::{Context, Result};
use cfmv_core::config::parse_delimiter;
use cfmv_core::{Config, UndefinedPolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Overrides loaded from a TOML file. Unset keys keep the environment value.
///
/// ```toml
/// max_iterations = 500
/// tolerance = 0.05
/// delimiter = "tab"
/// undefined_policy = "nan"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub max_iterations: Option<usize>,
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub undefined_policy: Option<UndefinedPolicy>,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading config file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Layer the file's values over `config`.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(n) = self.max_iterations {
            config.engine.max_iterations = n;
        }
        if let Some(t) = self.tolerance {
            config.engine.tolerance = t;
        }
        if let Some(raw) = &self.delimiter {
            config.io.delimiter = parse_delimiter(raw).context("invalid delimiter in config file")?;
        }
        if let Some(policy) = self.undefined_policy {
            config.imputation.undefined_policy = policy;
        }
        config
            .engine
            .validate()
            .context("invalid engine settings in config file")
    }
}
