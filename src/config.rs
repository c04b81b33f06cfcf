use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::datadog::DEFAULT_API_HOST;

pub const DEFAULT_GROUP: &str = "total";
pub const DEFAULT_PATTERN: &str = "*";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub metrics: Metrics,
    /// Group name -> glob pattern over report file paths
    #[serde(default)]
    pub groups: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct Metrics {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_api_host")]
    pub api_host: String,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            tags: Vec::new(),
            api_host: default_api_host(),
        }
    }
}

fn default_prefix() -> String {
    "test_eng.coverage".to_string()
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

impl Default for Config {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(DEFAULT_GROUP.to_string(), DEFAULT_PATTERN.to_string());

        Self {
            metrics: Metrics::default(),
            groups,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.metrics.prefix.is_empty() {
            anyhow::bail!("Metric prefix must not be empty");
        }

        if self.groups.is_empty() {
            anyhow::bail!("No coverage groups defined");
        }

        for (name, pattern) in &self.groups {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            {
                anyhow::bail!(
                    "Group name '{}' may only contain letters, digits, '_', '-' and '.'",
                    name
                );
            }

            if pattern.is_empty() {
                anyhow::bail!("Group '{}' has an empty pattern", name);
            }
        }

        Ok(())
    }

    /// Name of the gauge reported for `group`
    pub fn metric_name(&self, group: &str) -> String {
        format!("{}.{}", self.metrics.prefix, group)
    }
}
