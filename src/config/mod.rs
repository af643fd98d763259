//! Configuration loading and merging
//!
//! Handles loading from config files, environment variables, and CLI arguments
//! with proper precedence (CLI > Env > File > Defaults).

use crate::domain::CloneBackend;
use crate::source::github::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;
pub mod merge;

pub use loader::load_config;
pub use merge::{merge_cli_with_config, CliOverrides};

/// Settings for a harvest run, assembled once by the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub query: Option<String>,
    pub count: Option<usize>,
    /// Only ever read from the environment or CLI; never written back out.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub clone_timeout_secs: u64,
    pub backend: CloneBackend,
    pub api_url: String,
    pub archive_prefix: Option<String>,
    pub keep_work_dir: bool,
    pub max_pages: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            query: None,
            count: None,
            token: None,
            output_dir: PathBuf::from("github_agent_downloads"),
            concurrency: 8,
            clone_timeout_secs: 180,
            backend: CloneBackend::default(),
            api_url: DEFAULT_API_URL.to_string(),
            archive_prefix: None,
            keep_work_dir: false,
            max_pages: 10,
        }
    }
}

impl HarvestConfig {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.clone_timeout_secs == 0 {
            anyhow::bail!("clone_timeout_secs must be greater than 0");
        }
        if !(1..=10).contains(&self.max_pages) {
            anyhow::bail!("max_pages must be between 1 and 10 (got {})", self.max_pages);
        }
        if matches!(self.count, Some(0)) {
            anyhow::bail!("count must be a positive number");
        }
        if self.api_url.trim().is_empty() {
            anyhow::bail!("api_url must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HarvestConfig;

    #[test]
    fn defaults_are_valid() {
        HarvestConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn rejects_zero_concurrency_and_count() {
        let cfg = HarvestConfig { concurrency: 0, ..HarvestConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = HarvestConfig { count: Some(0), ..HarvestConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = HarvestConfig { max_pages: 11, ..HarvestConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn token_is_never_serialized() {
        let cfg = HarvestConfig { token: Some("ghp_x".into()), ..HarvestConfig::default() };
        let rendered = toml::to_string(&cfg).expect("toml");
        assert!(!rendered.contains("ghp_x"));
    }
}
