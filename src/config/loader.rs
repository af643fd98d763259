//! Config file loading

use crate::config::HarvestConfig;
use anyhow::{Context, Result};
use figment::providers::{Env, Serialized};
use figment::Figment;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `REPO_HARVEST_CONCURRENCY=4`.
pub const ENV_PREFIX: &str = "REPO_HARVEST_";

const SECTION: &str = "repo-harvest";

/// Load config from `config_path` (or a file discovered in `dir`), then apply
/// `REPO_HARVEST_*` environment overrides.
pub fn load_config(dir: &Path, config_path: Option<&Path>) -> Result<HarvestConfig> {
    load_config_with_env(dir, config_path, ENV_PREFIX)
}

pub fn load_config_with_env(
    dir: &Path,
    config_path: Option<&Path>,
    env_prefix: &str,
) -> Result<HarvestConfig> {
    let from_file = load_file_config(dir, config_path)?;
    Figment::from(Serialized::defaults(from_file))
        .merge(Env::prefixed(env_prefix))
        .extract()
        .with_context(|| format!("Invalid {env_prefix}* environment override"))
}

fn load_file_config(dir: &Path, config_path: Option<&Path>) -> Result<HarvestConfig> {
    let config_path_provided = config_path.is_some();

    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(dir),
    };

    let Some(config_file) = discovered else {
        return Ok(HarvestConfig::default());
    };

    let content = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "toml" => parse_toml_config(&content, &config_file),
        "yaml" | "yml" => parse_yaml_config(&content, &config_file),
        other => Err(anyhow::anyhow!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        )),
    };

    match parsed {
        Ok(cfg) => {
            tracing::debug!("Loaded config from {}", config_file.display());
            Ok(cfg)
        }
        Err(e) if config_path_provided => Err(e),
        Err(e) => {
            // Auto-discovered: warn and fall back to defaults
            tracing::warn!(
                "Failed to parse auto-discovered config {}: {:#}",
                config_file.display(),
                e
            );
            Ok(HarvestConfig::default())
        }
    }
}

/// Parse TOML config, supporting a nested `[repo-harvest]` section.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<HarvestConfig> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, supporting a nested `repo-harvest:` mapping.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<HarvestConfig> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(dir: &Path) -> Option<PathBuf> {
    let candidates = [
        "repo-harvest.toml",
        ".repo-harvest.toml",
        "repo-harvest.yml",
        ".repo-harvest.yml",
        "repo-harvest.yaml",
        ".repo-harvest.yaml",
    ];

    candidates.iter().map(|c| dir.join(c)).find(|p| p.exists())
}
