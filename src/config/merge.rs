//! Apply command-line overrides on top of file/env configuration

use crate::config::HarvestConfig;
use crate::domain::CloneBackend;
use std::path::PathBuf;

/// Values given on the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub query: Option<String>,
    pub count: Option<usize>,
    pub token: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub clone_timeout_secs: Option<u64>,
    pub backend: Option<CloneBackend>,
    pub api_url: Option<String>,
    pub archive_prefix: Option<String>,
    pub keep_work_dir: bool,
    pub max_pages: Option<usize>,
}

pub fn merge_cli_with_config(mut config: HarvestConfig, cli: CliOverrides) -> HarvestConfig {
    if let Some(query) = cli.query.filter(|q| !q.trim().is_empty()) {
        config.query = Some(query);
    }
    if cli.count.is_some() {
        config.count = cli.count;
    }
    if let Some(token) = cli.token.filter(|t| !t.trim().is_empty()) {
        config.token = Some(token);
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = cli.clone_timeout_secs {
        config.clone_timeout_secs = timeout;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if cli.archive_prefix.is_some() {
        config.archive_prefix = cli.archive_prefix;
    }
    if cli.keep_work_dir {
        config.keep_work_dir = true;
    }
    if let Some(pages) = cli.max_pages {
        config.max_pages = pages;
    }
    config
}
