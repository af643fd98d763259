//! Search command implementation

use anyhow::{Context, Result};
use clap::Args;

use super::utils::{format_size_kb, DEFAULT_COUNT};
use crate::domain::MAX_SEARCH_RESULTS;
use crate::source::github::DEFAULT_API_URL;
use crate::source::{DescriptorSource, GithubSearch};

#[derive(Args)]
pub struct SearchArgs {
    /// Search query, e.g. 'django ecommerce'
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// How many repositories to list
    #[arg(short = 'n', long, value_name = "N", default_value_t = DEFAULT_COUNT)]
    pub count: usize,

    /// GitHub token; raises search rate limits
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Search API base URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: SearchArgs) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("A search query is required");
    }
    if args.count == 0 || args.count > MAX_SEARCH_RESULTS {
        anyhow::bail!("--count must be between 1 and {MAX_SEARCH_RESULTS}");
    }

    let token = args.token.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let source = GithubSearch::new(&args.api_url)?;
    let repos = source.fetch(query, args.count, token).context("Search failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
        return Ok(());
    }

    println!("Top {} repositories for '{}':", repos.len(), query);
    for (rank, repo) in repos.iter().enumerate() {
        println!(
            "{:>4}. [{}★] {} ({})",
            rank + 1,
            repo.stars,
            repo.identifier,
            format_size_kb(repo.size_kb)
        );
        if let Some(description) = repo.description.as_deref().filter(|d| !d.is_empty()) {
            println!("      {description}");
        }
    }
    Ok(())
}
