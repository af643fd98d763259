//! Harvest command implementation

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::io::IsTerminal;
use std::path::PathBuf;

use super::guided::prompt_missing_inputs;
use super::utils::{clone_progress_bar, parse_backend, DEFAULT_COUNT};
use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::{CloneBackend, RunContext};
use crate::fetch::{operation_for, CancelFlag, GitCliClone};
use crate::pipeline::{Pipeline, PipelineOptions, RunSummary};
use crate::source::GithubSearch;
use indicatif::ProgressBar;

#[derive(Args)]
pub struct HarvestArgs {
    /// Search query, e.g. 'trading bot python'
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// How many repositories to download (most starred first)
    #[arg(short = 'n', long, value_name = "N")]
    pub count: Option<usize>,

    /// GitHub token; raises search and clone rate limits
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Directory for the archive and report
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum simultaneous clones
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Per-repository clone timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Clone backend: libgit2|git-cli
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Archive name prefix (default: GITHUB_<query>)
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Keep the unpacked clones next to the archive
    #[arg(long)]
    pub keep_work_dir: bool,

    /// Path to config file (repo-harvest.toml or repo-harvest.yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Search API base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Maximum search result pages of 100 to request (1-10)
    #[arg(long, value_name = "N")]
    pub max_pages: Option<usize>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Never prompt for missing values
    #[arg(long)]
    pub no_input: bool,
}

pub fn run(args: HarvestArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    let file_config = load_config(&cwd, args.config.as_deref())?;
    let backend = parse_backend(args.backend.as_deref())?;

    let mut config = merge_cli_with_config(
        file_config,
        CliOverrides {
            query: args.query,
            count: args.count,
            token: args.token,
            output_dir: args.output_dir,
            concurrency: args.concurrency,
            clone_timeout_secs: args.timeout,
            backend,
            api_url: args.api_url,
            archive_prefix: args.prefix,
            keep_work_dir: args.keep_work_dir,
            max_pages: args.max_pages,
        },
    );

    let interactive =
        !args.no_input && std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
    if interactive && config.query.is_none() {
        let answers = prompt_missing_inputs(config.count, config.token.is_some())?;
        config.query = Some(answers.query);
        config.count = Some(answers.count);
        if answers.token.is_some() {
            config.token = answers.token;
        }
    }

    config.validate()?;
    let query = config.query.clone().filter(|q| !q.trim().is_empty()).ok_or_else(|| {
        anyhow::anyhow!("A search query is required (pass QUERY or set `query` in the config file)")
    })?;
    let count = config.count.unwrap_or(DEFAULT_COUNT);

    if config.backend == CloneBackend::GitCli && !GitCliClone::new().is_available() {
        anyhow::bail!("git is not installed or not on PATH; install it or use --backend libgit2");
    }
    if config.token.is_none() {
        eprintln!(
            "{} no GitHub token given; search and clone rate limits will be low",
            style("warning:").yellow().bold()
        );
    }

    let source = GithubSearch::new(&config.api_url)?.max_pages(config.max_pages);
    let operation = operation_for(config.backend);
    let context = RunContext::new(query, count, config.output_dir.clone(), config.token.clone());

    let cancel = CancelFlag::new();
    if let Err(err) = cancel.install_signal_handlers() {
        tracing::warn!("Could not install interrupt handler: {}", err);
    }

    let progress = if args.no_progress || !std::io::stderr().is_terminal() {
        ProgressBar::hidden()
    } else {
        clone_progress_bar()
    };

    println!("Searching for the top {} repositories matching '{}'...", count, context.query);
    let summary = Pipeline::new(&source, operation.as_ref())
        .options(PipelineOptions {
            concurrency: config.concurrency,
            clone_timeout: config.clone_timeout(),
            archive_prefix: config.archive_prefix.clone(),
            keep_work_dir: config.keep_work_dir,
        })
        .progress(progress)
        .cancel_flag(cancel)
        .run(&context)
        .context("Harvest failed")?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let report = &summary.report;
    println!();
    if summary.cancelled {
        println!("{}", style("Harvest interrupted").yellow().bold());
    } else {
        println!("{}", style("Harvest complete").green().bold());
    }
    println!("  Requested:  {}", report.requested);
    println!("  Attempted:  {}", report.attempted);
    println!("  Succeeded:  {}", style(report.succeeded).green());
    if report.failed > 0 {
        println!("  Failed:     {}", style(report.failed).red());
    } else {
        println!("  Failed:     0");
    }
    println!("  Report:     {}", summary.report_path.display());
    match &summary.archive {
        Some(archive) => {
            println!("  Archive:    {}", archive.path.display());
            println!("  SHA-256:    {}", archive.sha256);
        }
        None => println!("  Archive:    (skipped, nothing was cloned)"),
    }
    if summary.work_dir.exists() {
        println!("  Clones:     {}", summary.work_dir.display());
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("Failures:");
        for entry in failures {
            let detail = entry.error.as_deref().unwrap_or("unknown error");
            let first_line = detail.lines().next().unwrap_or(detail);
            println!("  - {}: {}", entry.identifier, first_line);
        }
    }
}
