//! Command-line interface for repo-harvest
//!
//! Provides `harvest`, `search` and `completions` subcommands.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod guided;
mod harvest;
mod search;
mod utils;

/// Search GitHub, clone the most popular matches, and bundle them into one archive
#[derive(Parser)]
#[command(name = "repo-harvest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, clone, clean and archive the top repositories for a query
    Harvest(Box<harvest::HarvestArgs>),

    /// List the repositories a harvest would clone, without cloning
    Search(search::SearchArgs),

    /// Print shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Harvest(args) => harvest::run(*args),
        Commands::Search(args) => search::run(args),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "repo-harvest", &mut std::io::stdout());
            Ok(())
        }
    }
}
