//! repo-harvest: search GitHub, clone the top matches, and bundle them into one archive

use anyhow::Result;

fn main() -> Result<()> {
    repo_harvest::cli::run()
}
