//! Shared CLI utilities.

use crate::domain::CloneBackend;
use indicatif::{ProgressBar, ProgressStyle};

pub const DEFAULT_COUNT: usize = 10;

/// Parse `--backend`, passing `None` through.
pub fn parse_backend(value: Option<&str>) -> anyhow::Result<Option<CloneBackend>> {
    value.map(str::parse::<CloneBackend>).transpose().map_err(anyhow::Error::msg)
}

pub fn clone_progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} repos",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    ProgressBar::new(0).with_style(style)
}

/// Render a size given in KiB with a binary unit.
pub fn format_size_kb(kb: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    let mut value = kb as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{kb} KB")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
