//! End-to-end harvest run: search, clone, sanitize, report, archive.

use crate::archive::{archive, ArchiveOutput};
use crate::domain::{CloneOutcome, RunContext, MAX_SEARCH_RESULTS};
use crate::error::{HarvestError, Result};
use crate::fetch::layout::clean_dir_name;
use crate::fetch::pool::{DEFAULT_CLONE_TIMEOUT, DEFAULT_CONCURRENCY};
use crate::fetch::{CancelFlag, CloneOperation, ClonePool};
use crate::render::{build_report, RunReport};
use crate::sanitize::{sanitize, SanitizeResult};
use crate::source::DescriptorSource;
use indicatif::ProgressBar;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub concurrency: usize,
    pub clone_timeout: Duration,
    /// Defaults to `GITHUB_<query>`.
    pub archive_prefix: Option<String>,
    pub keep_work_dir: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            clone_timeout: DEFAULT_CLONE_TIMEOUT,
            archive_prefix: None,
            keep_work_dir: false,
        }
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub report: RunReport,
    pub report_path: PathBuf,
    /// `None` when no repository was cloned successfully.
    pub archive: Option<ArchiveOutput>,
    pub work_dir: PathBuf,
    pub outcomes: Vec<CloneOutcome>,
    pub cancelled: bool,
}

/// Harvest pipeline over a descriptor source and a clone implementation.
pub struct Pipeline<'a> {
    source: &'a dyn DescriptorSource,
    operation: &'a dyn CloneOperation,
    options: PipelineOptions,
    progress: Option<ProgressBar>,
    cancel: CancelFlag,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn DescriptorSource, operation: &'a dyn CloneOperation) -> Self {
        Self {
            source,
            operation,
            options: PipelineOptions::default(),
            progress: None,
            cancel: CancelFlag::new(),
        }
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&self, context: &RunContext) -> Result<RunSummary> {
        let query = context.query.trim();
        if query.is_empty() {
            return Err(HarvestError::InvalidInput("search query must not be empty".into()));
        }
        if context.requested == 0 {
            return Err(HarvestError::InvalidInput("repository count must be positive".into()));
        }
        let count = if context.requested > MAX_SEARCH_RESULTS {
            tracing::warn!(
                "Requested {} repositories; the search API returns at most {}",
                context.requested,
                MAX_SEARCH_RESULTS
            );
            MAX_SEARCH_RESULTS
        } else {
            context.requested
        };

        let prefix = clean_dir_name(
            &self.options.archive_prefix.clone().unwrap_or_else(|| default_prefix(query)),
        );
        let stem = format!("{prefix}_{}", context.timestamp());
        let work_dir = context.output_dir.join(format!("{stem}.work"));
        if work_dir.exists() {
            // Another run started in the same second; its clones are not ours to touch.
            return Err(HarvestError::Workspace {
                path: work_dir,
                source: io::Error::new(io::ErrorKind::AlreadyExists, "work directory already exists"),
            });
        }

        let descriptors = self.source.fetch(query, count, context.credential.as_deref())?;
        tracing::info!("Found {} repositories for {:?}", descriptors.len(), query);

        let mut pool = ClonePool::new(self.operation)
            .concurrency(self.options.concurrency)
            .credential(context.credential.clone())
            .timeout(self.options.clone_timeout)
            .cancel_flag(self.cancel.clone());
        if let Some(progress) = &self.progress {
            progress.set_length(descriptors.len() as u64);
            pool = pool.progress(progress.clone());
        }
        let outcomes = pool.clone_all(&descriptors, &work_dir)?;
        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }
        let cancelled = self.cancel.is_cancelled();

        sanitize_successes(&outcomes);

        let report = build_report(context, &outcomes);
        let report_path = context.output_dir.join(format!("{stem}_REPORT.txt"));
        fs::write(&report_path, report.render_text())
            .map_err(|source| HarvestError::Workspace { path: report_path.clone(), source })?;

        let directories: Vec<PathBuf> =
            outcomes.iter().filter_map(|o| o.local_path.clone()).collect();
        let archive = if directories.is_empty() {
            tracing::warn!("No repository was cloned successfully; skipping archive creation");
            None
        } else {
            Some(archive(&context.output_dir, &directories, &report, &prefix)?)
        };

        if cancelled {
            tracing::warn!("Run interrupted; leaving {} in place", work_dir.display());
        } else if !self.options.keep_work_dir {
            remove_work_dir(&work_dir);
        }

        Ok(RunSummary { report, report_path, archive, work_dir, outcomes, cancelled })
    }
}

/// `GITHUB_<query>` with unsafe characters replaced.
pub fn default_prefix(query: &str) -> String {
    format!("GITHUB_{}", clean_dir_name(query))
}

fn sanitize_successes(outcomes: &[CloneOutcome]) {
    let mut kept = 0usize;
    for path in outcomes.iter().filter_map(|o| o.local_path.as_deref()) {
        if let SanitizeResult::Kept(_) = sanitize(path) {
            kept += 1;
        }
    }
    if kept > 0 {
        tracing::warn!("{kept} repositories kept their .git directory");
    }
}

fn remove_work_dir(work_dir: &Path) {
    if !work_dir.exists() {
        return;
    }
    if let Err(err) = fs::remove_dir_all(work_dir) {
        tracing::warn!("Could not remove work directory {}: {}", work_dir.display(), err);
    }
}
