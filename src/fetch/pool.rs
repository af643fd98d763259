//! Bounded-concurrency clone worker pool

use crate::domain::{CloneOutcome, RepositoryDescriptor};
use crate::error::HarvestError;
use crate::fetch::layout::assign_dir_names;
use crate::fetch::{CancelFlag, CloneOperation, CloneRequest};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::Path;
use std::time::{Duration, Instant};

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(180);

const CANCELLED_DETAIL: &str = "cancelled before clone started";

/// Runs a [`CloneOperation`] over many descriptors with at most
/// `concurrency` clones in flight.
pub struct ClonePool<'a> {
    operation: &'a dyn CloneOperation,
    concurrency: usize,
    credential: Option<String>,
    timeout: Duration,
    progress: Option<ProgressBar>,
    cancel: CancelFlag,
}

impl<'a> ClonePool<'a> {
    pub fn new(operation: &'a dyn CloneOperation) -> Self {
        Self {
            operation,
            concurrency: DEFAULT_CONCURRENCY,
            credential: None,
            timeout: DEFAULT_CLONE_TIMEOUT,
            progress: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Maximum simultaneous clones (at least 1).
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    pub fn credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Advanced once per finished descriptor.
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Clone every descriptor into its own directory under `output_dir`.
    ///
    /// Returns one outcome per descriptor in input order. Individual clone
    /// failures are captured in the outcomes; only failing to set up the
    /// output directory or the thread pool is an error.
    pub fn clone_all(
        &self,
        descriptors: &[RepositoryDescriptor],
        output_dir: &Path,
    ) -> Result<Vec<CloneOutcome>, HarvestError> {
        std::fs::create_dir_all(output_dir).map_err(|source| HarvestError::Workspace {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let dir_names = assign_dir_names(descriptors);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("clone-worker-{i}"))
            .build()
            .map_err(|e| HarvestError::Pool(e.to_string()))?;

        tracing::debug!(
            "Cloning {} repositories with {} workers into {}",
            descriptors.len(),
            self.concurrency,
            output_dir.display()
        );

        let outcomes = pool.install(|| {
            descriptors
                .par_iter()
                .zip(dir_names.into_par_iter())
                .map(|(descriptor, dir_name)| self.clone_one(descriptor, dir_name, output_dir))
                .collect::<Vec<_>>()
        });

        Ok(outcomes)
    }

    fn clone_one(
        &self,
        descriptor: &RepositoryDescriptor,
        dir_name: String,
        output_dir: &Path,
    ) -> CloneOutcome {
        if self.cancel.is_cancelled() {
            self.tick();
            return CloneOutcome::failed(
                descriptor.clone(),
                dir_name,
                CANCELLED_DETAIL,
                Duration::ZERO,
            );
        }

        let destination = output_dir.join(&dir_name);
        if destination.exists() {
            // Not ours to overwrite, and not ours to clean up afterwards.
            self.tick();
            tracing::warn!("Skipping {}: {} already exists", descriptor.identifier, destination.display());
            return CloneOutcome::failed(
                descriptor.clone(),
                dir_name,
                format!("destination {} already exists", destination.display()),
                Duration::ZERO,
            );
        }

        let request = CloneRequest {
            url: &descriptor.clone_url,
            destination: &destination,
            credential: self.credential.as_deref(),
            timeout: self.timeout,
        };

        let started = Instant::now();
        let result = self.operation.fetch_into(&request);
        let elapsed = started.elapsed();
        self.tick();

        match result {
            Ok(()) => {
                tracing::info!("Cloned {} in {:.1}s", descriptor.identifier, elapsed.as_secs_f64());
                CloneOutcome::success(descriptor.clone(), dir_name, destination, elapsed)
            }
            Err(err) => {
                tracing::warn!("Clone of {} failed: {}", descriptor.identifier, err);
                remove_partial(&destination);
                CloneOutcome::failed(descriptor.clone(), dir_name, err.to_string(), elapsed)
            }
        }
    }

    fn tick(&self) {
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
    }
}

/// Convenience wrapper: `ClonePool::new(operation).concurrency(limit).clone_all(..)`.
pub fn clone_all(
    operation: &dyn CloneOperation,
    descriptors: &[RepositoryDescriptor],
    concurrency_limit: usize,
    output_dir: &Path,
) -> Result<Vec<CloneOutcome>, HarvestError> {
    ClonePool::new(operation).concurrency(concurrency_limit).clone_all(descriptors, output_dir)
}

fn remove_partial(destination: &Path) {
    if !destination.exists() {
        return;
    }
    if let Err(err) = std::fs::remove_dir_all(destination) {
        tracing::warn!("Could not remove partial clone {}: {}", destination.display(), err);
    }
}
