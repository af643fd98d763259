//! Repository cloning (libgit2 or the git CLI) and the worker pool driving it

use crate::domain::CloneBackend;
use crate::error::CloneError;
use std::path::Path;
use std::time::Duration;

pub mod cancel;
pub mod git_cli;
pub mod layout;
pub mod libgit2;
pub mod pool;

pub use cancel::CancelFlag;
pub use git_cli::GitCliClone;
pub use libgit2::Libgit2Clone;
pub use pool::{clone_all, ClonePool};

/// Everything one clone attempt needs.
#[derive(Debug, Clone, Copy)]
pub struct CloneRequest<'a> {
    pub url: &'a str,
    pub destination: &'a Path,
    pub credential: Option<&'a str>,
    pub timeout: Duration,
}

/// A single clone into an empty destination directory.
///
/// Implementations must be callable from several worker threads at once.
pub trait CloneOperation: Send + Sync {
    fn fetch_into(&self, request: &CloneRequest<'_>) -> Result<(), CloneError>;
}

/// Build the clone implementation selected in configuration.
///
/// Dispatches on the backend:
/// - [`CloneBackend::Libgit2`] → [`Libgit2Clone`]
/// - [`CloneBackend::GitCli`] → [`GitCliClone`]
pub fn operation_for(backend: CloneBackend) -> Box<dyn CloneOperation> {
    match backend {
        CloneBackend::Libgit2 => Box::new(Libgit2Clone::new()),
        CloneBackend::GitCli => Box::new(GitCliClone::new()),
    }
}
