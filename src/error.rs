//! Error taxonomy for the harvest pipeline.
//!
//! Only [`SourceError`] and [`ArchiveError`] end a run. Clone and sanitize
//! failures are recorded as data and never surface here.

use std::path::PathBuf;
use std::time::Duration;

/// Descriptor retrieval failed; no outcomes can be produced.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("authentication rejected by the search API (check your token)")]
    AuthInvalid,

    #[error("search API rate limit reached: {0}")]
    RateLimited(String),

    #[error("network error talking to the search API: {0}")]
    Network(String),

    #[error("no repositories matched query '{0}'")]
    EmptyResult(String),

    #[error("malformed search result: {0}")]
    Malformed(String),
}

/// One descriptor's clone failed. Recorded as a failed outcome.
#[derive(Debug, thiserror::Error)]
pub enum CloneError {
    #[error("clone timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("git exited with status {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<git2::Error> for CloneError {
    fn from(err: git2::Error) -> Self {
        CloneError::Git(err.message().to_string())
    }
}

/// Bundling failed; no archive exists under the final name.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to create archive in {dir}: {source}")]
    Create {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to add {path} to archive: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize run manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to finalize archive {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run-terminating failures.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("invalid run input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to prepare {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build clone worker pool: {0}")]
    Pool(String),
}

pub type Result<T, E = HarvestError> = std::result::Result<T, E>;
