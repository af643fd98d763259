//! Core data types shared by every pipeline stage.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Hard ceiling of the GitHub search API (10 pages of 100 results).
pub const MAX_SEARCH_RESULTS: usize = 1000;

/// Name of the text report inside the archive.
pub const REPORT_FILE_NAME: &str = "REPORT.txt";

/// Name of the JSON manifest inside the archive.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

pub const MANIFEST_SCHEMA_VERSION: &str = "1.0.0";

/// A remote repository found by the search, and how to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// `owner/name`, unique within a run.
    pub identifier: String,
    pub clone_url: String,
    pub html_url: Option<String>,
    pub description: Option<String>,
    pub stars: u64,
    pub size_kb: u64,
}

impl RepositoryDescriptor {
    pub fn new(identifier: impl Into<String>, clone_url: impl Into<String>, stars: u64) -> Self {
        Self {
            identifier: identifier.into(),
            clone_url: clone_url.into(),
            html_url: None,
            description: None,
            stars,
            size_kb: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneStatus {
    Success,
    Failed,
}

impl CloneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloneStatus::Success => "success",
            CloneStatus::Failed => "failed",
        }
    }
}

/// Result of one clone attempt. Exactly one exists per descriptor.
#[derive(Debug, Clone)]
pub struct CloneOutcome {
    pub descriptor: RepositoryDescriptor,
    /// Directory name assigned under the work directory.
    pub dir_name: String,
    pub status: CloneStatus,
    pub local_path: Option<PathBuf>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl CloneOutcome {
    pub fn success(
        descriptor: RepositoryDescriptor,
        dir_name: String,
        local_path: PathBuf,
        elapsed: Duration,
    ) -> Self {
        Self {
            descriptor,
            dir_name,
            status: CloneStatus::Success,
            local_path: Some(local_path),
            error: None,
            elapsed,
        }
    }

    pub fn failed(
        descriptor: RepositoryDescriptor,
        dir_name: String,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            descriptor,
            dir_name,
            status: CloneStatus::Failed,
            local_path: None,
            error: Some(error.into()),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CloneStatus::Success
    }
}

/// Immutable per-run inputs. Determines the archive name.
#[derive(Clone)]
pub struct RunContext {
    pub query: String,
    pub requested: usize,
    pub started_at: DateTime<Local>,
    pub output_dir: PathBuf,
    pub credential: Option<String>,
}

impl RunContext {
    pub fn new(
        query: impl Into<String>,
        requested: usize,
        output_dir: PathBuf,
        credential: Option<String>,
    ) -> Self {
        Self {
            query: query.into(),
            requested,
            started_at: Local::now(),
            output_dir,
            credential: credential.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Run timestamp to the second, used in every file name of the run.
    pub fn timestamp(&self) -> String {
        self.started_at.format("%Y-%m-%d_%H%M%S").to_string()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("query", &self.query)
            .field("requested", &self.requested)
            .field("started_at", &self.started_at)
            .field("output_dir", &self.output_dir)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Which clone implementation the pool drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloneBackend {
    #[default]
    Libgit2,
    GitCli,
}

impl std::str::FromStr for CloneBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "libgit2" | "git2" => Ok(CloneBackend::Libgit2),
            "git-cli" | "git" | "cli" => Ok(CloneBackend::GitCli),
            other => Err(format!("Invalid clone backend: '{other}' (expected libgit2|git-cli)")),
        }
    }
}
