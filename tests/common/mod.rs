//! Fakes for the search and clone boundaries.

#![allow(dead_code)]

use repo_harvest::{CloneError, CloneOperation, CloneRequest, RepositoryDescriptor, SourceError};
use repo_harvest::source::DescriptorSource;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Root ignores permission bits, so read-only fixtures prove nothing there.
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// URLs containing this marker fail to clone.
pub const FAIL_MARKER: &str = "will-fail";

pub fn repo(identifier: &str, stars: u64) -> RepositoryDescriptor {
    RepositoryDescriptor::new(identifier, format!("https://github.com/{identifier}.git"), stars)
}

pub fn failing_repo(identifier: &str) -> RepositoryDescriptor {
    RepositoryDescriptor::new(
        identifier,
        format!("https://github.com/{identifier}-{FAIL_MARKER}.git"),
        0,
    )
}

/// Returns a fixed descriptor list (or error) and records what it was asked for.
pub struct FakeSource {
    result: Result<Vec<RepositoryDescriptor>, fn() -> SourceError>,
    pub requested: Mutex<Vec<(String, usize, Option<String>)>>,
}

impl FakeSource {
    pub fn returning(repos: Vec<RepositoryDescriptor>) -> Self {
        Self { result: Ok(repos), requested: Mutex::new(Vec::new()) }
    }

    pub fn failing(make: fn() -> SourceError) -> Self {
        Self { result: Err(make), requested: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().expect("lock").len()
    }
}

impl DescriptorSource for FakeSource {
    fn fetch(
        &self,
        query: &str,
        count: usize,
        credential: Option<&str>,
    ) -> Result<Vec<RepositoryDescriptor>, SourceError> {
        self.requested.lock().expect("lock").push((
            query.to_string(),
            count,
            credential.map(str::to_string),
        ));
        match &self.result {
            Ok(repos) => Ok(repos.clone()),
            Err(make) => Err(make()),
        }
    }
}

/// Writes a small fake checkout (with `.git`) and tracks how many clones
/// run at the same time.
#[derive(Default)]
pub struct FakeClone {
    delay: Duration,
    lock_checkouts: bool,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    pub credentials: Mutex<Vec<Option<String>>>,
}

impl FakeClone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    /// Leave every checkout read-only so its `.git` cannot be removed.
    pub fn locking_checkouts() -> Self {
        Self { lock_checkouts: true, ..Self::default() }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn write_checkout(request: &CloneRequest<'_>) -> std::io::Result<()> {
        fs::create_dir_all(request.destination.join(".git/objects"))?;
        fs::write(request.destination.join(".git/HEAD"), "ref: refs/heads/main\n")?;
        fs::write(request.destination.join("README.md"), format!("# {}\n", request.url))?;
        Ok(())
    }

    #[cfg(unix)]
    fn lock(path: &std::path::Path) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o555))
    }

    #[cfg(not(unix))]
    fn lock(_path: &std::path::Path) -> std::io::Result<()> {
        Ok(())
    }
}

impl CloneOperation for FakeClone {
    fn fetch_into(&self, request: &CloneRequest<'_>) -> Result<(), CloneError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().expect("lock").push(request.credential.map(str::to_string));
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let mut written = Self::write_checkout(request);
        if written.is_ok() && self.lock_checkouts {
            written = Self::lock(request.destination);
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        written?;

        if request.url.contains(FAIL_MARKER) {
            return Err(CloneError::Exit {
                code: 128,
                stderr: "fatal: repository not found".to_string(),
            });
        }
        Ok(())
    }
}
