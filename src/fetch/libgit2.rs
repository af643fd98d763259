//! In-process cloning through libgit2

use crate::error::CloneError;
use crate::fetch::{CloneOperation, CloneRequest};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks};
use std::cell::Cell;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Username GitHub expects alongside a token in basic auth.
const TOKEN_USER: &str = "x-access-token";

/// libgit2 socket timeouts are process-wide; last value applied, in ms.
static SOCKET_TIMEOUT_MS: Mutex<Option<i32>> = Mutex::new(None);

/// Shallow clone via `git2`. The default backend.
#[derive(Debug, Clone)]
pub struct Libgit2Clone {
    depth: i32,
}

impl Default for Libgit2Clone {
    fn default() -> Self {
        Self { depth: 1 }
    }
}

impl Libgit2Clone {
    pub fn new() -> Self {
        Self::default()
    }

    /// History depth to fetch; `0` fetches everything.
    pub fn depth(mut self, depth: i32) -> Self {
        self.depth = depth.max(0);
        self
    }
}

impl CloneOperation for Libgit2Clone {
    fn fetch_into(&self, request: &CloneRequest<'_>) -> Result<(), CloneError> {
        apply_socket_timeout(request.timeout)?;

        let normalized = normalize_github_url(request.url);
        let deadline = Instant::now() + request.timeout;
        let timed_out = Cell::new(false);
        let offered_credential = Cell::new(false);
        let past_deadline = || {
            if Instant::now() >= deadline {
                timed_out.set(true);
            }
            timed_out.get()
        };

        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = request.credential {
            let offered = &offered_credential;
            // Only reached on a 401; libgit2 re-invokes it after a rejection, so offer once.
            callbacks.credentials(move |_url, _username, _allowed| {
                if offered.replace(true) {
                    return Err(git2::Error::from_str("credential rejected by remote"));
                }
                Cred::userpass_plaintext(TOKEN_USER, token)
            });
        }
        callbacks.transfer_progress(|_progress| !past_deadline());
        callbacks.sideband_progress(|_text| !past_deadline());

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(callbacks);
        if self.depth > 0 {
            fo.depth(self.depth);
        }
        // Public repositories never challenge, so the token has to go out up front.
        if let Some(header) = authorization_header(&normalized, request.credential) {
            fo.custom_headers(&[header.as_str()]);
        }

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fo);

        match builder.clone(&normalized, request.destination) {
            Ok(_) => Ok(()),
            Err(err) if timed_out.get() || Instant::now() >= deadline || is_socket_timeout(&err) => {
                Err(CloneError::Timeout(request.timeout))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// `Authorization: Basic <x-access-token:token>` for http(s) remotes.
fn authorization_header(url: &str, credential: Option<&str>) -> Option<String> {
    let token = credential.filter(|t| !t.is_empty())?;
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return None;
    }
    let encoded = STANDARD.encode(format!("{TOKEN_USER}:{token}"));
    Some(format!("Authorization: Basic {encoded}"))
}

fn is_socket_timeout(err: &git2::Error) -> bool {
    err.message().to_ascii_lowercase().contains("timed out")
}

/// Bound connect and socket reads/writes, which no progress callback covers.
fn apply_socket_timeout(timeout: Duration) -> Result<(), CloneError> {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX).max(1);
    let mut applied = SOCKET_TIMEOUT_MS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if *applied == Some(millis) {
        return Ok(());
    }
    // SAFETY: writes to libgit2's global options are serialized by SOCKET_TIMEOUT_MS.
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
        git2::opts::set_server_timeout_in_milliseconds(millis)?;
    }
    *applied = Some(millis);
    Ok(())
}

/// Normalize a GitHub URL to the canonical HTTPS `.git` form.
///
/// Examples:
/// - `https://github.com/owner/repo`    → `https://github.com/owner/repo.git`
/// - `https://github.com/owner/repo/`   → `https://github.com/owner/repo.git`
/// - `https://github.com/owner/repo.git`→ unchanged
/// - non-GitHub URLs                    → unchanged
pub(crate) fn normalize_github_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.contains("github.com") && !trimmed.ends_with(".git") {
        format!("{}.git", trimmed)
    } else {
        trimmed.to_string()
    }
}
