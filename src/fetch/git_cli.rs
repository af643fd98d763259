//! Cloning by shelling out to the `git` executable

use crate::error::CloneError;
use crate::fetch::{CloneOperation, CloneRequest};
use std::ffi::OsString;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// `git clone --depth 1` in a child process, killed once the timeout passes.
#[derive(Debug, Clone)]
pub struct GitCliClone {
    program: OsString,
    depth: u32,
}

impl Default for GitCliClone {
    fn default() -> Self {
        Self { program: OsString::from("git"), depth: 1 }
    }
}

impl GitCliClone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable in place of `git`.
    pub fn program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// History depth to fetch; `0` fetches everything.
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Check that the executable runs at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl CloneOperation for GitCliClone {
    fn fetch_into(&self, request: &CloneRequest<'_>) -> Result<(), CloneError> {
        let url = authenticated_url(request.url, request.credential);

        let mut cmd = Command::new(&self.program);
        cmd.arg("clone").arg("--quiet");
        if self.depth > 0 {
            cmd.arg("--depth").arg(self.depth.to_string());
        }
        cmd.arg(&url)
            .arg(request.destination)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own group, so a timeout also reaches git-remote-https.
            cmd.process_group(0);
        }

        let mut child = cmd.spawn()?;

        // Drain stderr off-thread so a chatty git never blocks on a full pipe.
        let stderr = child.stderr.take();
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut buf);
            }
            buf
        });

        let deadline = Instant::now() + request.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                kill_process_group(&mut child);
                let _ = child.wait();
                // The pipe closes once every process in the group is gone.
                let _ = reader.join();
                return Err(CloneError::Timeout(request.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if status.success() {
            return Ok(());
        }

        let stderr = reader.join().unwrap_or_default();
        Err(CloneError::Exit {
            code: status.code().unwrap_or(-1),
            stderr: redact(stderr.trim(), request.credential),
        })
    }
}

fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: the child leads its own process group (`process_group(0)` above).
            if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
                return;
            }
        }
    }
    let _ = child.kill();
}

/// Embed the token as userinfo for HTTPS GitHub URLs; everything else is left alone.
fn authenticated_url(url: &str, credential: Option<&str>) -> String {
    let Some(token) = credential else {
        return url.to_string();
    };
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.scheme() != "https" || parsed.host_str() != Some("github.com") {
        return url.to_string();
    }
    if parsed.set_username(token).is_err() {
        return url.to_string();
    }
    parsed.to_string()
}

fn redact(text: &str, credential: Option<&str>) -> String {
    match credential {
        Some(token) if !token.is_empty() => text.replace(token, "***"),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn token_is_embedded_only_for_github_https() {
        assert_eq!(
            authenticated_url("https://github.com/o/r.git", Some("tok")),
            "https://tok@github.com/o/r.git"
        );
        assert_eq!(
            authenticated_url("https://gitlab.com/o/r.git", Some("tok")),
            "https://gitlab.com/o/r.git"
        );
        assert_eq!(
            authenticated_url("git@github.com:o/r.git", Some("tok")),
            "git@github.com:o/r.git"
        );
        assert_eq!(authenticated_url("https://github.com/o/r.git", None), "https://github.com/o/r.git");
    }

    #[test]
    fn redact_hides_token() {
        assert_eq!(
            redact("fatal: could not read from https://tok@github.com", Some("tok")),
            "fatal: could not read from https://***@github.com"
        );
        assert_eq!(redact("plain", None), "plain");
    }

    #[test]
    fn missing_program_is_io_error() {
        let tmp = TempDir::new().expect("tmp");
        let dest = tmp.path().join("repo");
        let request = CloneRequest {
            url: "https://github.com/o/r.git",
            destination: &dest,
            credential: None,
            timeout: Duration::from_secs(5),
        };
        let op = GitCliClone::new().program("repo-harvest-no-such-binary");
        assert!(!op.is_available());
        assert!(matches!(op.fetch_into(&request), Err(CloneError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_captures_stderr() {
        let tmp = TempDir::new().expect("tmp");
        let script = write_script(tmp.path(), "fail.sh", "echo 'fatal: repository not found' >&2\nexit 128\n");
        let dest = tmp.path().join("repo");
        let request = CloneRequest {
            url: "https://github.com/o/r.git",
            destination: &dest,
            credential: None,
            timeout: Duration::from_secs(10),
        };
        let err = GitCliClone::new().program(script).fetch_into(&request).expect_err("fails");
        match err {
            CloneError::Exit { code, stderr } => {
                assert_eq!(code, 128);
                assert_eq!(stderr, "fatal: repository not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn slow_clone_times_out() {
        let tmp = TempDir::new().expect("tmp");
        let script = write_script(tmp.path(), "slow.sh", "sleep 5\n");
        let dest = tmp.path().join("repo");
        let request = CloneRequest {
            url: "https://github.com/o/r.git",
            destination: &dest,
            credential: None,
            timeout: Duration::from_millis(200),
        };
        let started = Instant::now();
        let err = GitCliClone::new().program(script).fetch_into(&request).expect_err("times out");
        assert!(matches!(err, CloneError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_background_helpers() {
        let tmp = TempDir::new().expect("tmp");
        let marker = tmp.path().join("late-write");
        let body = format!("(sleep 1; touch '{}') &\nsleep 5\n", marker.display());
        let script = write_script(tmp.path(), "helper.sh", &body);
        let dest = tmp.path().join("repo");
        let request = CloneRequest {
            url: "https://github.com/o/r.git",
            destination: &dest,
            credential: None,
            timeout: Duration::from_millis(200),
        };

        let err = GitCliClone::new().program(script).fetch_into(&request).expect_err("times out");
        assert!(matches!(err, CloneError::Timeout(_)));

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "a helper outlived the timeout");
    }

    #[cfg(unix)]
    fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("meta").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }
}
