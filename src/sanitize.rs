//! Version-control metadata removal for cloned repositories

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

pub const VCS_METADATA_DIR: &str = ".git";

/// What happened to the metadata directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeResult {
    Removed,
    Absent,
    /// Removal failed; the repository is kept as-is.
    Kept(String),
}

/// Remove `<local_path>/.git`. Idempotent and never fails the run.
pub fn sanitize(local_path: &Path) -> SanitizeResult {
    let meta_path = local_path.join(VCS_METADATA_DIR);
    let metadata = match fs::symlink_metadata(&meta_path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return SanitizeResult::Absent,
        Err(err) => return kept(&meta_path, err),
    };

    match remove(&meta_path, metadata.is_dir()) {
        Ok(()) => SanitizeResult::Removed,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            // Pack files are often read-only; clear the flag and retry once.
            clear_readonly(&meta_path);
            match remove(&meta_path, metadata.is_dir()) {
                Ok(()) => SanitizeResult::Removed,
                Err(err) => kept(&meta_path, err),
            }
        }
        Err(err) => kept(&meta_path, err),
    }
}

fn remove(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(root: &Path) {
    for entry in WalkDir::new(root).follow_links(false).into_iter().filter_map(Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut perms = metadata.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            let _ = fs::set_permissions(entry.path(), perms);
        }
    }
}

fn kept(path: &Path, err: io::Error) -> SanitizeResult {
    tracing::warn!("Keeping {}: could not remove it: {}", path.display(), err);
    SanitizeResult::Kept(err.to_string())
}
