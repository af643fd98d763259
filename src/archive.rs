//! Bundling cleaned repositories and the run report into one `.tar.gz`.

use crate::domain::{MANIFEST_FILE_NAME, REPORT_FILE_NAME};
use crate::error::ArchiveError;
use crate::fetch::layout::clean_dir_name;
use crate::render::RunReport;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// A finished archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutput {
    pub path: PathBuf,
    pub sha256: String,
    /// Number of repository directories bundled.
    pub repositories: usize,
}

/// `<prefix>_<timestamp>.tar.gz`
pub fn archive_file_name(prefix: &str, timestamp: &str) -> String {
    format!("{}_{}.{}", clean_dir_name(prefix), timestamp, ARCHIVE_EXTENSION)
}

/// Write `directories` plus the report and manifest into one archive in `output_dir`.
///
/// Each directory is stored at the archive root under its own file name.
/// The archive is assembled in a temporary file and renamed into place only
/// once complete, so the final name never refers to a partial archive.
pub fn archive(
    output_dir: &Path,
    directories: &[PathBuf],
    report: &RunReport,
    archive_name_prefix: &str,
) -> Result<ArchiveOutput, ArchiveError> {
    fs::create_dir_all(output_dir)
        .map_err(|source| ArchiveError::Create { dir: output_dir.to_path_buf(), source })?;

    let final_path = output_dir.join(archive_file_name(archive_name_prefix, &report.timestamp));
    let manifest = serde_json::to_string_pretty(&report.to_manifest()?)?;

    let mut sorted: Vec<&PathBuf> = directories.iter().collect();
    sorted.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut tmp = tempfile::Builder::new()
        .prefix(".repo-harvest-")
        .suffix(".partial")
        .tempfile_in(output_dir)
        .map_err(|source| ArchiveError::Create { dir: output_dir.to_path_buf(), source })?;

    {
        let encoder =
            GzEncoder::new(BufWriter::new(tmp.as_file_mut()), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);

        let mtime = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        append_bytes(&mut builder, REPORT_FILE_NAME, report.render_text().as_bytes(), mtime)?;
        append_bytes(&mut builder, MANIFEST_FILE_NAME, manifest.as_bytes(), mtime)?;

        for dir in &sorted {
            append_tree(&mut builder, dir)?;
        }

        let encoder = builder.into_inner().map_err(|source| ArchiveError::Append {
            path: final_path.clone(),
            source,
        })?;
        let mut writer = encoder.finish().map_err(|source| ArchiveError::Append {
            path: final_path.clone(),
            source,
        })?;
        writer
            .flush()
            .map_err(|source| ArchiveError::Append { path: final_path.clone(), source })?;
    }

    tmp.as_file()
        .sync_all()
        .map_err(|source| ArchiveError::Persist { path: final_path.clone(), source })?;
    let sha256 = digest(tmp.path())
        .map_err(|source| ArchiveError::Persist { path: final_path.clone(), source })?;

    tmp.persist(&final_path)
        .map_err(|e| ArchiveError::Persist { path: final_path.clone(), source: e.error })?;

    tracing::info!("Wrote {} ({} repositories)", final_path.display(), sorted.len());
    Ok(ArchiveOutput { path: final_path, sha256, repositories: sorted.len() })
}

fn append_bytes<W: Write>(
    builder: &mut tar::Builder<W>,
    name: &str,
    bytes: &[u8],
    mtime: u64,
) -> Result<(), ArchiveError> {
    let mut header = tar::Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(mtime);
    header.set_cksum();
    builder
        .append_data(&mut header, name, bytes)
        .map_err(|source| ArchiveError::Append { path: PathBuf::from(name), source })
}

fn append_tree<W: Write>(builder: &mut tar::Builder<W>, dir: &Path) -> Result<(), ArchiveError> {
    let root_name = dir.file_name().ok_or_else(|| ArchiveError::Append {
        path: dir.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "directory has no file name"),
    })?;

    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| ArchiveError::Append {
            path: dir.to_path_buf(),
            source: io::Error::from(e),
        })?;
        let relative = entry.path().strip_prefix(dir).unwrap_or(Path::new(""));
        let name = Path::new(root_name).join(relative);
        builder
            .append_path_with_name(entry.path(), &name)
            .map_err(|source| ArchiveError::Append { path: entry.path().to_path_buf(), source })?;
    }
    Ok(())
}

fn digest(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
