//! Change detection over the store's metadata subtree.
//!
//! The fingerprint covers `objects/`, `refs/`, `HEAD` and `packed-refs`.
//! The index, logs and config are left out: they change on operations
//! that add no objects and move no refs.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::debug;
use walkdir::WalkDir;

use crate::config::FingerprintMode;
use crate::error::{RepoError, RepoResult};
use crate::layout::StoreLayout;

/// Compute the fingerprint of the store described by `layout`.
///
/// Files are visited in sorted path order, so the result does not depend on
/// directory iteration order. Files that vanish mid-walk (a concurrent
/// `git gc`) are skipped; the next call will see the settled state.
pub fn fingerprint(layout: &StoreLayout, mode: FingerprintMode) -> RepoResult<String> {
    layout.ensure_readable()?;

    let mut files: Vec<PathBuf> = Vec::new();
    for watched in layout.watched_paths() {
        if !watched.exists() {
            continue;
        }
        for entry in WalkDir::new(&watched).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(err) => debug!(error = %err, "skipping entry while fingerprinting"),
            }
        }
    }
    files.sort();

    let mut hasher = blake3::Hasher::new();
    for path in &files {
        let rel = path.strip_prefix(&layout.root).unwrap_or(path);
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        match mode {
            FingerprintMode::Metadata => hash_metadata(&mut hasher, path),
            FingerprintMode::Content => hash_content(&mut hasher, path)?,
        }
    }
    Ok(hasher.finalize().to_hex().to_string())
}

fn hash_metadata(hasher: &mut blake3::Hasher, path: &Path) {
    let Ok(meta) = std::fs::metadata(path) else {
        return;
    };
    hasher.update(&meta.len().to_le_bytes());
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    hasher.update(&mtime.to_le_bytes());
}

fn hash_content(hasher: &mut blake3::Hasher, path: &Path) -> RepoResult<()> {
    match std::fs::read(path) {
        Ok(bytes) => {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RepoError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        }),
    }
}
