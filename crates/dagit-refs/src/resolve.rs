//! Reading HEAD and branches from a store root.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use dagit_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::validate_branch_name;
use crate::types::{Branch, Head, HEADS_PREFIX};

/// Symbolic-ref marker at the start of HEAD.
const SYMREF_PREFIX: &str = "ref:";

/// Parse the content of a HEAD file.
///
/// `ref: <path>` is symbolic (the path is trimmed); anything else must be a
/// bare commit id.
pub fn parse_head(content: &str) -> Result<Head> {
    let trimmed = content.trim();
    if let Some(path) = trimmed.strip_prefix(SYMREF_PREFIX) {
        return Ok(Head::Symbolic(path.trim().to_string()));
    }
    trimmed
        .parse::<ObjectId>()
        .map(Head::Detached)
        .map_err(|_| RefError::InvalidHead {
            content: trimmed.to_string(),
        })
}

/// Read `<store_root>/HEAD`.
pub fn read_head(store_root: &Path) -> Result<Head> {
    let path = store_root.join("HEAD");
    let content = std::fs::read_to_string(&path).map_err(|source| RefError::Io { path, source })?;
    parse_head(&content)
}

/// Parse a `packed-refs` file, keeping only branch entries.
///
/// Comment lines (`#`) and peeled-tag lines (`^`) are skipped, as are lines
/// whose id does not parse or whose name git would not accept.
pub fn parse_packed_refs(content: &str) -> Vec<Branch> {
    content
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
        .filter_map(|line| {
            let (hex, refname) = line.split_once(' ')?;
            let name = refname.trim().strip_prefix(HEADS_PREFIX)?;
            if let Err(err) = validate_branch_name(name) {
                debug!(error = %err, "ignoring packed ref");
                return None;
            }
            match hex.parse::<ObjectId>() {
                Ok(commit_id) => Some(Branch {
                    name: name.to_string(),
                    commit_id,
                }),
                Err(err) => {
                    warn!(name, error = %err, "skipping packed ref");
                    None
                }
            }
        })
        .collect()
}

/// Enumerate branches under `<store_root>/refs/heads/` plus any listed in
/// `<store_root>/packed-refs`, sorted by name.
///
/// A loose ref wins over a packed entry of the same name. Files that are
/// not valid branch names (lock files) or do not hold a commit id are
/// skipped with a warning. A missing `refs/heads/` is not an error.
pub fn list_branches(store_root: &Path) -> Result<Vec<Branch>> {
    let mut branches: BTreeMap<String, ObjectId> = BTreeMap::new();

    let packed = store_root.join("packed-refs");
    match std::fs::read_to_string(&packed) {
        Ok(content) => {
            for branch in parse_packed_refs(&content) {
                branches.insert(branch.name, branch.commit_id);
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => return Err(RefError::Io { path: packed, source }),
    }

    let heads = store_root.join(HEADS_PREFIX);
    if heads.is_dir() {
        for entry in WalkDir::new(&heads).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|err| RefError::Io {
                path: err.path().unwrap_or(&heads).to_path_buf(),
                source: err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = branch_name(&heads, entry.path()) else {
                continue;
            };
            if let Err(err) = validate_branch_name(&name) {
                debug!(error = %err, "ignoring file under refs/heads");
                continue;
            }
            match read_branch(&name, entry.path()) {
                Ok(branch) => {
                    branches.insert(branch.name, branch.commit_id);
                }
                Err(err) => warn!(error = %err, "skipping branch"),
            }
        }
    }

    Ok(branches
        .into_iter()
        .map(|(name, commit_id)| Branch { name, commit_id })
        .collect())
}

/// Name relative to `refs/heads/`, always `/`-separated.
fn branch_name(heads: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(heads).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

fn read_branch(name: &str, path: &Path) -> Result<Branch> {
    let content = std::fs::read_to_string(path).map_err(|source| RefError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let commit_id = content
        .trim()
        .parse::<ObjectId>()
        .map_err(|err| RefError::InvalidTarget {
            name: name.to_string(),
            reason: err.to_string(),
        })?;
    Ok(Branch {
        name: name.to_string(),
        commit_id,
    })
}
