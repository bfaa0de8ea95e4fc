use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// What the change detector hashes for each file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Relative path, size and modification time.
    #[default]
    Metadata,
    /// Relative path and full file content.
    Content,
}

/// Settings for opening and scanning a repository.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// workers = 4
/// fingerprint = "content"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Worker threads for decoding and graph assembly. `0` uses the
    /// available hardware parallelism.
    pub workers: usize,
    /// How the change detector fingerprints the store.
    pub fingerprint: FingerprintMode,
    /// Read objects out of pack archives as well as loose files.
    pub include_packs: bool,
    /// Check each packed entry against the CRC32 recorded in its index.
    pub verify_pack_crc: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            fingerprint: FingerprintMode::Metadata,
            include_packs: true,
            verify_pack_crc: true,
        }
    }
}

impl RepoConfig {
    pub fn from_toml_str(s: &str) -> RepoResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> RepoResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RepoError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Worker count with `0` resolved to hardware parallelism.
    pub fn effective_workers(&self) -> usize {
        dagit_store::pool::effective_workers(self.workers)
    }
}
