use std::path::PathBuf;

use thiserror::Error;

use dagit_types::ObjectId;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not a git repository (no .git directory, and not a bare store): {}", .0.display())]
    NotARepository(PathBuf),

    #[error("object store unavailable at {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("store error: {0}")]
    Store(#[from] dagit_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] dagit_refs::RefError),

    #[error("pack error: {0}")]
    Pack(#[from] dagit_pack::PackError),
}

pub type RepoResult<T> = Result<T, RepoError>;
