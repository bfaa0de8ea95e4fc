//! Error types for snapshot building.

use dagit_repo::RepoError;

/// Errors that abort a snapshot.
///
/// Problems with a single object never appear here; they become warnings
/// on that object's node.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Reading refs or the object store failed.
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),

    /// A payload could not be converted to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
