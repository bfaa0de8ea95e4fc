use std::path::PathBuf;

use dagit_types::ObjectId;

/// Errors from reading and parsing stored objects.
///
/// Every variant describes a failure of a single object (or a single walk
/// entry). Callers decide whether to skip the object or abort the scan.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object file could not be read (permissions, deleted mid-scan).
    #[error("cannot read object file {}: {source}", path.display())]
    ObjectRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compressed stream is corrupt or truncated.
    #[error("corrupt zlib stream in {}: {reason}", path.display())]
    Inflate { path: PathBuf, reason: String },

    /// The `<type> <size>\0` header could not be decoded.
    #[error("cannot decode object {id}: {reason}")]
    Decode { id: ObjectId, reason: String },

    /// Tree content does not fit the `<mode> <name>\0<hash>` grammar.
    #[error("malformed tree {id}: {reason}")]
    MalformedTree { id: ObjectId, reason: String },

    /// Commit content does not fit the commit header grammar.
    #[error("malformed commit {id}: {reason}")]
    MalformedCommit { id: ObjectId, reason: String },

    /// A typed parser was handed an object of another kind.
    #[error("object {id} is a {actual}, expected {expected}")]
    KindMismatch {
        id: ObjectId,
        expected: &'static str,
        actual: String,
    },

    /// A file in the object directory does not name an object.
    #[error("not an object path: {}", .0.display())]
    InvalidObjectPath(PathBuf),

    /// Directory traversal failed below the object root.
    #[error("cannot walk {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
