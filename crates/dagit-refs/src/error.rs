//! Error types for reference operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading refs.
#[derive(Debug, Error)]
pub enum RefError {
    /// A ref file or directory could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HEAD is neither `ref: <path>` nor a commit id.
    #[error("unrecognised HEAD content: {content:?}")]
    InvalidHead { content: String },

    /// The branch name is invalid.
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// A branch file does not hold a commit id.
    #[error("branch {name} does not point at a commit id: {reason}")]
    InvalidTarget { name: String, reason: String },
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
