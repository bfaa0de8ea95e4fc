use std::path::PathBuf;

use thiserror::Error;

use dagit_types::ObjectId;

use crate::delta::DeltaError;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("CRC32 mismatch for object {id}: index says {expected:08x}, entry hashes to {actual:08x}")]
    CrcMismatch {
        id: ObjectId,
        expected: u32,
        actual: u32,
    },

    #[error("decompression failed at offset {offset}: {reason}")]
    DecompressionFailed { offset: u64, reason: String },

    #[error("cannot apply delta at offset {offset}: {source}")]
    Delta {
        offset: u64,
        #[source]
        source: DeltaError,
    },

    #[error("delta base not found: {0}")]
    DeltaBaseNotFound(ObjectId),

    #[error("delta chain at offset {offset} is cyclic or deeper than {limit}")]
    DeltaChainTooDeep { offset: u64, limit: usize },
}

pub type PackResult<T> = Result<T, PackError>;
