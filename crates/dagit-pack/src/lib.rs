//! Pack-archive reading for dagit.
//!
//! A pack is a `.pack` file of zlib-compressed entries plus an `.idx`
//! companion that maps object ids to entry offsets. Entries are either
//! whole objects or deltas against another entry, addressed by pack offset
//! (`OFS_DELTA`) or by id (`REF_DELTA`).
//!
//! - [`PackIndex`]: version-2 index parsing and id lookup
//! - [`PackReader`]: memory-mapped pack access, CRC checks and delta
//!   resolution, yielding ready-made [`dagit_store::Object`]s
//!
//! Only pack version 2/3 with version-2 indexes and 20-byte ids is handled.

pub mod delta;
pub mod entry;
pub mod error;
pub mod index;
pub mod reader;

#[cfg(any(test, feature = "testing"))]
pub mod fixture;

pub use delta::{apply_delta, DeltaError};
pub use entry::{EntryHeader, EntryKind, PackObjectType};
pub use error::{PackError, PackResult};
pub use index::PackIndex;
pub use reader::{PackReader, MAX_DELTA_DEPTH};
