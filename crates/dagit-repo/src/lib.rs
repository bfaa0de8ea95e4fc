//! Repository aggregate for dagit.
//!
//! A [`Repository`] owns the complete object map of one git store and the
//! fingerprint used to decide when that map is stale. The intended loop is:
//!
//! 1. [`Repository::open`] scans the store once.
//! 2. [`Repository::changed`] is polled; it is cheap and reports each
//!    mutation of objects, refs or HEAD exactly once.
//! 3. [`Repository::refresh`] rescans and swaps the whole map.
//!    [`Repository::refresh_if_changed`] does both steps and retries a
//!    failed scan on its next call.
//!
//! There is no incremental update: a change anywhere means a full rescan.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod layout;
pub mod repository;
pub mod scan;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{FingerprintMode, RepoConfig};
pub use error::{RepoError, RepoResult};
pub use layout::StoreLayout;
pub use repository::{commits_by_time_in, RepoStats, Repository};
pub use scan::{ObjectMap, ScanReport};

// Re-export the types callers need alongside a repository.
pub use dagit_refs::{Branch, Head};
pub use dagit_store::{Commit, Object, ObjectKind, Parsed, TreeEntry};
pub use dagit_types::ObjectId;
