//! Loose-object reading for dagit.
//!
//! This crate knows how a git object store lays out its loose objects and
//! how to turn one of them into a typed [`Object`]:
//!
//! - [`scan`]: delimiter search and zlib inflation
//! - [`loose`]: walking `objects/` and loading a single loose file
//! - [`object`]: the `<type> <size>\0<content>` header decoder
//! - [`tree`], [`commit`], [`blob`]: typed content parsers
//! - [`pool`]: the bounded worker pool used for per-object fan-out
//!
//! Failures are scoped to one object. Whether a failed object is skipped or
//! aborts a scan is the caller's decision.

pub mod blob;
pub mod commit;
pub mod error;
pub mod loose;
pub mod object;
pub mod pool;
pub mod scan;
pub mod tree;

pub use blob::{parse_blob, Blob};
pub use commit::{parse_commit, Commit, Person};
pub use error::{StoreError, StoreResult};
pub use loose::{list_objects, load_loose, Candidate};
pub use object::{Object, ObjectKind, Parsed};
pub use scan::{find_byte, inflate};
pub use tree::{parse_tree, serialize_tree, TreeEntry};
