//! Foundation types for dagit.
//!
//! dagit reads the on-disk object store of a git repository and re-presents
//! it as a graph. Every other dagit crate depends on `dagit-types` for the
//! identifier that names objects across loose files, pack archives, and refs.
//!
//! # Key Types
//!
//! - [`ObjectId`]: 20-byte content address, rendered as 40 lowercase hex digits

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, OBJECT_ID_HEX_LEN, OBJECT_ID_LEN};
