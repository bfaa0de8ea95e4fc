//! Ref layer for dagit.
//!
//! Reads the pointers that sit on top of the object graph: HEAD (symbolic or
//! detached) and the branches under `refs/heads/`, including those that
//! only exist in `packed-refs`. Tags and remote-tracking refs are not read.

pub mod error;
pub mod names;
pub mod resolve;
pub mod types;

pub use error::{RefError, Result};
pub use resolve::{list_branches, parse_head, read_head};
pub use types::{Branch, Head, HEADS_PREFIX};
