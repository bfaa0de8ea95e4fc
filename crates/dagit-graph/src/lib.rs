//! Graph snapshots of a git object store.
//!
//! [`snapshot`] turns a [`Repository`](dagit_repo::Repository) into a
//! [`GraphDocument`]: a node per object plus HEAD and each branch, and an
//! edge for every reference between them (commit to tree, commit to parent,
//! tree to entry, ref to commit). References to ids that are not in the
//! store still produce edges; [`GraphDocument::dangling`] lists them.

pub mod builder;
pub mod error;
pub mod linkage;
pub mod node;

pub use builder::{payload, snapshot};
pub use error::{GraphError, GraphResult};
pub use linkage::Linkage;
pub use node::{GraphDocument, GraphEdge, GraphNode, HEAD_NODE, REF_TYPE};
