//! The snapshot document: nodes, edges, and its JSON form.
//!
//! Field names here are read by the visualisation front end and must not
//! change: `name`, `type`, `object`, `commit`, `firstCommitRef`,
//! `warnings`, `src`, `dest`.

use std::collections::HashSet;
use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::GraphResult;

/// Node type of HEAD and branch nodes.
pub const REF_TYPE: &str = "ref";

/// Name of the HEAD node.
pub const HEAD_NODE: &str = "HEAD";

/// A node in the snapshot: one object, HEAD, or one branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Object id in hex, `HEAD`, or a branch name.
    pub name: String,
    /// Object kind tag (`blob`, `tree`, `commit`, or another tag) or `ref`.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Parsed payload of the object or ref.
    pub object: Value,
    /// Trees only: the earliest commit whose root tree this is, or `""`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Blobs only: the earliest commit whose tree contains this blob, or `""`.
    #[serde(
        rename = "firstCommitRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub first_commit_ref: Option<String>,
    /// Problems found while reading the object. Omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl GraphNode {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>, object: Value) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            object,
            commit: None,
            first_commit_ref: None,
            warnings: Vec::new(),
        }
    }

    /// Returns `true` for HEAD and branch nodes.
    pub fn is_ref(&self) -> bool {
        self.node_type == REF_TYPE
    }
}

/// A directed reference from one node name to another.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub src: String,
    pub dest: String,
}

impl GraphEdge {
    pub fn new(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
        }
    }
}

/// A complete graph snapshot of one repository.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphDocument {
    /// Find a node by name.
    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Edges leaving `src`.
    pub fn edges_from(&self, src: &str) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.src == src).collect()
    }

    /// Nodes for store objects, excluding HEAD and branches.
    pub fn object_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| !n.is_ref())
    }

    /// Edges whose target names no node.
    pub fn dangling(&self) -> Vec<&GraphEdge> {
        let names: HashSet<&str> = self.nodes.iter().map(|n| n.name.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !names.contains(e.dest.as_str()))
            .collect()
    }

    /// Write the document as JSON indented by four spaces.
    pub fn write_pretty<W: Write>(&self, writer: W) -> GraphResult<()> {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut ser)?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> GraphResult<String> {
        let mut buf = Vec::new();
        self.write_pretty(&mut buf)?;
        // serde_json only ever writes UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
