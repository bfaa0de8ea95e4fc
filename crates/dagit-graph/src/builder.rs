//! Snapshot construction.
//!
//! Each object's node and outgoing edges depend only on that object and the
//! read-only [`Linkage`], so objects are processed on the worker pool with no
//! shared mutable state. Contributions are merged afterwards and sorted, which
//! makes the output deterministic regardless of scheduling.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use dagit_refs::Head;
use dagit_repo::{commits_by_time_in, Repository};
use dagit_store::{pool, Object, ObjectKind, Parsed};

use crate::error::GraphResult;
use crate::linkage::Linkage;
use crate::node::{GraphDocument, GraphEdge, GraphNode, HEAD_NODE, REF_TYPE};

/// One object's node and outgoing edges.
struct Contribution {
    node: GraphNode,
    edges: Vec<GraphEdge>,
}

/// Build the graph document for the repository's current object map.
///
/// Malformed objects get a node with `warnings` and no edges. References to
/// ids absent from the store still produce edges. Only failures reading
/// HEAD or the branch list abort the snapshot.
pub fn snapshot(repo: &Repository) -> GraphResult<GraphDocument> {
    let started = Instant::now();
    // One map for the whole snapshot, even if a refresh swaps it meanwhile.
    let objects = repo.objects();
    let commits = commits_by_time_in(&objects);
    let linkage = Linkage::build(&objects, &commits);

    let mut items: Vec<Arc<Object>> = objects.values().cloned().collect();
    items.sort_by(|a, b| a.id.cmp(&b.id));

    let results = pool::run(items, repo.config().effective_workers(), |obj| {
        contribution(&obj, &linkage)
    });

    // Keyed by name; a duplicate name would overwrite, which distinct ids rule out.
    let mut object_nodes: BTreeMap<String, GraphNode> = BTreeMap::new();
    let mut edges: Vec<GraphEdge> = Vec::new();
    for result in results {
        let Contribution { node, edges: out } = result?;
        edges.extend(out);
        object_nodes.insert(node.name.clone(), node);
    }

    let mut nodes: Vec<GraphNode> = object_nodes.into_values().collect();
    let branches = repo.branches()?;
    let head = repo.head()?;

    let mut head_node = GraphNode::new(HEAD_NODE, REF_TYPE, serde_json::to_value(&head)?);
    match &head {
        Head::Detached(id) => edges.push(GraphEdge::new(HEAD_NODE, id.to_hex())),
        Head::Symbolic(path) => {
            let target = head.target_name();
            if branches.iter().any(|b| b.name == target) {
                edges.push(GraphEdge::new(HEAD_NODE, target));
            } else {
                warn!(head = %path, "HEAD names a branch that does not exist");
                head_node.warnings.push(format!("HEAD points at missing ref {path}"));
            }
        }
    }
    nodes.push(head_node);

    for branch in &branches {
        nodes.push(GraphNode::new(
            branch.name.clone(),
            REF_TYPE,
            serde_json::to_value(branch)?,
        ));
        edges.push(GraphEdge::new(branch.name.clone(), branch.commit_id.to_hex()));
    }

    edges.sort();
    let doc = GraphDocument { nodes, edges };

    let dangling = doc.dangling().len();
    if dangling > 0 {
        debug!(dangling, "snapshot has edges to missing objects");
    }
    info!(
        nodes = doc.nodes.len(),
        edges = doc.edges.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "built graph snapshot"
    );
    Ok(doc)
}

/// The `object` field of a node for a parsed object.
pub fn payload(parsed: &Parsed) -> GraphResult<Value> {
    Ok(match parsed {
        Parsed::Commit(commit) => serde_json::to_value(commit)?,
        Parsed::Tree(entries) => json!({ "entries": entries }),
        Parsed::Blob(blob) => serde_json::to_value(blob)?,
        Parsed::Other => json!({}),
    })
}

fn contribution(obj: &Object, linkage: &Linkage) -> GraphResult<Contribution> {
    let name = obj.id.to_hex();
    let mut node = GraphNode::new(name.clone(), obj.kind.as_str(), json!({}));
    let mut edges = Vec::new();

    if let Some(reason) = &obj.header_error {
        node.warnings.push(format!("unreadable header: {reason}"));
    }
    if let Some((declared, actual)) = obj.size_mismatch() {
        node.warnings.push(format!(
            "size mismatch: header declares {declared}, content is {actual} bytes"
        ));
    }

    // Linkage fields are present on every tree and blob node, parsed or not.
    match obj.kind {
        ObjectKind::Tree => {
            let owner = linkage.tree_owner(&obj.id);
            node.commit = Some(owner.map(|c| c.to_hex()).unwrap_or_default());
        }
        ObjectKind::Blob => {
            let first = linkage.first_commit(&obj.id);
            node.first_commit_ref = Some(first.map(|c| c.to_hex()).unwrap_or_default());
        }
        _ => {}
    }

    match obj.parse() {
        Ok(parsed) => {
            match &parsed {
                Parsed::Commit(commit) => {
                    for parent in &commit.parent_ids {
                        edges.push(GraphEdge::new(name.clone(), parent.to_hex()));
                    }
                    edges.push(GraphEdge::new(name.clone(), commit.tree_id.to_hex()));
                }
                Parsed::Tree(entries) => {
                    for entry in entries {
                        edges.push(GraphEdge::new(name.clone(), entry.child_id.to_hex()));
                    }
                }
                Parsed::Blob(_) | Parsed::Other => {}
            }
            node.object = payload(&parsed)?;
        }
        Err(err) => {
            warn!(id = %obj.id, error = %err, "malformed object in snapshot");
            node.warnings.push(err.to_string());
        }
    }

    Ok(Contribution { node, edges })
}
