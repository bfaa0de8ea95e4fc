//! Commit linkage for tree and blob nodes.
//!
//! A tree's owner is the earliest commit whose root tree it is. A blob's
//! first commit is the earliest commit whose tree contains it at any depth.
//! Both are computed once per snapshot by walking commits oldest first.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use dagit_repo::ObjectMap;
use dagit_store::{parse_tree, Commit, ObjectKind};
use dagit_types::ObjectId;

/// Read-only commit linkage shared by all workers of one snapshot.
#[derive(Clone, Debug, Default)]
pub struct Linkage {
    tree_owner: HashMap<ObjectId, ObjectId>,
    blob_intro: HashMap<ObjectId, ObjectId>,
}

impl Linkage {
    /// Build from the object map and `commits` sorted oldest first.
    ///
    /// A subtree reached by an earlier commit is not walked again: every
    /// blob below it already has an earlier first commit.
    pub fn build(objects: &ObjectMap, commits: &[(ObjectId, Commit)]) -> Self {
        let mut linkage = Self::default();
        let mut seen: HashSet<ObjectId> = HashSet::new();

        for (commit_id, commit) in commits {
            linkage.tree_owner.entry(commit.tree_id).or_insert(*commit_id);

            let mut stack = vec![commit.tree_id];
            while let Some(tree_id) = stack.pop() {
                if !seen.insert(tree_id) {
                    continue;
                }
                let Some(obj) = objects.get(&tree_id) else {
                    continue;
                };
                let entries = match parse_tree(obj) {
                    Ok(entries) => entries,
                    Err(err) => {
                        debug!(tree = %tree_id, error = %err, "not descending into tree");
                        continue;
                    }
                };
                for entry in entries {
                    match objects.get(&entry.child_id).map(|o| &o.kind) {
                        Some(ObjectKind::Tree) => stack.push(entry.child_id),
                        Some(ObjectKind::Blob) => {
                            linkage.blob_intro.entry(entry.child_id).or_insert(*commit_id);
                        }
                        _ => {}
                    }
                }
            }
        }

        debug!(
            owned_trees = linkage.tree_owner.len(),
            linked_blobs = linkage.blob_intro.len(),
            "built commit linkage"
        );
        linkage
    }

    /// Earliest commit whose root tree is `tree`.
    pub fn tree_owner(&self, tree: &ObjectId) -> Option<ObjectId> {
        self.tree_owner.get(tree).copied()
    }

    /// Earliest commit whose tree reaches `blob`.
    pub fn first_commit(&self, blob: &ObjectId) -> Option<ObjectId> {
        self.blob_intro.get(blob).copied()
    }
}
