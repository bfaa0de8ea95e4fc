//! HEAD and branch values.

use serde::{Deserialize, Serialize};

use dagit_types::ObjectId;

/// Prefix of branch refs below the store root.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// The state of HEAD: either symbolic (pointing to a branch) or detached.
///
/// Serialises as `{"type": "ref", "value": "refs/heads/main"}` or
/// `{"type": "detached", "value": "<commit id>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Head {
    /// HEAD names a ref path such as `refs/heads/main`.
    #[serde(rename = "ref")]
    Symbolic(String),
    /// HEAD holds a commit id directly.
    #[serde(rename = "detached")]
    Detached(ObjectId),
}

impl Head {
    pub fn is_detached(&self) -> bool {
        matches!(self, Head::Detached(_))
    }

    /// Branch name HEAD points at, if it is symbolic and under `refs/heads/`.
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Head::Symbolic(path) => path.strip_prefix(HEADS_PREFIX),
            Head::Detached(_) => None,
        }
    }

    /// Where the HEAD edge of the graph points: the branch name for a
    /// symbolic HEAD, the commit id for a detached one.
    pub fn target_name(&self) -> String {
        match self {
            Head::Symbolic(path) => path
                .strip_prefix(HEADS_PREFIX)
                .unwrap_or(path)
                .to_string(),
            Head::Detached(id) => id.to_hex(),
        }
    }
}

/// A branch pointer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Name relative to `refs/heads/` (`main`, `feature/auth`).
    pub name: String,
    /// Commit at the tip of the branch.
    #[serde(rename = "commit")]
    pub commit_id: ObjectId,
}

impl Branch {
    /// Full ref path, e.g. `refs/heads/main`.
    pub fn ref_path(&self) -> String {
        format!("{HEADS_PREFIX}{}", self.name)
    }
}
