use serde::{Deserialize, Serialize};

use dagit_types::{ObjectId, OBJECT_ID_LEN};

use crate::error::{StoreError, StoreResult};
use crate::object::{Object, ObjectKind};
use crate::scan::{find_byte, NUL, SPACE};

/// Mode of a subdirectory entry.
pub const MODE_TREE: &str = "40000";

/// Mode of a submodule entry; its id names a commit in another repository.
pub const MODE_GITLINK: &str = "160000";

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Octal file mode as written on disk (`100644`, `40000`, ...).
    pub mode: String,
    /// Entry name (filename or directory name).
    pub name: String,
    /// Id of the referenced blob, tree, or (for submodules) commit.
    #[serde(rename = "hash")]
    pub child_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: impl Into<String>, name: impl Into<String>, child_id: ObjectId) -> Self {
        Self {
            mode: mode.into(),
            name: name.into(),
            child_id,
        }
    }

    /// Returns `true` if the entry is a subdirectory.
    pub fn is_tree(&self) -> bool {
        self.mode == MODE_TREE
    }

    /// Returns `true` if the entry is a submodule commit pointer.
    pub fn is_gitlink(&self) -> bool {
        self.mode == MODE_GITLINK
    }
}

/// Where the parser is within the current record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Mode,
    Name,
    Hash,
}

/// Parse a tree object's content into entries, preserving on-disk order.
///
/// Each record is `<mode> SP <name> NUL <20 raw id bytes>`. A record cut
/// short anywhere is reported as [`StoreError::MalformedTree`] instead of
/// being dropped.
pub fn parse_tree(obj: &Object) -> StoreResult<Vec<TreeEntry>> {
    if obj.kind != ObjectKind::Tree {
        return Err(StoreError::KindMismatch {
            id: obj.id,
            expected: "tree",
            actual: obj.kind.to_string(),
        });
    }
    parse_tree_content(&obj.id, &obj.content)
}

/// Parse raw tree content. `id` only labels errors.
pub fn parse_tree_content(id: &ObjectId, content: &[u8]) -> StoreResult<Vec<TreeEntry>> {
    let malformed = |reason: String| StoreError::MalformedTree { id: *id, reason };

    let mut entries = Vec::new();
    let mut field = Field::Mode;
    let mut pos = 0usize;
    let mut mode = String::new();
    let mut name = String::new();

    while pos < content.len() {
        match field {
            Field::Mode => {
                let end = find_byte(SPACE, pos, content)
                    .ok_or_else(|| malformed(format!("unterminated mode at offset {pos}")))?;
                let raw = &content[pos..end];
                if raw.is_empty() || !raw.iter().all(|b| (b'0'..=b'7').contains(b)) {
                    return Err(malformed(format!("invalid mode at offset {pos}")));
                }
                mode = String::from_utf8_lossy(raw).into_owned();
                pos = end + 1;
                field = Field::Name;
            }
            Field::Name => {
                let end = find_byte(NUL, pos, content)
                    .ok_or_else(|| malformed(format!("unterminated name at offset {pos}")))?;
                name = String::from_utf8_lossy(&content[pos..end]).into_owned();
                pos = end + 1;
                field = Field::Hash;
            }
            Field::Hash => {
                let end = pos + OBJECT_ID_LEN;
                let raw = content.get(pos..end).ok_or_else(|| {
                    malformed(format!("truncated id for entry {name:?} at offset {pos}"))
                })?;
                let child_id = ObjectId::from_slice(raw).map_err(|e| malformed(e.to_string()))?;
                entries.push(TreeEntry {
                    mode: std::mem::take(&mut mode),
                    name: std::mem::take(&mut name),
                    child_id,
                });
                pos = end;
                field = Field::Mode;
            }
        }
    }

    // Content ending right after a NUL leaves a record waiting for its id.
    if field != Field::Mode {
        return Err(malformed(format!("trailing partial entry {name:?}")));
    }

    Ok(entries)
}

/// Encode entries in on-disk tree format, in the order given.
pub fn serialize_tree(entries: &[TreeEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        out.extend_from_slice(entry.mode.as_bytes());
        out.push(SPACE);
        out.extend_from_slice(entry.name.as_bytes());
        out.push(NUL);
        out.extend_from_slice(entry.child_id.as_bytes());
    }
    out
}
