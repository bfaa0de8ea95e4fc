//! Decoded objects and their header.
//!
//! An inflated object is `<type> SP <size> NUL <content>`. [`Object::decode`]
//! splits that header off, and [`Object::parse`] turns the content into the
//! typed [`Parsed`] view for its kind.

use std::path::{Path, PathBuf};

use dagit_types::ObjectId;

use crate::blob::{parse_blob, Blob};
use crate::commit::{parse_commit, Commit};
use crate::error::{StoreError, StoreResult};
use crate::scan::{find_byte, NUL, SPACE};
use crate::tree::{parse_tree, TreeEntry};

/// The kind of object stored.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory listing: ordered entries mapping names to object ids.
    Tree,
    /// Snapshot pointer with parents, author, committer and message.
    Commit,
    /// Any other type tag (annotated tags, or an unreadable header),
    /// passed through unparsed.
    Other(String),
}

impl ObjectKind {
    /// Match a header type tag. Matching is case-sensitive.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "blob" => Self::Blob,
            "tree" => Self::Tree,
            "commit" => Self::Commit,
            other => Self::Other(other.to_string()),
        }
    }

    /// The type tag as it appears in object headers and graph nodes.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Other(tag) => tag,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded object: kind tag, declared size, and the content after the header.
///
/// Objects are immutable once constructed. The repository owns them in its
/// object map; everything else borrows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
    /// The type of this object.
    pub kind: ObjectKind,
    /// Size field from the header, trimmed. Advisory only.
    pub declared_size: String,
    /// File the object was read from (loose file or pack archive).
    pub source_path: PathBuf,
    /// Content address.
    pub id: ObjectId,
    /// Bytes following the header.
    pub content: Vec<u8>,
    /// Set when the header could not be decoded and the object was kept
    /// as an unparsed `Other`.
    pub header_error: Option<String>,
}

impl Object {
    /// Build an object whose kind and content are already known, as the pack
    /// reader produces them.
    pub fn new(
        kind: ObjectKind,
        id: ObjectId,
        source_path: impl Into<PathBuf>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            kind,
            declared_size: content.len().to_string(),
            source_path: source_path.into(),
            id,
            content,
            header_error: None,
        }
    }

    /// Decode a raw inflated payload of the form `<type> SP <size> NUL <content>`.
    ///
    /// The type and size fields are trimmed of surrounding whitespace. The
    /// declared size is not checked against the content length here; see
    /// [`Object::size_mismatch`].
    pub fn decode(raw: &[u8], id: ObjectId, source_path: &Path) -> StoreResult<Self> {
        let space = find_byte(SPACE, 0, raw).ok_or_else(|| StoreError::Decode {
            id,
            reason: "no space after type field".into(),
        })?;
        let nul = find_byte(NUL, space + 1, raw).ok_or_else(|| StoreError::Decode {
            id,
            reason: "no NUL after size field".into(),
        })?;

        let tag = std::str::from_utf8(&raw[..space]).map_err(|_| StoreError::Decode {
            id,
            reason: "type field is not ASCII".into(),
        })?;
        let size = std::str::from_utf8(&raw[space..nul]).map_err(|_| StoreError::Decode {
            id,
            reason: "size field is not ASCII".into(),
        })?;

        Ok(Self {
            kind: ObjectKind::from_tag(tag.trim()),
            declared_size: size.trim().to_string(),
            source_path: source_path.to_path_buf(),
            id,
            content: raw[nul + 1..].to_vec(),
            header_error: None,
        })
    }

    /// Keep a payload whose header could not be decoded, tagged `Other`.
    pub fn unparsed(id: ObjectId, source_path: &Path, raw: Vec<u8>, reason: String) -> Self {
        Self {
            kind: ObjectKind::Other("unknown".into()),
            declared_size: raw.len().to_string(),
            source_path: source_path.to_path_buf(),
            id,
            content: raw,
            header_error: Some(reason),
        }
    }

    /// The declared size as a number, if it parses.
    pub fn declared_len(&self) -> Option<usize> {
        self.declared_size.parse().ok()
    }

    /// `(declared, actual)` when the header size disagrees with the content.
    pub fn size_mismatch(&self) -> Option<(String, usize)> {
        match self.declared_len() {
            Some(n) if n == self.content.len() => None,
            _ => Some((self.declared_size.clone(), self.content.len())),
        }
    }

    pub fn is_commit(&self) -> bool {
        self.kind == ObjectKind::Commit
    }

    pub fn is_tree(&self) -> bool {
        self.kind == ObjectKind::Tree
    }

    pub fn is_blob(&self) -> bool {
        self.kind == ObjectKind::Blob
    }

    /// Run the typed parser matching this object's kind.
    pub fn parse(&self) -> StoreResult<Parsed> {
        Ok(match self.kind {
            ObjectKind::Blob => Parsed::Blob(parse_blob(self)?),
            ObjectKind::Tree => Parsed::Tree(parse_tree(self)?),
            ObjectKind::Commit => Parsed::Commit(parse_commit(self)?),
            ObjectKind::Other(_) => Parsed::Other,
        })
    }
}

/// Structured form of an object's content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parsed {
    Blob(Blob),
    Tree(Vec<TreeEntry>),
    Commit(Commit),
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ObjectId {
        ObjectId::from_raw([7u8; 20])
    }

    #[test]
    fn decode_blob_header() {
        let obj = Object::decode(b"blob 5\0hello", id(), Path::new("objects/07/07")).unwrap();
        assert_eq!(obj.kind, ObjectKind::Blob);
        assert_eq!(obj.declared_size, "5");
        assert_eq!(obj.content, b"hello");
        assert!(obj.size_mismatch().is_none());
    }

    #[test]
    fn decode_empty_tree() {
        let obj = Object::decode(b"tree 0\0", id(), Path::new("t")).unwrap();
        assert_eq!(obj.kind, ObjectKind::Tree);
        assert!(obj.content.is_empty());
        assert_eq!(parse_tree(&obj).unwrap().len(), 0);
    }

    #[test]
    fn decode_unknown_type_is_other() {
        let obj = Object::decode(b"tag 3\0abc", id(), Path::new("t")).unwrap();
        assert_eq!(obj.kind, ObjectKind::Other("tag".into()));
        assert_eq!(obj.parse().unwrap(), Parsed::Other);
    }

    #[test]
    fn type_match_is_case_sensitive() {
        let obj = Object::decode(b"Blob 1\0x", id(), Path::new("t")).unwrap();
        assert_eq!(obj.kind, ObjectKind::Other("Blob".into()));
    }

    #[test]
    fn decode_missing_space() {
        let err = Object::decode(b"blob", id(), Path::new("t")).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn decode_missing_nul() {
        let err = Object::decode(b"blob 5hello", id(), Path::new("t")).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn size_mismatch_is_reported_not_fatal() {
        let obj = Object::decode(b"blob 9\0hello", id(), Path::new("t")).unwrap();
        assert_eq!(obj.size_mismatch(), Some(("9".to_string(), 5)));
    }

    #[test]
    fn unparsed_keeps_payload() {
        let obj = Object::unparsed(id(), Path::new("t"), b"garbage".to_vec(), "bad".into());
        assert_eq!(obj.kind.as_str(), "unknown");
        assert_eq!(obj.header_error.as_deref(), Some("bad"));
        assert_eq!(obj.content, b"garbage");
    }

    #[test]
    fn kind_display() {
        assert_eq!(ObjectKind::Blob.to_string(), "blob");
        assert_eq!(ObjectKind::Tree.to_string(), "tree");
        assert_eq!(ObjectKind::Commit.to_string(), "commit");
        assert_eq!(ObjectKind::Other("tag".into()).to_string(), "tag");
    }
}
