use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::object::{Object, ObjectKind};

/// Blob content as exposed in graph payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    /// File content, decoded as UTF-8 with invalid sequences replaced.
    pub content: String,
    /// Length of the raw content in bytes.
    pub size: usize,
}

/// Expose a blob object's content. Binary content is carried lossily.
pub fn parse_blob(obj: &Object) -> StoreResult<Blob> {
    if obj.kind != ObjectKind::Blob {
        return Err(StoreError::KindMismatch {
            id: obj.id,
            expected: "blob",
            actual: obj.kind.to_string(),
        });
    }
    Ok(Blob {
        content: String::from_utf8_lossy(&obj.content).into_owned(),
        size: obj.content.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagit_types::ObjectId;

    #[test]
    fn text_blob() {
        let obj = Object::new(ObjectKind::Blob, ObjectId::null(), "b", b"hello\n".to_vec());
        let blob = parse_blob(&obj).unwrap();
        assert_eq!(blob.content, "hello\n");
        assert_eq!(blob.size, 6);
    }

    #[test]
    fn binary_blob_keeps_raw_size() {
        let obj = Object::new(ObjectKind::Blob, ObjectId::null(), "b", vec![0xff, 0xfe, b'a']);
        let blob = parse_blob(&obj).unwrap();
        assert_eq!(blob.size, 3);
        assert!(blob.content.ends_with('a'));
    }

    #[test]
    fn rejects_tree() {
        let obj = Object::new(ObjectKind::Tree, ObjectId::null(), "t", Vec::new());
        assert!(parse_blob(&obj).is_err());
    }
}
