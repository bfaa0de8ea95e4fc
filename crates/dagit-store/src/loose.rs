//! Object locator for the loose-object directory.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use dagit_types::{ObjectId, OBJECT_ID_HEX_LEN};

use crate::error::{StoreError, StoreResult};
use crate::object::Object;
use crate::scan::read_compressed_file;

/// File extension of pack archives.
pub const PACK_EXTENSION: &str = "pack";

/// A file found under the object directory that may hold objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Candidate {
    /// A single compressed object; its id is the fan-out directory name
    /// followed by the file name.
    Loose(PathBuf),
    /// A pack archive; its objects come from the pack reader.
    Pack(PathBuf),
}

/// Returns `true` if `name` is non-empty and made only of hex digits
/// (either case).
pub fn is_hex_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Recover a loose object's id from its path: parent directory name plus
/// file name, which together must spell a full 40-digit id.
pub fn loose_object_id(path: &Path) -> StoreResult<ObjectId> {
    let invalid = || StoreError::InvalidObjectPath(path.to_path_buf());

    let file = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
    let dir = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .ok_or_else(invalid)?;

    let hex = format!("{dir}{file}");
    if hex.len() != OBJECT_ID_HEX_LEN || !is_hex_name(&hex) {
        return Err(invalid());
    }
    ObjectId::from_hex(&hex).map_err(|_| invalid())
}

/// Lazily enumerate candidate files below `objects_dir`.
///
/// Every regular file with an all-hex name is a loose candidate. Files with
/// the pack extension become pack candidates when `include_packs` is set.
/// Anything else (`.idx`, `.keep`, `info/packs`, temp files) is ignored.
/// Traversal errors are yielded in place so the caller can skip them.
pub fn list_objects(
    objects_dir: &Path,
    include_packs: bool,
) -> impl Iterator<Item = StoreResult<Candidate>> {
    WalkDir::new(objects_dir)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    return Some(Err(StoreError::Walk {
                        path,
                        reason: err.to_string(),
                    }));
                }
            };
            if !entry.file_type().is_file() {
                return None;
            }

            let path = entry.into_path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if is_hex_name(name) {
                Some(Ok(Candidate::Loose(path)))
            } else if include_packs
                && path.extension().and_then(|e| e.to_str()) == Some(PACK_EXTENSION)
            {
                Some(Ok(Candidate::Pack(path)))
            } else {
                None
            }
        })
}

/// Read, inflate and decode one loose object.
///
/// A payload that inflates but has no readable header is kept as an
/// unparsed object rather than rejected; I/O and zlib failures are errors.
pub fn load_loose(path: &Path) -> StoreResult<Object> {
    let id = loose_object_id(path)?;
    let raw = read_compressed_file(path)?;

    match Object::decode(&raw, id, path) {
        Ok(obj) => {
            if let Some((declared, actual)) = obj.size_mismatch() {
                debug!(%id, %declared, actual, "size mismatch in object header");
            }
            Ok(obj)
        }
        Err(StoreError::Decode { reason, .. }) => {
            warn!(%id, path = %path.display(), %reason, "keeping undecodable object as unparsed");
            Ok(Object::unparsed(id, path, raw, reason))
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    const ID: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    fn write_loose(objects: &Path, hex: &str, raw: &[u8]) -> PathBuf {
        let dir = objects.join(&hex[..2]);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(&hex[2..]);
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(raw).unwrap();
        std::fs::write(&path, enc.finish().unwrap()).unwrap();
        path
    }

    #[test]
    fn hex_name_filter() {
        assert!(is_hex_name("abcdef0123"));
        assert!(is_hex_name("ABCDEF"));
        assert!(!is_hex_name(""));
        assert!(!is_hex_name("pack-1234.idx"));
        assert!(!is_hex_name("tmp_obj_xyz"));
    }

    #[test]
    fn id_from_path() {
        let path = Path::new("/repo/.git/objects/ce/013625030ba8dba906f756967f9e9ca394464a");
        assert_eq!(loose_object_id(path).unwrap().to_hex(), ID);
    }

    #[test]
    fn id_from_short_path_is_rejected() {
        let path = Path::new("/repo/.git/objects/ce/0136");
        assert!(matches!(
            loose_object_id(path),
            Err(StoreError::InvalidObjectPath(_))
        ));
    }

    #[test]
    fn lists_loose_and_pack_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path();
        let loose = write_loose(objects, ID, b"blob 5\0hello");
        std::fs::create_dir_all(objects.join("pack")).unwrap();
        std::fs::write(objects.join("pack/pack-abc.pack"), b"PACK").unwrap();
        std::fs::write(objects.join("pack/pack-abc.idx"), b"").unwrap();
        std::fs::create_dir_all(objects.join("info")).unwrap();
        std::fs::write(objects.join("info/packs"), b"").unwrap();

        let found: Vec<Candidate> = list_objects(objects, true).map(Result::unwrap).collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&Candidate::Loose(loose.clone())));
        assert!(found.contains(&Candidate::Pack(objects.join("pack/pack-abc.pack"))));

        let loose_only: Vec<Candidate> = list_objects(objects, false).map(Result::unwrap).collect();
        assert_eq!(loose_only, vec![Candidate::Loose(loose)]);
    }

    #[test]
    fn load_decodes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_loose(dir.path(), ID, b"blob 5\0hello");
        let obj = load_loose(&path).unwrap();
        assert_eq!(obj.id.to_hex(), ID);
        assert_eq!(obj.kind, ObjectKind::Blob);
        assert_eq!(obj.content, b"hello");
        assert_eq!(obj.source_path, path);
    }

    #[test]
    fn load_keeps_headerless_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_loose(dir.path(), ID, b"no header here");
        let obj = load_loose(&path).unwrap();
        assert_eq!(obj.kind, ObjectKind::Other("unknown".into()));
        assert!(obj.header_error.is_some());
    }

    #[test]
    fn load_reports_corrupt_stream() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("ce");
        std::fs::create_dir_all(&sub).unwrap();
        let path = sub.join(&ID[2..]);
        std::fs::write(&path, b"not zlib at all").unwrap();
        assert!(matches!(load_loose(&path), Err(StoreError::Inflate { .. })));
    }
}
