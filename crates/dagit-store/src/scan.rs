//! Low-level byte primitives: delimiter search and zlib inflation.

use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;

use crate::error::{StoreError, StoreResult};

/// ASCII space; terminates the type field of an object header.
pub const SPACE: u8 = b' ';

/// NUL byte; terminates the size field of an object header and tree names.
pub const NUL: u8 = 0;

/// Find the first occurrence of `target` at or after `start`.
///
/// Returns `None` when the buffer is exhausted, including when `start` lies
/// past the end. Callers treat `None` as a parse failure of the object being
/// read, never as a reason to panic: objects may be truncated by a writer
/// racing the scan.
pub fn find_byte(target: u8, start: usize, buf: &[u8]) -> Option<usize> {
    buf.get(start..)?
        .iter()
        .position(|&b| b == target)
        .map(|i| start + i)
}

/// Inflate a complete zlib stream into memory.
///
/// `path` only labels the error; the bytes are taken from `compressed`.
pub fn inflate(compressed: &[u8], path: &Path) -> StoreResult<Vec<u8>> {
    let mut out = Vec::with_capacity(compressed.len().saturating_mul(2));
    ZlibDecoder::new(compressed)
        .read_to_end(&mut out)
        .map_err(|e| StoreError::Inflate {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(out)
}

/// Read a loose object file and inflate it.
pub fn read_compressed_file(path: &Path) -> StoreResult<Vec<u8>> {
    let raw = std::fs::read(path).map_err(|source| StoreError::ObjectRead {
        path: path.to_path_buf(),
        source,
    })?;
    inflate(&raw, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn find_byte_returns_first_match() {
        let buf = b"blob 5\0hello\0";
        assert_eq!(find_byte(NUL, 0, buf), Some(6));
        assert_eq!(find_byte(SPACE, 0, buf), Some(4));
    }

    #[test]
    fn find_byte_honours_start_offset() {
        let buf = b"a a a";
        assert_eq!(find_byte(b'a', 1, buf), Some(2));
        assert_eq!(find_byte(b'a', 2, buf), Some(2));
    }

    #[test]
    fn find_byte_not_found() {
        assert_eq!(find_byte(NUL, 0, b"no terminator"), None);
        assert_eq!(find_byte(NUL, 0, b""), None);
    }

    #[test]
    fn find_byte_start_past_end() {
        assert_eq!(find_byte(b'x', 10, b"x"), None);
        assert_eq!(find_byte(b'x', 1, b"x"), None);
    }

    #[test]
    fn inflate_roundtrip() {
        let data = b"tree 0\0";
        let out = inflate(&deflate(data), Path::new("t")).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn inflate_truncated_stream() {
        let mut compressed = deflate(b"commit 100\0tree abc");
        compressed.truncate(compressed.len() / 2);
        let err = inflate(&compressed, Path::new("objects/ab/cd")).unwrap_err();
        assert!(matches!(err, StoreError::Inflate { .. }));
        assert!(err.to_string().contains("objects/ab/cd"));
    }

    #[test]
    fn inflate_garbage() {
        let err = inflate(b"definitely not zlib", Path::new("x")).unwrap_err();
        assert!(matches!(err, StoreError::Inflate { .. }));
    }

    #[test]
    fn read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_compressed_file(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, StoreError::ObjectRead { .. }));
    }

    proptest::proptest! {
        #[test]
        fn find_byte_finds_planted_target(
            prefix in proptest::collection::vec(1u8..=255, 0..64),
            suffix in proptest::collection::vec(proptest::num::u8::ANY, 0..64),
        ) {
            let mut buf = prefix.clone();
            buf.push(0);
            buf.extend_from_slice(&suffix);
            proptest::prop_assert_eq!(find_byte(0, 0, &buf), Some(prefix.len()));
        }
    }
}
