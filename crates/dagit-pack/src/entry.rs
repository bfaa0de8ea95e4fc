use dagit_store::ObjectKind;
use dagit_types::{ObjectId, OBJECT_ID_LEN};

use crate::error::{PackError, PackResult};

/// Pack signature bytes.
pub const PACK_MAGIC: &[u8; 4] = b"PACK";

/// Signature, version and object count.
pub const PACK_HEADER_LEN: usize = 12;

/// Longest OFS_DELTA base distance encoding accepted.
const MAX_OFS_BYTES: usize = 10;

/// Type code stored in bits 4-6 of an entry's first byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PackObjectType {
    Commit = 1,
    Tree = 2,
    Blob = 3,
    Tag = 4,
    OfsDelta = 6,
    RefDelta = 7,
}

impl PackObjectType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Commit),
            2 => Some(Self::Tree),
            3 => Some(Self::Blob),
            4 => Some(Self::Tag),
            6 => Some(Self::OfsDelta),
            7 => Some(Self::RefDelta),
            _ => None,
        }
    }

    /// Object kind for non-delta types.
    pub fn object_kind(self) -> Option<ObjectKind> {
        match self {
            Self::Commit => Some(ObjectKind::Commit),
            Self::Tree => Some(ObjectKind::Tree),
            Self::Blob => Some(ObjectKind::Blob),
            Self::Tag => Some(ObjectKind::Other("tag".into())),
            Self::OfsDelta | Self::RefDelta => None,
        }
    }
}

/// What an entry's payload holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Complete object content.
    Base(ObjectKind),
    /// Delta against the entry at an earlier offset in the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta against an object named by id.
    RefDelta { base_id: ObjectId },
}

/// A parsed entry header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    pub kind: EntryKind,
    /// Inflated payload size (the delta size for delta entries).
    pub size: u64,
    /// Offset of the zlib stream.
    pub data_start: usize,
}

/// Parse the entry header at `offset`. `data_end` excludes the trailing
/// pack checksum.
pub fn parse_entry_header(bytes: &[u8], offset: u64, data_end: usize) -> PackResult<EntryHeader> {
    let corrupt = |reason: &str| PackError::CorruptEntry {
        offset,
        reason: reason.to_string(),
    };
    let start = usize::try_from(offset).map_err(|_| corrupt("offset out of range"))?;
    if start < PACK_HEADER_LEN || start >= data_end {
        return Err(corrupt("offset out of range"));
    }
    let byte_at = |pos: usize| -> PackResult<u8> {
        if pos < data_end {
            Ok(bytes[pos])
        } else {
            Err(corrupt("header truncated"))
        }
    };

    let mut pos = start;
    let first = byte_at(pos)?;
    pos += 1;

    let code = (first >> 4) & 0x07;
    let mut size = u64::from(first & 0x0f);
    let mut shift = 4u32;
    let mut byte = first;
    while byte & 0x80 != 0 {
        byte = byte_at(pos)?;
        pos += 1;
        if shift > 57 {
            return Err(corrupt("size varint too long"));
        }
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }

    let ty = PackObjectType::from_code(code)
        .ok_or_else(|| corrupt(&format!("unknown object type {code}")))?;

    let kind = match ty {
        PackObjectType::OfsDelta => {
            let mut c = byte_at(pos)?;
            pos += 1;
            let mut distance = u64::from(c & 0x7f);
            let mut read = 1;
            while c & 0x80 != 0 {
                if read >= MAX_OFS_BYTES {
                    return Err(corrupt("base offset too long"));
                }
                c = byte_at(pos)?;
                pos += 1;
                read += 1;
                distance = ((distance + 1) << 7) | u64::from(c & 0x7f);
            }
            if distance == 0 || distance > offset {
                return Err(corrupt("base offset points outside the pack"));
            }
            EntryKind::OfsDelta {
                base_offset: offset - distance,
            }
        }
        PackObjectType::RefDelta => {
            let raw = bytes
                .get(pos..pos + OBJECT_ID_LEN)
                .filter(|_| pos + OBJECT_ID_LEN <= data_end)
                .ok_or_else(|| corrupt("base id truncated"))?;
            pos += OBJECT_ID_LEN;
            let base_id = ObjectId::from_slice(raw).map_err(|e| corrupt(&e.to_string()))?;
            EntryKind::RefDelta { base_id }
        }
        base => match base.object_kind() {
            Some(kind) => EntryKind::Base(kind),
            None => return Err(corrupt("delta type without base")),
        },
    };

    Ok(EntryHeader {
        kind,
        size,
        data_start: pos,
    })
}

#[cfg(any(test, feature = "testing"))]
pub(crate) fn encode_entry_header(ty: PackObjectType, size: u64, out: &mut Vec<u8>) {
    let mut byte = ((ty as u8) << 4) | (size & 0x0f) as u8;
    let mut rest = size >> 4;
    while rest != 0 {
        out.push(byte | 0x80);
        byte = (rest & 0x7f) as u8;
        rest >>= 7;
    }
    out.push(byte);
}

#[cfg(any(test, feature = "testing"))]
pub(crate) fn encode_ofs_distance(mut distance: u64, out: &mut Vec<u8>) {
    let mut buf = vec![(distance & 0x7f) as u8];
    distance >>= 7;
    while distance != 0 {
        distance -= 1;
        buf.push(0x80 | (distance & 0x7f) as u8);
        distance >>= 7;
    }
    buf.reverse();
    out.extend_from_slice(&buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_prefix(entry: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; PACK_HEADER_LEN];
        bytes.extend_from_slice(entry);
        bytes
    }

    #[test]
    fn small_blob_header() {
        let mut entry = Vec::new();
        encode_entry_header(PackObjectType::Blob, 5, &mut entry);
        assert_eq!(entry, vec![0x35]);
        let bytes = with_prefix(&entry);
        let header = parse_entry_header(&bytes, 12, bytes.len()).unwrap();
        assert_eq!(header.kind, EntryKind::Base(ObjectKind::Blob));
        assert_eq!(header.size, 5);
        assert_eq!(header.data_start, 13);
    }

    #[test]
    fn multi_byte_size() {
        let mut entry = Vec::new();
        encode_entry_header(PackObjectType::Commit, 1_000_000, &mut entry);
        let bytes = with_prefix(&entry);
        let header = parse_entry_header(&bytes, 12, bytes.len()).unwrap();
        assert_eq!(header.size, 1_000_000);
        assert_eq!(header.kind, EntryKind::Base(ObjectKind::Commit));
    }

    #[test]
    fn tag_maps_to_other() {
        let mut entry = Vec::new();
        encode_entry_header(PackObjectType::Tag, 1, &mut entry);
        let bytes = with_prefix(&entry);
        let header = parse_entry_header(&bytes, 12, bytes.len()).unwrap();
        assert_eq!(header.kind, EntryKind::Base(ObjectKind::Other("tag".into())));
    }

    #[test]
    fn ofs_delta_distances() {
        for distance in [1u64, 127, 128, 300, 16_511, 1 << 20] {
            let offset = distance + 100;
            let mut bytes = vec![0u8; offset as usize];
            encode_entry_header(PackObjectType::OfsDelta, 3, &mut bytes);
            encode_ofs_distance(distance, &mut bytes);
            let header = parse_entry_header(&bytes, offset, bytes.len()).unwrap();
            assert_eq!(
                header.kind,
                EntryKind::OfsDelta {
                    base_offset: offset - distance
                },
                "distance {distance}"
            );
            assert_eq!(header.data_start, bytes.len());
        }
    }

    #[test]
    fn ref_delta_reads_base_id() {
        let mut entry = Vec::new();
        encode_entry_header(PackObjectType::RefDelta, 9, &mut entry);
        entry.extend_from_slice(&[0xab; 20]);
        let bytes = with_prefix(&entry);
        let header = parse_entry_header(&bytes, 12, bytes.len()).unwrap();
        assert_eq!(
            header.kind,
            EntryKind::RefDelta {
                base_id: ObjectId::from_raw([0xab; 20])
            }
        );
    }

    #[test]
    fn unknown_type_rejected() {
        let bytes = with_prefix(&[0x50]);
        assert!(parse_entry_header(&bytes, 12, bytes.len()).is_err());
    }

    #[test]
    fn offset_inside_header_rejected() {
        let bytes = with_prefix(&[0x35]);
        assert!(parse_entry_header(&bytes, 4, bytes.len()).is_err());
    }

    #[test]
    fn truncated_size_rejected() {
        let bytes = with_prefix(&[0xb5]);
        assert!(parse_entry_header(&bytes, 12, bytes.len()).is_err());
    }
}
