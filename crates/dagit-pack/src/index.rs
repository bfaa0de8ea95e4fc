use dagit_types::{ObjectId, OBJECT_ID_LEN};

use crate::error::{PackError, PackResult};

pub const IDX_MAGIC: [u8; 4] = [0xff, b't', b'O', b'c'];
pub const IDX_VERSION: u32 = 2;

/// Offsets with this bit set index into the 64-bit large-offset table.
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

const HEADER_LEN: usize = 8;
const FAN_OUT_LEN: usize = 256 * 4;

/// Parsed version-2 pack index.
///
/// Layout:
/// - magic and version
/// - fan-out table: 256 counts of objects whose first byte is <= index
/// - sorted object ids
/// - CRC32 of each packed entry (parallel to ids)
/// - 31-bit offsets, or large-offset table positions (parallel to ids)
/// - large-offset table
/// - pack checksum and index checksum
#[derive(Clone, Debug)]
pub struct PackIndex {
    pub fan_out: [u32; 256],
    pub object_ids: Vec<ObjectId>,
    pub crc32s: Vec<u32>,
    pub offsets: Vec<u64>,
    pub pack_checksum: [u8; OBJECT_ID_LEN],
}

fn be_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn be_u64(data: &[u8], pos: usize) -> u64 {
    (u64::from(be_u32(data, pos)) << 32) | u64::from(be_u32(data, pos + 4))
}

impl PackIndex {
    /// Parse an index file's bytes.
    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        if data.len() < HEADER_LEN + FAN_OUT_LEN + 2 * OBJECT_ID_LEN {
            return Err(PackError::IndexCorrupted("too short".into()));
        }
        if data[0..4] != IDX_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: "\\377tOc".into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let version = be_u32(data, 4);
        if version != IDX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let mut pos = HEADER_LEN;
        let mut fan_out = [0u32; 256];
        let mut previous = 0u32;
        for entry in &mut fan_out {
            *entry = be_u32(data, pos);
            if *entry < previous {
                return Err(PackError::IndexCorrupted("fan-out not monotonic".into()));
            }
            previous = *entry;
            pos += 4;
        }

        let count = fan_out[255] as usize;
        let needed = pos + count * (OBJECT_ID_LEN + 4 + 4) + 2 * OBJECT_ID_LEN;
        if data.len() < needed {
            return Err(PackError::IndexCorrupted("tables truncated".into()));
        }

        let mut object_ids = Vec::with_capacity(count);
        for _ in 0..count {
            let id = ObjectId::from_slice(&data[pos..pos + OBJECT_ID_LEN])
                .map_err(|e| PackError::IndexCorrupted(e.to_string()))?;
            object_ids.push(id);
            pos += OBJECT_ID_LEN;
        }
        if object_ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PackError::IndexCorrupted("object ids not sorted".into()));
        }

        let crc32s = (0..count).map(|i| be_u32(data, pos + i * 4)).collect();
        pos += count * 4;

        let small: Vec<u32> = (0..count).map(|i| be_u32(data, pos + i * 4)).collect();
        pos += count * 4;

        let large_start = pos;
        let large_count = small.iter().filter(|o| *o & LARGE_OFFSET_FLAG != 0).count();
        let trailer = data.len() - 2 * OBJECT_ID_LEN;
        let mut offsets = Vec::with_capacity(count);
        for raw in small {
            if raw & LARGE_OFFSET_FLAG == 0 {
                offsets.push(u64::from(raw));
                continue;
            }
            let slot = (raw & !LARGE_OFFSET_FLAG) as usize;
            let at = large_start + slot * 8;
            if slot >= large_count || at + 8 > trailer {
                return Err(PackError::IndexCorrupted(format!(
                    "large offset slot {slot} out of range"
                )));
            }
            offsets.push(be_u64(data, at));
        }

        let mut pack_checksum = [0u8; OBJECT_ID_LEN];
        pack_checksum.copy_from_slice(&data[trailer..trailer + OBJECT_ID_LEN]);

        Ok(Self {
            fan_out,
            object_ids,
            crc32s,
            offsets,
            pack_checksum,
        })
    }

    /// Look up an object's (offset, crc32) by id.
    pub fn lookup(&self, id: &ObjectId) -> Option<(u64, u32)> {
        let first = id.first_byte() as usize;
        let start = if first == 0 {
            0
        } else {
            self.fan_out[first - 1] as usize
        };
        let end = self.fan_out[first] as usize;

        let range = self.object_ids.get(start..end)?;
        let pos = range.binary_search(id).ok()?;
        Some((self.offsets[start + pos], self.crc32s[start + pos]))
    }

    pub fn object_count(&self) -> usize {
        self.object_ids.len()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.lookup(id).is_some()
    }

    /// `(offset, id, crc32)` for every entry, ordered by pack offset.
    pub fn entries_by_offset(&self) -> Vec<(u64, ObjectId, u32)> {
        let mut entries: Vec<_> = self
            .offsets
            .iter()
            .zip(&self.object_ids)
            .zip(&self.crc32s)
            .map(|((offset, id), crc)| (*offset, *id, *crc))
            .collect();
        entries.sort_unstable_by_key(|e| e.0);
        entries
    }
}

#[cfg(any(test, feature = "testing"))]
impl PackIndex {
    /// Build an index from (id, crc32, offset) entries.
    pub(crate) fn build(
        mut entries: Vec<(ObjectId, u32, u64)>,
        pack_checksum: [u8; OBJECT_ID_LEN],
    ) -> Self {
        entries.sort_by_key(|e| e.0);

        let mut fan_out = [0u32; 256];
        for (id, _, _) in &entries {
            for slot in &mut fan_out[id.first_byte() as usize..] {
                *slot += 1;
            }
        }

        Self {
            fan_out,
            object_ids: entries.iter().map(|e| e.0).collect(),
            crc32s: entries.iter().map(|e| e.1).collect(),
            offsets: entries.iter().map(|e| e.2).collect(),
            pack_checksum,
        }
    }

    /// Encode as a version-2 index. The index checksum is left zeroed.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&IDX_MAGIC);
        buf.extend_from_slice(&IDX_VERSION.to_be_bytes());
        for count in &self.fan_out {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for id in &self.object_ids {
            buf.extend_from_slice(id.as_bytes());
        }
        for crc in &self.crc32s {
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        let mut large = Vec::new();
        for &offset in &self.offsets {
            if offset < u64::from(LARGE_OFFSET_FLAG) {
                buf.extend_from_slice(&(offset as u32).to_be_bytes());
            } else {
                let slot = large.len() as u32 | LARGE_OFFSET_FLAG;
                buf.extend_from_slice(&slot.to_be_bytes());
                large.push(offset);
            }
        }
        for offset in large {
            buf.extend_from_slice(&offset.to_be_bytes());
        }
        buf.extend_from_slice(&self.pack_checksum);
        buf.extend_from_slice(&[0u8; OBJECT_ID_LEN]);
        buf
    }
}
