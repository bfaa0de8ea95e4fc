//! Pack writer for tests.
//!
//! Builds a `.pack`/`.idx` pair on disk from whole objects and deltas.
//! Ids are synthetic unless given explicitly.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;

use dagit_store::ObjectKind;
use dagit_types::ObjectId;

use crate::delta::encode_varint;
use crate::entry::{encode_entry_header, encode_ofs_distance, PackObjectType, PACK_MAGIC};
use crate::index::PackIndex;

enum Payload {
    Base(PackObjectType),
    Ofs(usize),
    Ref(ObjectId),
}

struct Entry {
    id: ObjectId,
    payload: Payload,
    data: Vec<u8>,
}

#[derive(Default)]
pub struct PackBuilder {
    entries: Vec<Entry>,
    corrupt_crc: Vec<usize>,
}

fn base_type(kind: &ObjectKind) -> PackObjectType {
    match kind {
        ObjectKind::Commit => PackObjectType::Commit,
        ObjectKind::Tree => PackObjectType::Tree,
        ObjectKind::Blob => PackObjectType::Blob,
        ObjectKind::Other(_) => PackObjectType::Tag,
    }
}

/// Delta that copies `base[..copy_len]` and then inserts `insert`.
pub fn blob_delta(base: &[u8], copy_len: usize, insert: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();
    encode_varint(base.len() as u64, &mut delta);
    encode_varint((copy_len + insert.len()) as u64, &mut delta);
    if copy_len > 0 {
        delta.push(0x80 | 0x10);
        delta.push(copy_len as u8);
    }
    for chunk in insert.chunks(0x7f) {
        delta.push(chunk.len() as u8);
        delta.extend_from_slice(chunk);
    }
    delta
}

impl PackBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            corrupt_crc: Vec::new(),
        }
    }

    fn next_id(&self) -> ObjectId {
        let n = self.entries.len() as u8 + 1;
        ObjectId::from_raw([n.wrapping_mul(41); 20])
    }

    fn push(&mut self, payload: Payload, data: &[u8]) -> ObjectId {
        let id = self.next_id();
        self.push_with_id(id, payload, data)
    }

    fn push_with_id(&mut self, id: ObjectId, payload: Payload, data: &[u8]) -> ObjectId {
        self.entries.push(Entry {
            id,
            payload,
            data: data.to_vec(),
        });
        id
    }

    pub fn add_base(&mut self, kind: ObjectKind, data: &[u8]) -> ObjectId {
        self.push(Payload::Base(base_type(&kind)), data)
    }

    /// Whole object stored under a caller-chosen id.
    pub fn add_base_with_id(&mut self, id: ObjectId, kind: ObjectKind, data: &[u8]) -> ObjectId {
        self.push_with_id(id, Payload::Base(base_type(&kind)), data)
    }

    /// Delta against the entry added at position `base`.
    pub fn add_ofs_delta(&mut self, base: usize, delta: &[u8]) -> ObjectId {
        self.push(Payload::Ofs(base), delta)
    }

    pub fn add_ref_delta(&mut self, base: ObjectId, delta: &[u8]) -> ObjectId {
        self.push(Payload::Ref(base), delta)
    }

    /// Record a wrong CRC for the entry at position `index`.
    pub fn corrupt_crc(&mut self, index: usize) {
        self.corrupt_crc.push(index);
    }

    /// Write `<name>.pack` and `<name>.idx` into `dir`, returning the pack path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_MAGIC);
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        let mut offsets = Vec::with_capacity(self.entries.len());
        let mut index_entries = Vec::with_capacity(self.entries.len());
        for (i, entry) in self.entries.iter().enumerate() {
            let offset = pack.len() as u64;
            offsets.push(offset);

            let mut bytes = Vec::new();
            let size = entry.data.len() as u64;
            match entry.payload {
                Payload::Base(ty) => encode_entry_header(ty, size, &mut bytes),
                Payload::Ofs(base) => {
                    encode_entry_header(PackObjectType::OfsDelta, size, &mut bytes);
                    encode_ofs_distance(offset - offsets[base], &mut bytes);
                }
                Payload::Ref(base) => {
                    encode_entry_header(PackObjectType::RefDelta, size, &mut bytes);
                    bytes.extend_from_slice(base.as_bytes());
                }
            }
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
            enc.write_all(&entry.data).expect("compress entry");
            bytes.extend_from_slice(&enc.finish().expect("finish entry"));

            let mut crc = crc32fast::hash(&bytes);
            if self.corrupt_crc.contains(&i) {
                crc ^= 0xffff_ffff;
            }
            index_entries.push((entry.id, crc, offset));
            pack.extend_from_slice(&bytes);
        }
        pack.extend_from_slice(&[0u8; 20]);

        let pack_path = dir.join(format!("{name}.pack"));
        std::fs::write(&pack_path, &pack).expect("write pack");
        let index = PackIndex::build(index_entries, [0u8; 20]);
        std::fs::write(dir.join(format!("{name}.idx")), index.to_bytes()).expect("write index");
        pack_path
    }
}
