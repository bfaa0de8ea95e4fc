use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use memmap2::Mmap;
use tracing::{debug, warn};

use dagit_store::{Object, ObjectKind};
use dagit_types::{ObjectId, OBJECT_ID_LEN};

use crate::delta::apply_delta;
use crate::entry::{parse_entry_header, EntryHeader, EntryKind, PACK_HEADER_LEN, PACK_MAGIC};
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;

/// Longest delta chain followed before giving up on an entry.
pub const MAX_DELTA_DEPTH: usize = 4096;

/// A fully reconstructed entry.
#[derive(Clone, Debug)]
struct Resolved {
    kind: ObjectKind,
    data: Vec<u8>,
}

/// Reads every object from a pack archive using its `.idx` companion.
#[derive(Debug)]
pub struct PackReader {
    path: PathBuf,
    map: Mmap,
    index: PackIndex,
    verify_crc: bool,
    data_end: usize,
}

impl PackReader {
    /// Open `<name>.pack` and `<name>.idx` side by side.
    pub fn open(pack_path: &Path, verify_crc: bool) -> PackResult<Self> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| PackError::Io { path, source }
        };

        let index_path = pack_path.with_extension("idx");
        let index_data = std::fs::read(&index_path).map_err(io_err(&index_path))?;
        let index = PackIndex::from_bytes(&index_data)?;

        let file = File::open(pack_path).map_err(io_err(pack_path))?;
        // SAFETY: pack files are never rewritten in place; a repack writes a
        // new file and unlinks the old one, which leaves this mapping valid.
        let map = unsafe { Mmap::map(&file) }.map_err(io_err(pack_path))?;

        if map.len() < PACK_HEADER_LEN + OBJECT_ID_LEN {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }
        if &map[0..4] != PACK_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: "PACK".into(),
                actual: String::from_utf8_lossy(&map[0..4]).into(),
            });
        }
        let version = u32::from_be_bytes([map[4], map[5], map[6], map[7]]);
        if version != 2 && version != 3 {
            return Err(PackError::UnsupportedVersion(version));
        }
        let count = u32::from_be_bytes([map[8], map[9], map[10], map[11]]) as usize;
        if count != index.object_count() {
            return Err(PackError::IndexCorrupted(format!(
                "pack holds {count} objects, index lists {}",
                index.object_count()
            )));
        }

        let data_end = map.len() - OBJECT_ID_LEN;
        debug!(path = %pack_path.display(), objects = count, version, "opened pack");
        Ok(Self {
            path: pack_path.to_path_buf(),
            map,
            index,
            verify_crc,
            data_end,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn object_count(&self) -> usize {
        self.index.object_count()
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains(id)
    }

    /// Reconstruct every object in the pack, in offset order.
    ///
    /// A failure (bad CRC, corrupt stream, missing delta base) affects only
    /// the entry it occurs in, and any delta built on top of it.
    pub fn objects(&self) -> Vec<PackResult<Object>> {
        let entries = self.index.entries_by_offset();
        let mut cache: HashMap<u64, Resolved> = HashMap::with_capacity(entries.len());
        let mut out = Vec::with_capacity(entries.len());

        for (i, &(offset, id, crc)) in entries.iter().enumerate() {
            if self.verify_crc {
                let end = entries
                    .get(i + 1)
                    .map(|next| next.0 as usize)
                    .unwrap_or(self.data_end);
                if let Err(err) = self.check_crc(offset, end, id, crc) {
                    warn!(%id, offset, error = %err, "skipping packed object");
                    out.push(Err(err));
                    continue;
                }
            }
            let result = self
                .resolve(offset, &mut cache)
                .map(|r| Object::new(r.kind, id, self.path.clone(), r.data));
            out.push(result);
        }
        out
    }

    /// Read one object by id.
    pub fn read_object(&self, id: &ObjectId) -> PackResult<Option<Object>> {
        let Some((offset, _)) = self.index.lookup(id) else {
            return Ok(None);
        };
        let mut cache = HashMap::new();
        let resolved = self.resolve(offset, &mut cache)?;
        Ok(Some(Object::new(resolved.kind, *id, self.path.clone(), resolved.data)))
    }

    fn check_crc(&self, offset: u64, end: usize, id: ObjectId, expected: u32) -> PackResult<()> {
        let bytes = usize::try_from(offset)
            .ok()
            .and_then(|start| self.map.get(start..end.min(self.data_end)))
            .ok_or_else(|| PackError::CorruptEntry {
                offset,
                reason: "entry extends past pack data".into(),
            })?;
        let actual = crc32fast::hash(bytes);
        if actual != expected {
            return Err(PackError::CrcMismatch {
                id,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn header(&self, offset: u64) -> PackResult<EntryHeader> {
        parse_entry_header(&self.map, offset, self.data_end)
    }

    fn inflate_entry(&self, offset: u64, header: &EntryHeader) -> PackResult<Vec<u8>> {
        let input = &self.map[header.data_start..self.data_end];
        let mut out = Vec::with_capacity((header.size as usize).min(1 << 20));
        ZlibDecoder::new(input)
            .read_to_end(&mut out)
            .map_err(|e| PackError::DecompressionFailed {
                offset,
                reason: e.to_string(),
            })?;
        if out.len() as u64 != header.size {
            return Err(PackError::CorruptEntry {
                offset,
                reason: format!("inflated to {} bytes, header says {}", out.len(), header.size),
            });
        }
        Ok(out)
    }

    /// Resolve the entry at `offset`, walking its delta chain down to a
    /// base (or to an already-resolved entry) and then applying deltas
    /// back up. Every entry on the chain is memoised in `cache`.
    fn resolve(&self, offset: u64, cache: &mut HashMap<u64, Resolved>) -> PackResult<Resolved> {
        if let Some(hit) = cache.get(&offset) {
            return Ok(hit.clone());
        }

        let mut chain: Vec<(u64, EntryHeader)> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = offset;

        let base = loop {
            if let Some(hit) = cache.get(&current) {
                break hit.clone();
            }
            if !seen.insert(current) || chain.len() >= MAX_DELTA_DEPTH {
                return Err(PackError::DeltaChainTooDeep {
                    offset,
                    limit: MAX_DELTA_DEPTH,
                });
            }
            let header = self.header(current)?;
            match header.kind.clone() {
                EntryKind::Base(kind) => {
                    let data = self.inflate_entry(current, &header)?;
                    let resolved = Resolved { kind, data };
                    cache.insert(current, resolved.clone());
                    break resolved;
                }
                EntryKind::OfsDelta { base_offset } => {
                    chain.push((current, header));
                    current = base_offset;
                }
                EntryKind::RefDelta { base_id } => {
                    let (base_offset, _) = self
                        .index
                        .lookup(&base_id)
                        .ok_or(PackError::DeltaBaseNotFound(base_id))?;
                    chain.push((current, header));
                    current = base_offset;
                }
            }
        };

        let Resolved { kind, mut data } = base;
        for (delta_offset, header) in chain.into_iter().rev() {
            let delta = self.inflate_entry(delta_offset, &header)?;
            data = apply_delta(&data, &delta).map_err(|source| PackError::Delta {
                offset: delta_offset,
                source,
            })?;
            cache.insert(
                delta_offset,
                Resolved {
                    kind: kind.clone(),
                    data: data.clone(),
                },
            );
        }
        Ok(Resolved { kind, data })
    }
}
