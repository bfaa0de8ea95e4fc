//! Full scan of the object store into an [`ObjectMap`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use dagit_pack::PackReader;
use dagit_store::{list_objects, load_loose, pool, Candidate, Object, StoreError};
use dagit_types::ObjectId;

use crate::config::RepoConfig;
use crate::error::{RepoError, RepoResult};
use crate::layout::StoreLayout;

/// Every object in the store, keyed by id.
pub type ObjectMap = HashMap<ObjectId, Arc<Object>>;

/// Tallies from one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub loose: usize,
    pub packed: usize,
    pub packs: usize,
    pub skipped: usize,
}

/// Read every loose and (optionally) packed object below the store root.
///
/// Individual objects that cannot be read are logged and skipped. The scan
/// fails as a whole only when the object directory itself is unreadable,
/// in which case nothing is returned.
pub fn scan_objects(
    layout: &StoreLayout,
    config: &RepoConfig,
) -> RepoResult<(ObjectMap, ScanReport)> {
    let started = Instant::now();
    layout.ensure_readable()?;
    let objects_dir = layout.objects_dir();

    let mut loose_paths: Vec<PathBuf> = Vec::new();
    let mut pack_paths: Vec<PathBuf> = Vec::new();
    let mut report = ScanReport::default();

    for candidate in list_objects(&objects_dir, config.include_packs) {
        match candidate {
            Ok(Candidate::Loose(path)) => loose_paths.push(path),
            Ok(Candidate::Pack(path)) => pack_paths.push(path),
            Err(StoreError::Walk { path, reason }) if path == objects_dir => {
                return Err(RepoError::StoreUnavailable {
                    path,
                    source: std::io::Error::other(reason),
                });
            }
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry in object directory");
                report.skipped += 1;
            }
        }
    }

    let workers = config.effective_workers();
    let mut map = ObjectMap::with_capacity(loose_paths.len());

    let verify_crc = config.verify_pack_crc;
    let packed = pool::run(pack_paths, workers, |path| {
        PackReader::open(&path, verify_crc).map(|reader| reader.objects())
    });
    for result in packed {
        match result {
            Ok(entries) => {
                report.packs += 1;
                for entry in entries {
                    match entry {
                        Ok(obj) => {
                            report.packed += 1;
                            map.insert(obj.id, Arc::new(obj));
                        }
                        Err(err) => {
                            warn!(error = %err, "skipping packed object");
                            report.skipped += 1;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "skipping pack");
                report.skipped += 1;
            }
        }
    }

    // Loose copies win over packed ones with the same id.
    let loose = pool::run(loose_paths, workers, |path| load_loose(&path));
    for result in loose {
        match result {
            Ok(obj) => {
                report.loose += 1;
                map.insert(obj.id, Arc::new(obj));
            }
            Err(err) => {
                warn!(error = %err, "skipping loose object");
                report.skipped += 1;
            }
        }
    }

    debug!(?report, "scan tallies");
    info!(
        objects = map.len(),
        skipped = report.skipped,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scanned object store"
    );
    Ok((map, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixtureRepo;
    use dagit_pack::fixture::PackBuilder;
    use dagit_store::ObjectKind;

    #[test]
    fn scans_loose_objects() {
        let repo = FixtureRepo::new();
        let blob = repo.blob(b"hello\n");
        let tree = repo.tree(&[("100644", "hello.txt", blob)]);
        let layout = StoreLayout::discover(repo.path()).unwrap();

        let (map, report) = scan_objects(&layout, &RepoConfig::default()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(report.loose, 2);
        assert_eq!(map[&blob].kind, ObjectKind::Blob);
        assert_eq!(map[&tree].kind, ObjectKind::Tree);
    }

    #[test]
    fn corrupt_object_is_skipped() {
        let repo = FixtureRepo::new();
        let blob = repo.blob(b"ok");
        repo.write_corrupt("0123456789012345678901234567890123456789", b"\x00\x01garbage");
        let layout = StoreLayout::discover(repo.path()).unwrap();

        let (map, report) = scan_objects(&layout, &RepoConfig::default()).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&blob));
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn stray_files_are_ignored() {
        let repo = FixtureRepo::new();
        repo.blob(b"x");
        let objects = repo.git_dir().join("objects");
        std::fs::create_dir_all(objects.join("info")).unwrap();
        std::fs::write(objects.join("info/alternates"), b"").unwrap();
        std::fs::write(objects.join("tmp_obj_123"), b"").unwrap();
        let layout = StoreLayout::discover(repo.path()).unwrap();

        let (map, report) = scan_objects(&layout, &RepoConfig::default()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn single_worker_matches_parallel() {
        let repo = FixtureRepo::new();
        for i in 0..50 {
            repo.blob(format!("blob {i}").as_bytes());
        }
        let layout = StoreLayout::discover(repo.path()).unwrap();
        let serial = RepoConfig {
            workers: 1,
            ..RepoConfig::default()
        };
        let parallel = RepoConfig {
            workers: 8,
            ..RepoConfig::default()
        };
        let (a, _) = scan_objects(&layout, &serial).unwrap();
        let (b, _) = scan_objects(&layout, &parallel).unwrap();
        assert_eq!(a.len(), 50);
        assert_eq!(a, b);
    }

    #[test]
    fn packed_objects_merge_and_loose_copy_wins() {
        let repo = FixtureRepo::new();
        let shared = ObjectId::from_raw([0x5a; 20]);
        let mut builder = PackBuilder::new();
        let packed_only = builder.add_base(ObjectKind::Blob, b"only in pack");
        builder.add_base_with_id(shared, ObjectKind::Blob, b"packed copy");
        let pack_dir = repo.git_dir().join("objects/pack");
        std::fs::create_dir_all(&pack_dir).unwrap();
        let pack = builder.write(&pack_dir, "pack-mixed");

        let hex = shared.to_hex();
        repo.write_loose_bytes(&hex, b"blob 11\0loose copy!");
        let loose_path = repo.git_dir().join("objects").join(&hex[..2]).join(&hex[2..]);
        let layout = StoreLayout::discover(repo.path()).unwrap();

        let (map, report) = scan_objects(&layout, &RepoConfig::default()).unwrap();
        assert_eq!(
            report,
            ScanReport {
                loose: 1,
                packed: 2,
                packs: 1,
                skipped: 0
            }
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map[&shared].content, b"loose copy!");
        assert_eq!(map[&shared].source_path, loose_path);
        assert_eq!(map[&packed_only].content, b"only in pack");
        assert_eq!(map[&packed_only].source_path, pack);
    }

    #[test]
    fn broken_pack_is_skipped() {
        let repo = FixtureRepo::new();
        repo.blob(b"loose");
        let pack_dir = repo.git_dir().join("objects/pack");
        std::fs::create_dir_all(&pack_dir).unwrap();
        std::fs::write(pack_dir.join("pack-1.pack"), b"PACK").unwrap();
        let layout = StoreLayout::discover(repo.path()).unwrap();

        let (map, report) = scan_objects(&layout, &RepoConfig::default()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(report.skipped, 1);

        let no_packs = RepoConfig {
            include_packs: false,
            ..RepoConfig::default()
        };
        let (_, report) = scan_objects(&layout, &no_packs).unwrap();
        assert_eq!(report.skipped, 0);
    }
}
