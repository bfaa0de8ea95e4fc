use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use dagit_refs::{Branch, Head};
use dagit_store::{parse_commit, Commit, Object, ObjectKind};
use dagit_types::ObjectId;

use crate::config::RepoConfig;
use crate::error::{RepoError, RepoResult};
use crate::fingerprint::fingerprint;
use crate::layout::StoreLayout;
use crate::scan::{scan_objects, ObjectMap};

/// Object counts by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepoStats {
    pub blobs: usize,
    pub trees: usize,
    pub commits: usize,
    pub other: usize,
    pub total: usize,
}

/// An opened repository: the full object map plus two fingerprints.
///
/// `observed` is what [`Repository::changed`] last reported against.
/// `scanned` is the store state behind the current map and only moves when
/// a scan succeeds, so a failed refresh is retried on the next poll.
///
/// The map is replaced wholesale by [`Repository::refresh`]; readers hold an
/// `Arc` to the map they started with and never see a half-built one.
pub struct Repository {
    layout: StoreLayout,
    config: RepoConfig,
    objects: RwLock<Arc<ObjectMap>>,
    observed: Mutex<String>,
    scanned: Mutex<String>,
}

impl Repository {
    /// Open with default configuration.
    pub fn open(location: &Path) -> RepoResult<Self> {
        Self::open_with_config(location, RepoConfig::default())
    }

    /// Discover the store, take the initial fingerprint, and scan it.
    pub fn open_with_config(location: &Path, config: RepoConfig) -> RepoResult<Self> {
        let layout = StoreLayout::discover(location)?;
        // Fingerprint before scanning so a write that races the scan shows
        // up as a change on the next poll.
        let initial = fingerprint(&layout, config.fingerprint)?;
        let (objects, _) = scan_objects(&layout, &config)?;
        info!(root = %layout.root.display(), objects = objects.len(), "opened repository");

        Ok(Self {
            layout,
            config,
            objects: RwLock::new(Arc::new(objects)),
            observed: Mutex::new(initial.clone()),
            scanned: Mutex::new(initial),
        })
    }

    pub fn location(&self) -> &Path {
        &self.layout.location
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    // ---- Object map ----

    /// Rescan the store and swap in the new map. On failure the previous
    /// map stays in place.
    pub fn refresh(&self) -> RepoResult<()> {
        let mut scanned = self.scanned.lock().unwrap_or_else(PoisonError::into_inner);
        let current = fingerprint(&self.layout, self.config.fingerprint)?;
        self.rescan(&mut scanned, current)
    }

    /// Scan, swap the map, then record `current` as the scanned state.
    /// Nothing is recorded when the scan fails.
    fn rescan(&self, scanned: &mut String, current: String) -> RepoResult<()> {
        let started = Instant::now();
        let (objects, report) = scan_objects(&self.layout, &self.config)?;
        let count = objects.len();
        *self.objects.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(objects);
        *scanned = current;
        info!(
            objects = count,
            skipped = report.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refreshed repository"
        );
        Ok(())
    }

    /// Shared handle to the current object map.
    pub fn objects(&self) -> Arc<ObjectMap> {
        Arc::clone(&self.objects.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn lookup(&self, id: &ObjectId) -> RepoResult<Arc<Object>> {
        self.objects()
            .get(id)
            .cloned()
            .ok_or(RepoError::ObjectNotFound(*id))
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects().contains_key(id)
    }

    pub fn stats(&self) -> RepoStats {
        let objects = self.objects();
        let mut stats = RepoStats {
            total: objects.len(),
            ..RepoStats::default()
        };
        for obj in objects.values() {
            match obj.kind {
                ObjectKind::Blob => stats.blobs += 1,
                ObjectKind::Tree => stats.trees += 1,
                ObjectKind::Commit => stats.commits += 1,
                ObjectKind::Other(_) => stats.other += 1,
            }
        }
        stats
    }

    /// [`commits_by_time_in`] over the current map.
    pub fn commits_by_time(&self) -> Vec<(ObjectId, Commit)> {
        commits_by_time_in(&self.objects())
    }

    // ---- Change detection ----

    /// Recompute the fingerprint and report whether it moved since the last
    /// call (or since `open`). The stored fingerprint is updated under the
    /// same lock, so one mutation is reported exactly once.
    pub fn changed(&self) -> RepoResult<bool> {
        let mut stored = self.observed.lock().unwrap_or_else(PoisonError::into_inner);
        let current = fingerprint(&self.layout, self.config.fingerprint)?;
        if *stored == current {
            return Ok(false);
        }
        debug!(old = %stored, new = %current, "store fingerprint changed");
        *stored = current;
        Ok(true)
    }

    /// Rescan when the store differs from the state behind the current map.
    /// Returns whether a refresh happened.
    ///
    /// This compares against the last successful scan, not against
    /// [`Repository::changed`]: after a failed refresh the next call tries
    /// again.
    pub fn refresh_if_changed(&self) -> RepoResult<bool> {
        let mut scanned = self.scanned.lock().unwrap_or_else(PoisonError::into_inner);
        let current = fingerprint(&self.layout, self.config.fingerprint)?;
        if *scanned == current {
            return Ok(false);
        }
        debug!(old = scanned.as_str(), new = current.as_str(), "store moved since last scan");
        self.rescan(&mut scanned, current)?;
        Ok(true)
    }

    // ---- Refs ----

    pub fn head(&self) -> RepoResult<Head> {
        Ok(dagit_refs::read_head(&self.layout.root)?)
    }

    pub fn branches(&self) -> RepoResult<Vec<Branch>> {
        Ok(dagit_refs::list_branches(&self.layout.root)?)
    }

    /// Commit id HEAD resolves to, through its branch when symbolic.
    /// `None` when the branch does not exist.
    pub fn head_commit_id(&self) -> RepoResult<Option<ObjectId>> {
        let head = self.head()?;
        Ok(match head {
            Head::Detached(id) => Some(id),
            Head::Symbolic(_) => {
                let name = head.target_name();
                self.branches()?
                    .into_iter()
                    .find(|b| b.name == name)
                    .map(|b| b.commit_id)
            }
        })
    }

    /// The commit HEAD points at, or `None` if HEAD is dangling.
    pub fn current_commit(&self) -> RepoResult<Option<(ObjectId, Commit)>> {
        let Some(id) = self.head_commit_id()? else {
            warn!("HEAD does not resolve to a branch");
            return Ok(None);
        };
        let Some(obj) = self.objects().get(&id).cloned() else {
            warn!(%id, "HEAD points at a missing object");
            return Ok(None);
        };
        Ok(Some((id, parse_commit(&obj)?)))
    }
}

/// Every parseable commit in `objects`, oldest first by commit time; ties
/// are broken by id so the order is stable.
///
/// Takes the map explicitly so a caller can pair the result with the exact
/// map it already holds.
pub fn commits_by_time_in(objects: &ObjectMap) -> Vec<(ObjectId, Commit)> {
    let mut commits: Vec<(ObjectId, Commit)> = objects
        .values()
        .filter(|obj| obj.is_commit())
        .filter_map(|obj| match parse_commit(obj) {
            Ok(commit) => Some((obj.id, commit)),
            Err(err) => {
                debug!(error = %err, "leaving commit out of time order");
                None
            }
        })
        .collect();
    commits.sort_by(|a, b| a.1.commit_time.cmp(&b.1.commit_time).then(a.0.cmp(&b.0)));
    commits
}
