use std::path::{Path, PathBuf};

use crate::error::{RepoError, RepoResult};

/// Where the pieces of a git store live on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLayout {
    /// The location the repository was opened with.
    pub location: PathBuf,
    /// The git directory: `<location>/.git`, or `<location>` for a bare store.
    pub root: PathBuf,
}

impl StoreLayout {
    /// Resolve the store root for `location`.
    ///
    /// A working-tree repository has a `.git` directory; a bare store has
    /// `objects/` and `HEAD` directly under `location`.
    pub fn discover(location: &Path) -> RepoResult<Self> {
        let dotgit = location.join(".git");
        let root = if dotgit.is_dir() {
            dotgit
        } else if location.join("objects").is_dir() && location.join("HEAD").is_file() {
            location.to_path_buf()
        } else {
            return Err(RepoError::NotARepository(location.to_path_buf()));
        };
        Ok(Self {
            location: location.to_path_buf(),
            root,
        })
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    pub fn pack_dir(&self) -> PathBuf {
        self.objects_dir().join("pack")
    }

    pub fn head_file(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    pub fn heads_dir(&self) -> PathBuf {
        self.root.join("refs").join("heads")
    }

    /// Entries under the root that the change detector watches.
    pub fn watched_paths(&self) -> [PathBuf; 4] {
        [
            self.objects_dir(),
            self.root.join("refs"),
            self.head_file(),
            self.root.join("packed-refs"),
        ]
    }

    /// Fail with [`RepoError::StoreUnavailable`] unless the object directory
    /// can be listed.
    pub fn ensure_readable(&self) -> RepoResult<()> {
        let objects = self.objects_dir();
        std::fs::read_dir(&objects)
            .map(drop)
            .map_err(|source| RepoError::StoreUnavailable {
                path: objects,
                source,
            })
    }
}
