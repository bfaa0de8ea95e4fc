//! Fixture repositories written straight to disk.
//!
//! Ids are BLAKE3 digests of the encoded object truncated to 20 bytes. They
//! are not the SHA-1 ids git would assign, which nothing in dagit checks.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use tempfile::TempDir;

use dagit_types::{ObjectId, OBJECT_ID_LEN};

/// A throwaway working-tree repository with `HEAD -> refs/heads/main`.
pub struct FixtureRepo {
    dir: TempDir,
    git_dir: PathBuf,
}

impl Default for FixtureRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let git_dir = dir.path().join(".git");
        std::fs::create_dir_all(git_dir.join("objects")).expect("create objects dir");
        std::fs::create_dir_all(git_dir.join("refs/heads")).expect("create refs dir");
        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").expect("write HEAD");
        Self { dir, git_dir }
    }

    /// Working-tree location, as passed to `Repository::open`.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Write `<kind> <len>\0<content>` as a loose object.
    pub fn write_object(&self, kind: &str, content: &[u8]) -> ObjectId {
        let mut raw = format!("{kind} {}\0", content.len()).into_bytes();
        raw.extend_from_slice(content);
        let digest = blake3::hash(&raw);
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..OBJECT_ID_LEN]);
        let id = ObjectId::from_raw(bytes);
        self.write_loose_bytes(&id.to_hex(), &raw);
        id
    }

    /// Write an already-encoded payload under `hex`, compressing it.
    pub fn write_loose_bytes(&self, hex: &str, raw: &[u8]) {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(raw).expect("compress object");
        self.write_corrupt(hex, &enc.finish().expect("finish zlib stream"));
    }

    /// Write `bytes` verbatim (no compression) at the loose path for `hex`.
    pub fn write_corrupt(&self, hex: &str, bytes: &[u8]) {
        let dir = self.git_dir.join("objects").join(&hex[..2]);
        std::fs::create_dir_all(&dir).expect("create fan-out dir");
        std::fs::write(dir.join(&hex[2..]), bytes).expect("write object");
    }

    pub fn blob(&self, content: &[u8]) -> ObjectId {
        self.write_object("blob", content)
    }

    /// Write a tree from `(mode, name, id)` entries, in the order given.
    pub fn tree(&self, entries: &[(&str, &str, ObjectId)]) -> ObjectId {
        let mut content = Vec::new();
        for (mode, name, id) in entries {
            content.extend_from_slice(mode.as_bytes());
            content.push(b' ');
            content.extend_from_slice(name.as_bytes());
            content.push(0);
            content.extend_from_slice(id.as_bytes());
        }
        self.write_object("tree", &content)
    }

    /// Write a commit authored and committed at `time` (UTC).
    pub fn commit(
        &self,
        tree: ObjectId,
        parents: &[ObjectId],
        time: i64,
        message: &str,
    ) -> ObjectId {
        let mut text = format!("tree {tree}\n");
        for parent in parents {
            text.push_str(&format!("parent {parent}\n"));
        }
        text.push_str(&format!("author Test Author <author@example.com> {time} +0000\n"));
        text.push_str(&format!("committer Test Committer <committer@example.com> {time} +0000\n"));
        text.push('\n');
        text.push_str(message);
        text.push('\n');
        self.write_object("commit", text.as_bytes())
    }

    pub fn set_branch(&self, name: &str, commit: ObjectId) {
        let path = self.git_dir.join("refs/heads").join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create ref dir");
        }
        std::fs::write(path, format!("{commit}\n")).expect("write branch");
    }

    pub fn set_head_symbolic(&self, branch: &str) {
        std::fs::write(self.git_dir.join("HEAD"), format!("ref: refs/heads/{branch}\n"))
            .expect("write HEAD");
    }

    pub fn set_head_detached(&self, commit: ObjectId) {
        std::fs::write(self.git_dir.join("HEAD"), format!("{commit}\n")).expect("write HEAD");
    }
}
