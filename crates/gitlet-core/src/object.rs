//! Content-addressed object store.
//!
//! Objects live under `.gitlet/objects/` in a 2-character prefix
//! directory scheme: the object with id `9884ee…` is stored at
//! `objects/98/84ee…`. Blobs are raw file bytes; commits are their
//! canonical JSON encoding. Writes are if-absent, so identical content
//! is stored once and every write is idempotent.

use std::fs;
use std::path::{Path, PathBuf};

use crate::commit::Commit;
use crate::error::{GitletError, GitletResult};
use crate::hash::sha1_hex;

/// Full object ids are 40 hex chars.
pub const ID_LEN: usize = 40;

/// Shortest accepted abbreviated commit id.
const MIN_PREFIX_LEN: usize = 6;

/// The object store manages content-addressed storage on disk.
pub struct ObjectStore {
    /// Root path: `.gitlet/objects/`.
    root: PathBuf,
}

impl ObjectStore {
    /// Create an ObjectStore rooted at the given directory.
    pub fn new(objects_dir: &Path) -> Self {
        Self {
            root: objects_dir.to_path_buf(),
        }
    }

    /// Store bytes under their content digest and return the id.
    ///
    /// If an object with the same content already exists this is a
    /// no-op that returns the existing id.
    pub fn store_bytes(&self, data: &[u8]) -> GitletResult<String> {
        let id = sha1_hex(data);
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(id)
    }

    /// Serialize and store a commit record, returning its id.
    pub fn store_commit(&self, commit: &Commit) -> GitletResult<String> {
        self.store_bytes(&serde_json::to_vec(commit)?)
    }

    /// Load a commit by full id.
    ///
    /// An id whose object is missing, or whose object is not a commit
    /// (a blob id, say), reports "No commit with that id exists.".
    pub fn load_commit(&self, id: &str) -> GitletResult<Commit> {
        let path = self.object_path(id);
        if !path.exists() {
            return Err(GitletError::CommitNotFound);
        }
        let data = fs::read(&path)?;
        serde_json::from_slice(&data).map_err(|_| GitletError::CommitNotFound)
    }

    /// Load raw blob bytes by id.
    pub fn load_blob(&self, id: &str) -> GitletResult<Vec<u8>> {
        let path = self.object_path(id);
        if !path.exists() {
            return Err(GitletError::ObjectMissing(id.to_string()));
        }
        Ok(fs::read(&path)?)
    }

    /// Check whether an object exists.
    pub fn exists(&self, id: &str) -> bool {
        self.object_path(id).exists()
    }

    /// Resolve a possibly-abbreviated commit id to a full id.
    ///
    /// Full-length ids pass through unchecked (the subsequent load
    /// reports a missing commit). Prefixes shorter than 6 characters
    /// are rejected; otherwise the prefix must match exactly one object
    /// in its fanout directory, and more than one match is an
    /// ambiguity error.
    pub fn resolve_partial(&self, prefix: &str) -> GitletResult<String> {
        if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GitletError::CommitNotFound);
        }
        if prefix.len() == ID_LEN {
            return Ok(prefix.to_string());
        }
        if prefix.len() < MIN_PREFIX_LEN {
            return Err(GitletError::CommitNotFound);
        }

        let (folder, rest) = prefix.split_at(2);
        let dir = self.root.join(folder);
        if !dir.is_dir() {
            return Err(GitletError::CommitNotFound);
        }

        let mut matches = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with(rest) {
                matches.push(format!("{folder}{name}"));
            }
        }

        match matches.len() {
            0 => Err(GitletError::CommitNotFound),
            1 => Ok(matches.remove(0)),
            _ => Err(GitletError::AmbiguousCommitId(prefix.to_string())),
        }
    }

    /// Filesystem path of the object with `id`: `objects/<id[0:2]>/<id[2:]>`.
    fn object_path(&self, id: &str) -> PathBuf {
        let (folder, file) = id.split_at(2);
        self.root.join(folder).join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> ObjectStore {
        ObjectStore::new(dir)
    }

    fn sample_commit() -> Commit {
        Commit {
            author: "Default author".to_string(),
            date: "Thu Jan 01 00:00:00 1970 +0000".to_string(),
            parents: vec![None],
            message: "initial commit".to_string(),
            tree: BTreeMap::new(),
        }
    }

    #[test]
    fn test_store_and_load_blob() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let id = store.store_bytes(b"hello world").unwrap();
        assert_eq!(id.len(), ID_LEN);
        assert_eq!(store.load_blob(&id).unwrap(), b"hello world");
    }

    #[test]
    fn test_store_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let id1 = store.store_bytes(b"same content").unwrap();
        let id2 = store.store_bytes(b"same content").unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_fanout_layout() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let id = store.store_bytes(b"layout").unwrap();
        assert!(dir.path().join(&id[..2]).join(&id[2..]).is_file());
    }

    #[test]
    fn test_commit_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let commit = sample_commit();
        let id = store.store_commit(&commit).unwrap();
        assert_eq!(store.load_commit(&id).unwrap(), commit);
    }

    #[test]
    fn test_identical_commits_share_one_object() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let id1 = store.store_commit(&sample_commit()).unwrap();
        let id2 = store.store_commit(&sample_commit()).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_load_commit_missing() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let result = store.load_commit(&"0".repeat(40));
        assert!(matches!(result, Err(GitletError::CommitNotFound)));
    }

    #[test]
    fn test_load_commit_on_blob_id() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let blob_id = store.store_bytes(b"not a commit").unwrap();
        let result = store.load_commit(&blob_id);
        assert!(matches!(result, Err(GitletError::CommitNotFound)));
    }

    #[test]
    fn test_resolve_full_id_passes_through() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let id = "9".repeat(40);
        assert_eq!(store.resolve_partial(&id).unwrap(), id);
    }

    #[test]
    fn test_resolve_short_prefix_rejected() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let result = store.resolve_partial("abcde");
        assert!(matches!(result, Err(GitletError::CommitNotFound)));
    }

    #[test]
    fn test_resolve_unique_prefix() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let id = store.store_bytes(b"some object").unwrap();
        assert_eq!(store.resolve_partial(&id[..8]).unwrap(), id);
    }

    #[test]
    fn test_resolve_no_match() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.store_bytes(b"some object").unwrap();
        let result = store.resolve_partial("0123456");
        assert!(matches!(result, Err(GitletError::CommitNotFound)));
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        // Two objects sharing the first six id characters.
        let fanout = dir.path().join("ab");
        fs::create_dir_all(&fanout).unwrap();
        fs::write(fanout.join(format!("cdef{}", "0".repeat(34))), b"x").unwrap();
        fs::write(fanout.join(format!("cdef{}", "1".repeat(34))), b"y").unwrap();

        let result = store.resolve_partial("abcdef");
        assert!(matches!(result, Err(GitletError::AmbiguousCommitId(_))));
    }
}
