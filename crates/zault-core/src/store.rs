//! Content-addressed block storage on the local filesystem. The store does
//! not interpret block contents; it only knows how to write bytes under the
//! hex encoding of their own hash and read them back.

use crate::error::{Result, ZaultError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct BlockStore {
    root: PathBuf,
}

impl BlockStore {
    /// `root` should be `<vault>/blocks`; it is created if missing.
    pub fn open(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, hash: &[u8; 32]) -> PathBuf {
        let hex = hex::encode(hash);
        self.root.join(&hex[0..2]).join(hex)
    }

    /// Atomically writes `bytes` under `hash`'s content address. Write to a
    /// sibling `.tmp` file, fsync it, rename into place, then fsync the
    /// parent directory so the rename itself is durable. If the destination
    /// already holds different bytes, that's on-disk corruption under
    /// SHA3-256 and is reported as such.
    pub fn put(&self, hash: &[u8; 32], bytes: &[u8]) -> Result<()> {
        let final_path = self.path_for(hash);
        if let Some(existing) = self.try_read(&final_path)? {
            return if existing == bytes {
                Ok(())
            } else {
                Err(ZaultError::HashCollision)
            };
        }

        let parent = final_path.parent().expect("path_for always has a shard parent");
        fs::create_dir_all(parent)?;

        let tmp_path = parent.join(format!("{}.tmp", hex::encode(hash)));
        {
            let mut tmp = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            tmp.write_all(bytes)?;
            tmp.sync_all()?;
        }

        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let _ = fs::remove_file(&tmp_path);
                let existing = fs::read(&final_path)?;
                if existing != bytes {
                    return Err(ZaultError::HashCollision);
                }
            }
            Err(e) => return Err(e.into()),
        }

        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    pub fn get(&self, hash: &[u8; 32]) -> Result<Vec<u8>> {
        match fs::read(self.path_for(hash)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ZaultError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub fn has(&self, hash: &[u8; 32]) -> bool {
        self.path_for(hash).is_file()
    }

    fn try_read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Walks the shard directories, yielding every stored hash exactly once
    /// in filesystem order. Skips `.tmp` files and anything whose name
    /// isn't exactly 64 lowercase hex characters.
    pub fn iter(&self) -> Result<Vec<[u8; 32]>> {
        let mut out = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        for shard in entries {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if name.len() != 64 || !name.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
                    continue;
                }
                let Ok(bytes) = hex::decode(name) else { continue };
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&bytes);
                out.push(hash);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, BlockStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlockStore::open(dir.path().join("blocks")).unwrap();
        (dir, store)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_dir, store) = store();
        let hash = [1u8; 32];
        store.put(&hash, b"hello").unwrap();
        assert!(store.has(&hash));
        assert_eq!(store.get(&hash).unwrap(), b"hello");
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.get(&[2u8; 32]), Err(ZaultError::NotFound)));
    }

    #[test]
    fn put_is_idempotent_for_identical_bytes() {
        let (_dir, store) = store();
        let hash = [3u8; 32];
        store.put(&hash, b"same").unwrap();
        store.put(&hash, b"same").unwrap();
        assert_eq!(store.get(&hash).unwrap(), b"same");
    }

    #[test]
    fn put_rejects_divergent_bytes_at_same_hash() {
        let (_dir, store) = store();
        let hash = [4u8; 32];
        store.put(&hash, b"first").unwrap();
        assert!(matches!(
            store.put(&hash, b"second"),
            Err(ZaultError::HashCollision)
        ));
    }

    #[test]
    fn iter_yields_every_put_hash_once_and_no_tmp() {
        let (_dir, store) = store();
        let h1 = [5u8; 32];
        let h2 = [6u8; 32];
        store.put(&h1, b"a").unwrap();
        store.put(&h2, b"b").unwrap();
        let mut hashes = store.iter().unwrap();
        hashes.sort();
        let mut expected = vec![h1, h2];
        expected.sort();
        assert_eq!(hashes, expected);
    }
}
