//! Pool open/create semantics: the on-disk directory layout a persistent
//! engine opens, and the `path`/`create_if_missing`/
//! `create_or_error_if_exists` rules every persistent engine follows.
//!
//! This stands in for the real pmem pool allocator the original C++
//! engines open through libpmemobj — the persistent allocator itself is
//! assumed collaborator infrastructure, not something this workspace
//! implements. What a Rust persistent engine genuinely needs from "pool
//! open" is a directory to hold its WAL and a lock preventing two
//! processes from opening it at once; that's what `PoolPaths`/`open_pool`
//! provide.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use kvengine_core::{Error, Result};

/// Directory layout of an open pool.
///
/// ```text
/// <path>/
/// ├── LOCK        # exclusive advisory lock, held for the life of the pool
/// ├── MANIFEST    # marker file; its presence means the pool has been created
/// └── WAL/        # write-ahead log segments
/// ```
#[derive(Debug, Clone)]
pub struct PoolPaths {
    root: PathBuf,
}

impl PoolPaths {
    /// Paths rooted at `root`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        PoolPaths {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The pool's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The lock file path.
    pub fn lock_file(&self) -> PathBuf {
        self.root.join("LOCK")
    }

    /// The marker file whose presence means the pool has been created.
    pub fn manifest(&self) -> PathBuf {
        self.root.join("MANIFEST")
    }

    /// The WAL segment directory.
    pub fn wal_dir(&self) -> PathBuf {
        self.root.join("WAL")
    }

    /// Whether a pool already exists at this path.
    pub fn exists(&self) -> bool {
        self.manifest().exists()
    }

    fn create_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.wal_dir())?;
        Ok(())
    }
}

/// A held pool lock, released when dropped.
pub struct PoolHandle {
    paths: PoolPaths,
    _lock: File,
}

impl PoolHandle {
    /// The pool's paths.
    pub fn paths(&self) -> &PoolPaths {
        &self.paths
    }
}

/// Open or create a pool at `path`, per the config's `create_if_missing`
/// and `create_or_error_if_exists` flags.
///
/// - Pool exists, `create_or_error_if_exists`: `Status::InvalidArgument`.
/// - Pool missing, `!create_if_missing`: `Status::NotFound`.
/// - Otherwise opens (creating the directory layout if it was missing)
///   and takes an exclusive advisory lock on `LOCK`, failing with
///   `Status::InvalidArgument` if another process already holds it.
pub fn open_pool(path: &str, create_if_missing: bool, create_or_error_if_exists: bool) -> Result<PoolHandle> {
    let paths = PoolPaths::from_root(path);
    let exists = paths.exists();

    if exists && create_or_error_if_exists {
        return Err(Error::invalid_argument(format!(
            "pool already exists at `{path}` and create_or_error_if_exists was set"
        )));
    }
    if !exists && !create_if_missing {
        return Err(Error::not_found(format!(
            "no pool at `{path}` and create_if_missing was not set"
        )));
    }

    if !exists {
        paths.create_directories()?;
        std::fs::write(paths.manifest(), b"kvengine-pool-v1")?;
        tracing::debug!(path, "created pool");
    }

    let lock_file = File::create(paths.lock_file())?;
    lock_file.try_lock_exclusive().map_err(|_| {
        Error::invalid_argument(format!("pool at `{path}` is already open by another process"))
    })?;

    Ok(PoolHandle { paths, _lock: lock_file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_if_missing_creates_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool").to_string_lossy().to_string();
        let handle = open_pool(&path, true, false).unwrap();
        assert!(handle.paths().manifest().exists());
        assert!(handle.paths().wal_dir().exists());
    }

    #[test]
    fn missing_without_create_if_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool").to_string_lossy().to_string();
        let err = open_pool(&path, false, false).unwrap_err();
        assert_eq!(err.status(), kvengine_core::Status::NotFound);
    }

    #[test]
    fn existing_with_create_or_error_if_exists_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool").to_string_lossy().to_string();
        let handle = open_pool(&path, true, false).unwrap();
        drop(handle);
        let err = open_pool(&path, true, true).unwrap_err();
        assert_eq!(err.status(), kvengine_core::Status::InvalidArgument);
    }

    #[test]
    fn reopening_existing_pool_succeeds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool").to_string_lossy().to_string();
        let handle = open_pool(&path, true, false).unwrap();
        drop(handle);
        let handle = open_pool(&path, false, false).unwrap();
        assert!(handle.paths().exists());
    }

    #[test]
    fn double_open_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool").to_string_lossy().to_string();
        let _first = open_pool(&path, true, false).unwrap();
        let err = open_pool(&path, false, false).unwrap_err();
        assert_eq!(err.status(), kvengine_core::Status::InvalidArgument);
    }
}
