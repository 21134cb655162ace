//! Database directory management.
//!
//! On-disk layout under a database root:
//!
//! ```text
//! <root>/
//! ├─ LOCK                      # advisory lock for exclusive access
//! ├─ <collection>/
//! │   └─ <id>.json             # one file per document
//! └─ wal/
//!     └─ <tx-id>_<ts>.log      # one file per transaction log entry
//! ```
//!
//! The LOCK file ensures only one process writes a database root at a
//! time. All durable file writes go through [`write_atomic`]:
//! write-to-temp, fsync, rename within the same directory (the commit
//! point), then fsync the directory.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Name of the reserved WAL subdirectory.
pub const WAL_DIR: &str = "wal";

const LOCK_FILE: &str = "LOCK";
const TMP_SUFFIX: &str = ".tmp";

/// Manages the database root directory and its advisory lock.
///
/// Only one `DatabaseDir` instance can exist per root at a time; the
/// lock is released when the instance is dropped.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens or creates a database root directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the directory doesn't exist and `create_if_missing` is false
    /// - another process holds the lock (`DatabaseLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_argument(format!(
                    "database directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_argument(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the database root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the WAL directory.
    #[must_use]
    pub fn wal_path(&self) -> PathBuf {
        self.path.join(WAL_DIR)
    }

    /// Returns the path to a collection's directory.
    #[must_use]
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Lists the names of collection directories under the root.
    ///
    /// Everything that is a directory and not the reserved WAL
    /// subdirectory counts as a collection.
    pub fn collection_dirs(&self) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name != WAL_DIR {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Atomically writes `bytes` to `path`.
///
/// The bytes land in a temporary file in the same directory, which is
/// fsynced and renamed over the target; readers never observe a partial
/// file. With `sync`, the directory is fsynced after the rename so the
/// new entry survives a crash.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8], sync: bool) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp_path = path.with_file_name(format!("{file_name}{TMP_SUFFIX}"));

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        if sync {
            file.sync_all()?;
        }
    }

    fs::rename(&tmp_path, path)?;

    if sync {
        if let Some(parent) = path.parent() {
            sync_dir(parent)?;
        }
    }

    Ok(())
}

/// Removes a file and, with `sync`, fsyncs its directory so the removal
/// survives a crash.
pub(crate) fn remove_durable(path: &Path, sync: bool) -> io::Result<()> {
    fs::remove_file(path)?;
    if sync {
        if let Some(parent) = path.parent() {
            sync_dir(parent)?;
        }
    }
    Ok(())
}

/// Fsyncs a directory so entry creations, renames and removals are
/// durable.
///
/// On Windows, directory handles cannot be fsynced the same way; NTFS
/// journaling covers metadata durability, so this is a no-op there.
#[cfg(unix)]
pub(crate) fn sync_dir(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
