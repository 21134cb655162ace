//! Durable per-entry WAL file writer and housekeeping.

use crate::dir;
use crate::error::CoreResult;
use crate::types::TransactionId;
use crate::wal::entry::LogEntry;
use foliodb_codec::CodecError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const LOG_EXT: &str = "log";

/// Writes transaction log entries to the WAL directory, one file per
/// entry.
///
/// File names are `<transaction_id>_<timestamp>.log`; the transaction
/// id plus the strictly monotonic timestamp keep names unique across
/// concurrently running transactions. Each file is written atomically
/// and flushed to stable storage before [`WalWriter::append`] returns:
/// that return is the engine's durability point for the entry.
#[derive(Debug)]
pub struct WalWriter {
    dir: PathBuf,
    sync_on_write: bool,
}

impl WalWriter {
    /// Opens the WAL directory, creating it if needed.
    pub fn open(dir: PathBuf, sync_on_write: bool) -> CoreResult<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, sync_on_write })
    }

    /// Returns the WAL directory path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Appends a log entry as its own durable file.
    ///
    /// The entry must already be stamped with its transaction id and
    /// timestamp. Returns the path of the written file.
    pub fn append(&self, entry: &LogEntry) -> CoreResult<PathBuf> {
        let path = self.dir.join(format!(
            "{}_{}.{}",
            entry.transaction_id, entry.timestamp, LOG_EXT
        ));
        let bytes = serde_json::to_vec(entry).map_err(CodecError::from)?;
        dir::write_atomic(&path, &bytes, self.sync_on_write)?;
        Ok(path)
    }

    /// Reads a single log entry file back.
    pub fn read_entry(path: &Path) -> CoreResult<LogEntry> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes).map_err(CodecError::from)?)
    }

    /// Returns every `.log` file in the WAL directory, sorted by name.
    pub fn entry_files(&self) -> CoreResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(LOG_EXT) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Groups the WAL's entry files by owning transaction id.
    ///
    /// The file stem is `<tx-id>_<timestamp>`; the id itself contains an
    /// underscore (`tx_<hex>`), so the split is on the last one.
    pub fn transaction_groups(&self) -> CoreResult<HashMap<String, Vec<PathBuf>>> {
        let mut groups: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for path in self.entry_files()? {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((tx_id, _timestamp)) = stem.rsplit_once('_') else {
                continue;
            };
            groups.entry(tx_id.to_string()).or_default().push(path);
        }
        Ok(groups)
    }

    /// Deletes every entry file belonging to a transaction. Returns the
    /// number of files removed.
    pub fn delete_transaction_files(&self, id: &TransactionId) -> CoreResult<usize> {
        let prefix = format!("{id}_");
        let mut deleted = 0usize;

        for path in self.entry_files()? {
            let belongs = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(&prefix));
            if belongs {
                fs::remove_file(&path)?;
                deleted += 1;
            }
        }

        if deleted > 0 {
            if self.sync_on_write {
                dir::sync_dir(&self.dir)?;
            }
            debug!(transaction = %id, files = deleted, "WAL entries removed");
        }
        Ok(deleted)
    }
}
