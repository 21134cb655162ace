//! Database root object: collection registry and transactional routing.

use crate::collection::Collection;
use crate::config::Config;
use crate::dir::{DatabaseDir, WAL_DIR};
use crate::error::{CoreError, CoreResult};
use crate::id::IdGenerator;
use crate::transaction::{Transaction, TransactionManager};
use crate::types::{DocumentId, TransactionId};
use crate::wal::{LogEntry, Operation, WalWriter};
use foliodb_codec::Document;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// An embedded FolioDB database.
///
/// A `Database` owns a root directory containing one subdirectory per
/// collection plus the reserved `wal/` subdirectory, and is fully
/// self-contained: no global state is shared between instances. Opening
/// takes an exclusive advisory lock on the root and recovers the WAL
/// before any operation is served.
///
/// Direct mutations go straight to the target [`Collection`];
/// transactional mutations accumulate WAL-backed log entries that are
/// applied only at commit. There is no isolation between an in-flight
/// transaction and concurrent direct mutations.
pub struct Database {
    dir: DatabaseDir,
    ids: Arc<IdGenerator>,
    config: Config,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    transactions: TransactionManager,
}

impl Database {
    /// Opens a database with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database.
    ///
    /// Creates the root directory if allowed by the configuration,
    /// takes the exclusive root lock, discovers existing collection
    /// directories, and runs WAL recovery. Only then is the database
    /// handed to the caller.
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let dir = DatabaseDir::open(path.as_ref(), config.create_if_missing)?;
        let ids = Arc::new(IdGenerator::new());

        let wal = Arc::new(WalWriter::open(dir.wal_path(), config.sync_on_write)?);
        let transactions = TransactionManager::open(wal, Arc::clone(&ids))?;

        let mut collections = HashMap::new();
        for name in dir.collection_dirs()? {
            let collection = Collection::open(
                name.clone(),
                dir.collection_path(&name),
                config.sync_on_write,
                Arc::clone(&ids),
            )?;
            collections.insert(name, collection);
        }

        Ok(Self {
            dir,
            ids,
            config,
            collections: RwLock::new(collections),
            transactions,
        })
    }

    /// Returns the database root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a new collection.
    ///
    /// Fails with `CollectionExists` if the name is taken and
    /// `InvalidArgument` if it is not a portable directory name.
    pub fn create_collection(&self, name: &str) -> CoreResult<Arc<Collection>> {
        validate_collection_name(name)?;

        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(CoreError::CollectionExists {
                name: name.to_string(),
            });
        }

        let collection = Collection::open(
            name.to_string(),
            self.dir.collection_path(name),
            self.config.sync_on_write,
            Arc::clone(&self.ids),
        )?;
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    /// Returns a collection by name.
    pub fn collection(&self, name: &str) -> CoreResult<Arc<Collection>> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::collection_not_found(name))
    }

    /// Returns every collection, sorted by name.
    #[must_use]
    pub fn collections(&self) -> Vec<Arc<Collection>> {
        let mut collections: Vec<Arc<Collection>> =
            self.collections.read().values().cloned().collect();
        collections.sort_by(|a, b| a.name().cmp(b.name()));
        collections
    }

    /// Returns the collection names, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Begins a new transaction.
    #[must_use]
    pub fn begin_transaction(&self) -> Arc<Transaction> {
        self.transactions.begin()
    }

    /// Looks up an active transaction by id.
    pub fn transaction(&self, id: &TransactionId) -> CoreResult<Arc<Transaction>> {
        self.transactions.get(id)
    }

    /// Commits a transaction, replaying its log in order.
    ///
    /// On a replay failure the already-applied prefix is compensated,
    /// the transaction stays `Active`, and the error surfaces; the
    /// caller must then [`rollback`](Self::rollback).
    pub fn commit(&self, tx: &Transaction) -> CoreResult<()> {
        self.transactions.commit(self, tx)
    }

    /// Rolls back a transaction, discarding its log and WAL files.
    pub fn rollback(&self, tx: &Transaction) -> CoreResult<()> {
        self.transactions.rollback(tx)
    }

    /// Records an insert in a transaction.
    ///
    /// The document id is assigned and returned now, even though the
    /// document stays invisible until commit.
    pub fn insert_with_transaction(
        &self,
        tx: &Transaction,
        collection: &str,
        mut doc: Document,
    ) -> CoreResult<DocumentId> {
        self.collection(collection)?;

        let id = self.ids.document_id();
        doc.set_id(id.as_str());
        tx.add_log_entry(LogEntry::insert(collection, id.clone(), doc))?;
        Ok(id)
    }

    /// Records an update in a transaction.
    ///
    /// The prior document is captured from disk **now**, not at commit;
    /// an earlier entry of the same transaction touching the same
    /// document is not visible here.
    pub fn update_with_transaction(
        &self,
        tx: &Transaction,
        collection: &str,
        id: &DocumentId,
        mut doc: Document,
    ) -> CoreResult<()> {
        let old = self.collection(collection)?.find_by_id(id)?;
        doc.set_id(id.as_str());
        tx.add_log_entry(LogEntry::update(collection, id.clone(), doc, old))
    }

    /// Records a delete in a transaction. The prior document is
    /// captured from disk now, as for updates.
    pub fn delete_with_transaction(
        &self,
        tx: &Transaction,
        collection: &str,
        id: &DocumentId,
    ) -> CoreResult<()> {
        let old = self.collection(collection)?.find_by_id(id)?;
        tx.add_log_entry(LogEntry::delete(collection, id.clone(), old))
    }

    /// Applies one log entry as the corresponding direct collection
    /// operation. Used by commit replay.
    pub(crate) fn apply_log_entry(&self, entry: &LogEntry) -> CoreResult<()> {
        let collection = self.collection(&entry.collection)?;
        match entry.operation {
            Operation::Insert => {
                let data = require_data(entry)?;
                collection.apply_insert(entry.document_id.clone(), data)
            }
            Operation::Update => {
                let data = require_data(entry)?;
                collection.update(&entry.document_id, data)
            }
            Operation::Delete => collection.delete(&entry.document_id),
        }
    }

    /// Reverts one applied log entry using its captured prior state.
    /// Used to compensate a partially replayed commit.
    pub(crate) fn undo_log_entry(&self, entry: &LogEntry) -> CoreResult<()> {
        let collection = self.collection(&entry.collection)?;
        match entry.operation {
            Operation::Insert => collection.delete(&entry.document_id),
            Operation::Update => {
                let old = require_old_data(entry)?;
                collection.update(&entry.document_id, old)
            }
            Operation::Delete => {
                let old = require_old_data(entry)?;
                collection.apply_insert(entry.document_id.clone(), old)
            }
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.dir.path())
            .field("collections", &self.collection_names())
            .finish_non_exhaustive()
    }
}

fn require_data(entry: &LogEntry) -> CoreResult<Document> {
    entry.data.clone().ok_or_else(|| {
        CoreError::invalid_argument(format!("{} log entry carries no document", entry.operation))
    })
}

fn require_old_data(entry: &LogEntry) -> CoreResult<Document> {
    entry.old_data.clone().ok_or_else(|| {
        CoreError::invalid_argument(format!(
            "{} log entry carries no prior document",
            entry.operation
        ))
    })
}

/// Collection names become directory names, so they are restricted to a
/// portable character set.
fn validate_collection_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_argument(
            "collection name must not be empty",
        ));
    }
    if name == WAL_DIR {
        return Err(CoreError::invalid_argument(format!(
            "collection name {name:?} is reserved"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::invalid_argument(format!(
            "collection name {name:?} contains unsupported characters"
        )));
    }
    Ok(())
}
