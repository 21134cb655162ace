//! Transaction lifecycle management and WAL housekeeping.

use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::id::IdGenerator;
use crate::transaction::transaction::{timestamp, Transaction, TransactionState};
use crate::types::TransactionId;
use crate::wal::WalWriter;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

/// Manages transaction lifecycles: begin, lookup, commit, rollback, and
/// startup recovery of the WAL directory.
///
/// ## Recovery policy
///
/// Recovery is abort-on-recover, and runs before the database is made
/// available to clients: every WAL group left over from a previous run
/// is discarded and its files deleted. Transactions that had not
/// committed at crash time are lost — safe, because their entries were
/// never applied. A crash *during* commit replay can leave a prefix of
/// that transaction's entries applied while the rest are discarded
/// here; FolioDB keeps that trade-off from the original design rather
/// than introducing a commit marker, and logs what it throws away.
pub struct TransactionManager {
    wal: Arc<WalWriter>,
    ids: Arc<IdGenerator>,
    transactions: RwLock<HashMap<TransactionId, Arc<Transaction>>>,
}

impl TransactionManager {
    /// Opens the WAL directory and recovers leftover entries.
    pub(crate) fn open(
        wal: Arc<WalWriter>,
        ids: Arc<IdGenerator>,
    ) -> CoreResult<Self> {
        let manager = Self {
            wal,
            ids,
            transactions: RwLock::new(HashMap::new()),
        };
        manager.recover()?;
        Ok(manager)
    }

    /// Begins a new transaction and registers it.
    pub fn begin(&self) -> Arc<Transaction> {
        let id = self.ids.transaction_id();
        let tx = Arc::new(Transaction::new(
            id.clone(),
            timestamp(&self.ids),
            Arc::clone(&self.wal),
            Arc::clone(&self.ids),
        ));
        self.transactions.write().insert(id, Arc::clone(&tx));
        tx
    }

    /// Looks up an active transaction by id.
    pub fn get(&self, id: &TransactionId) -> CoreResult<Arc<Transaction>> {
        self.transactions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::transaction_not_found(id.as_str()))
    }

    /// Returns the number of registered transactions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.transactions.read().len()
    }

    /// Commits a transaction by replaying its log against the database.
    ///
    /// Entries are applied in append order. If an entry fails to apply
    /// (for example a unique-index violation introduced by a concurrent
    /// direct mutation), the already-applied prefix is compensated in
    /// reverse order using each entry's captured prior state, the
    /// transaction stays `Active`, and the replay error is returned;
    /// the caller must then roll back. Compensation is best-effort:
    /// failures are logged and do not mask the replay error.
    ///
    /// On success the transaction becomes `Committed`, its WAL files
    /// are deleted, and it is dropped from the manager.
    pub fn commit(&self, db: &Database, tx: &Transaction) -> CoreResult<()> {
        let mut inner = tx.lock();
        if inner.state != TransactionState::Active {
            return Err(CoreError::invalid_state(format!(
                "transaction {} is not active",
                tx.id()
            )));
        }

        for (applied, entry) in inner.log.iter().enumerate() {
            if let Err(err) = db.apply_log_entry(entry) {
                for undone in inner.log[..applied].iter().rev() {
                    if let Err(undo_err) = db.undo_log_entry(undone) {
                        warn!(
                            transaction = %tx.id(),
                            operation = %undone.operation,
                            document = %undone.document_id,
                            error = %undo_err,
                            "compensation failed after aborted commit replay"
                        );
                    }
                }
                return Err(err);
            }
        }

        inner.state = TransactionState::Committed;
        drop(inner);

        self.wal.delete_transaction_files(tx.id())?;
        self.transactions.write().remove(tx.id());
        Ok(())
    }

    /// Rolls back a transaction.
    ///
    /// No collection data changes before commit, so rollback is pure
    /// cleanup: mark `Aborted`, delete the WAL files, drop from the
    /// manager.
    pub fn rollback(&self, tx: &Transaction) -> CoreResult<()> {
        let mut inner = tx.lock();
        if inner.state != TransactionState::Active {
            return Err(CoreError::invalid_state(format!(
                "transaction {} is not active",
                tx.id()
            )));
        }
        inner.state = TransactionState::Aborted;
        drop(inner);

        self.wal.delete_transaction_files(tx.id())?;
        self.transactions.write().remove(tx.id());
        Ok(())
    }

    /// Discards every WAL group left over from a previous run.
    fn recover(&self) -> CoreResult<()> {
        let groups = self.wal.transaction_groups()?;
        if groups.is_empty() {
            return Ok(());
        }

        for (tx_id, files) in groups {
            info!(
                transaction = %tx_id,
                entries = files.len(),
                "discarding incomplete transaction found in WAL"
            );
            for path in files {
                fs::remove_file(&path)?;
            }
        }
        crate::dir::sync_dir(self.wal.dir())?;
        Ok(())
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("wal_dir", &self.wal.dir())
            .field("active_count", &self.active_count())
            .finish_non_exhaustive()
    }
}
