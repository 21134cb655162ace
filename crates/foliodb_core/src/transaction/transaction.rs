//! A single transaction: state plus its ordered operation log.

use crate::error::{CoreError, CoreResult};
use crate::id::IdGenerator;
use crate::types::TransactionId;
use crate::wal::{LogEntry, WalWriter};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// State of a transaction.
///
/// `Committed` and `Aborted` are terminal: operations on a transaction
/// in those states fail with `InvalidState`, and the manager drops the
/// transaction from its table the moment it terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction can accept operations.
    Active,
    /// Transaction committed successfully.
    Committed,
    /// Transaction was rolled back.
    Aborted,
}

pub(super) struct TransactionInner {
    pub(super) state: TransactionState,
    pub(super) log: Vec<LogEntry>,
}

/// A multi-operation transaction.
///
/// Operations recorded through a transaction are not applied to any
/// collection until commit; the transaction only accumulates log
/// entries, each made durable in the WAL before the recording call
/// returns. Entries keep the order of successful
/// [`add_log_entry`](Self::add_log_entry) calls.
///
/// Transactions do **not** read their own writes: an update or delete
/// recorded after an earlier entry touching the same document still
/// captures the on-disk state from before the transaction.
pub struct Transaction {
    id: TransactionId,
    start_time: i64,
    wal: Arc<WalWriter>,
    ids: Arc<IdGenerator>,
    inner: Mutex<TransactionInner>,
}

impl Transaction {
    pub(super) fn new(
        id: TransactionId,
        start_time: i64,
        wal: Arc<WalWriter>,
        ids: Arc<IdGenerator>,
    ) -> Self {
        Self {
            id,
            start_time,
            wal,
            ids,
            inner: Mutex::new(TransactionInner {
                state: TransactionState::Active,
                log: Vec::new(),
            }),
        }
    }

    /// Returns the transaction id.
    #[must_use]
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    /// Returns the nanosecond timestamp at which the transaction began.
    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.inner.lock().state
    }

    /// Returns `true` while the transaction can accept operations.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Returns the number of recorded log entries.
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.inner.lock().log.len()
    }

    /// Stamps and records a log entry.
    ///
    /// The entry receives this transaction's id and a fresh monotonic
    /// timestamp, is appended to the WAL (flushed to stable storage
    /// before this returns), and only then joins the in-memory log.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the transaction has terminated; any WAL write
    /// error, in which case the entry is not recorded.
    pub fn add_log_entry(&self, mut entry: LogEntry) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        if inner.state != TransactionState::Active {
            return Err(CoreError::invalid_state(format!(
                "transaction {} is not active",
                self.id
            )));
        }

        entry.transaction_id = self.id.clone();
        entry.timestamp = timestamp(&self.ids);
        self.wal.append(&entry)?;
        inner.log.push(entry);
        Ok(())
    }

    /// Locks the state and log. The manager holds this guard across
    /// commit and rollback so no entry can slip in mid-replay.
    pub(super) fn lock(&self) -> MutexGuard<'_, TransactionInner> {
        self.inner.lock()
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &inner.state)
            .field("log_len", &inner.log.len())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::cast_possible_wrap)]
pub(super) fn timestamp(ids: &IdGenerator) -> i64 {
    ids.now_nanos() as i64
}
