//! Identifier generation.

use crate::types::{DocumentId, TransactionId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generates document and transaction identifiers from a strictly
/// monotonic nanosecond clock.
///
/// Each reading is `max(wall_clock, previous + 1)`, so two calls never
/// observe the same nanosecond even when the OS clock stalls or steps
/// backwards. Identifiers are therefore unique within a process; the
/// exclusive lock on the database root makes the process the only writer.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a strictly increasing nanosecond timestamp.
    pub fn now_nanos(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        loop {
            let last = self.last.load(Ordering::SeqCst);
            let next = wall.max(last + 1);
            if self
                .last
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return next;
            }
        }
    }

    /// Generates a fresh document id.
    pub fn document_id(&self) -> DocumentId {
        DocumentId::new(format!("{:x}", self.now_nanos()))
    }

    /// Generates a fresh transaction id.
    pub fn transaction_id(&self) -> TransactionId {
        TransactionId::new(format!("{}{:x}", TransactionId::PREFIX, self.now_nanos()))
    }
}
