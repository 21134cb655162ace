//! # FolioDB Core
//!
//! Storage engine for FolioDB: an embeddable document store for
//! schemaless JSON documents organised into named collections, with
//! per-field secondary indexes and WAL-backed multi-operation
//! transactions.
//!
//! On-disk layout under a database root:
//!
//! ```text
//! <root>/
//! ├─ LOCK
//! ├─ <collection>/<id>.json        # one file per document
//! └─ wal/<tx-id>_<ts>.log          # one file per transaction log entry
//! ```
//!
//! Direct mutations validate unique indexes, write the document file
//! atomically (temp + rename + fsync), then update in-memory postings.
//! Transactional mutations accumulate durable log entries and are
//! applied at commit like a sequence of direct mutations. Indexes live
//! in memory only and are rebuilt from the documents.
//!
//! ```no_run
//! use foliodb_core::{Database, Document};
//!
//! # fn main() -> foliodb_core::CoreResult<()> {
//! let db = Database::open("my_db")?;
//! let users = db.create_collection("users")?;
//!
//! let id = users.insert(Document::new().with("name", "Ada").with("age", 37))?;
//! let doc = users.find_by_id(&id)?;
//! assert_eq!(doc.get("name").and_then(|v| v.as_str()), Some("Ada"));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod database;
mod dir;
mod error;
mod id;
mod index;
mod transaction;
mod types;
mod wal;

pub use collection::Collection;
pub use config::Config;
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use id::IdGenerator;
pub use index::Index;
pub use transaction::{Transaction, TransactionManager, TransactionState};
pub use types::{DocumentId, TransactionId};
pub use wal::{LogEntry, Operation, WalWriter};

pub use foliodb_codec::{Document, Value, ID_FIELD};
