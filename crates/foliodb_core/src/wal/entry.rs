//! WAL log entry types.

use crate::types::{DocumentId, TransactionId};
use foliodb_codec::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of mutation a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Insert a new document.
    Insert,
    /// Replace an existing document.
    Update,
    /// Delete an existing document.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        })
    }
}

/// A single operation recorded in a transaction's write-ahead log.
///
/// Each entry is serialized as a standalone JSON object and written to
/// its own file under the WAL directory. `transaction_id` and
/// `timestamp` start out blank and are stamped by
/// [`Transaction::add_log_entry`](crate::transaction::Transaction::add_log_entry).
///
/// `data` carries the new document for inserts and updates; `old_data`
/// carries the prior document for updates and deletes, captured from
/// disk when the operation was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Id of the owning transaction.
    pub transaction_id: TransactionId,
    /// Monotonic nanosecond timestamp assigned at append time.
    pub timestamp: i64,
    /// The recorded operation.
    pub operation: Operation,
    /// Target collection name.
    pub collection: String,
    /// Target document id.
    pub document_id: DocumentId,
    /// New document (inserts and updates).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Document>,
    /// Prior document (updates and deletes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_data: Option<Document>,
}

impl LogEntry {
    /// Creates an insert entry.
    pub fn insert(collection: impl Into<String>, id: DocumentId, data: Document) -> Self {
        Self {
            transaction_id: TransactionId::new(""),
            timestamp: 0,
            operation: Operation::Insert,
            collection: collection.into(),
            document_id: id,
            data: Some(data),
            old_data: None,
        }
    }

    /// Creates an update entry.
    pub fn update(
        collection: impl Into<String>,
        id: DocumentId,
        data: Document,
        old_data: Document,
    ) -> Self {
        Self {
            transaction_id: TransactionId::new(""),
            timestamp: 0,
            operation: Operation::Update,
            collection: collection.into(),
            document_id: id,
            data: Some(data),
            old_data: Some(old_data),
        }
    }

    /// Creates a delete entry.
    pub fn delete(collection: impl Into<String>, id: DocumentId, old_data: Document) -> Self {
        Self {
            transaction_id: TransactionId::new(""),
            timestamp: 0,
            operation: Operation::Delete,
            collection: collection.into(),
            document_id: id,
            data: None,
            old_data: Some(old_data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Operation::Insert).unwrap(), "\"INSERT\"");
        assert_eq!(serde_json::to_string(&Operation::Update).unwrap(), "\"UPDATE\"");
        assert_eq!(serde_json::to_string(&Operation::Delete).unwrap(), "\"DELETE\"");
    }

    #[test]
    fn insert_entry_json_shape() {
        let mut entry = LogEntry::insert(
            "users",
            DocumentId::new("1a2b"),
            Document::new().with("name", "Ada"),
        );
        entry.transaction_id = TransactionId::new("tx_ff");
        entry.timestamp = 42;

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        assert_eq!(json["transaction_id"], "tx_ff");
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["operation"], "INSERT");
        assert_eq!(json["collection"], "users");
        assert_eq!(json["document_id"], "1a2b");
        assert_eq!(json["data"]["name"], "Ada");
        // old_data is omitted entirely for inserts.
        assert!(json.get("old_data").is_none());
    }

    #[test]
    fn delete_entry_omits_data() {
        let entry = LogEntry::delete(
            "users",
            DocumentId::new("1a2b"),
            Document::new().with("name", "Ada"),
        );
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["old_data"]["name"], "Ada");
    }

    #[test]
    fn entry_roundtrip() {
        let mut entry = LogEntry::update(
            "users",
            DocumentId::new("1a2b"),
            Document::new().with("age", 38),
            Document::new().with("age", 37),
        );
        entry.transaction_id = TransactionId::new("tx_1");
        entry.timestamp = 7;

        let bytes = serde_json::to_vec(&entry).unwrap();
        let back: LogEntry = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, entry);
    }
}
