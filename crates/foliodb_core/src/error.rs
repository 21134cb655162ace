//! Error types for the FolioDB storage engine.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in FolioDB engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Collection does not exist.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Name of the collection.
        name: String,
    },

    /// Document does not exist.
    #[error("document not found: {id} in collection {collection}")]
    DocumentNotFound {
        /// Collection searched.
        collection: String,
        /// Document id that was not found.
        id: String,
    },

    /// Transaction does not exist or has already terminated.
    #[error("transaction not found: {id}")]
    TransactionNotFound {
        /// Transaction id.
        id: String,
    },

    /// Collection name collision.
    #[error("collection already exists: {name}")]
    CollectionExists {
        /// Name of the collection.
        name: String,
    },

    /// Index name collision.
    #[error("index already exists on field: {field}")]
    IndexExists {
        /// Indexed field.
        field: String,
    },

    /// A unique-index constraint would be broken.
    #[error("unique constraint violation on field: {field}")]
    UniqueViolation {
        /// Field carrying the unique index.
        field: String,
    },

    /// Operation on a committed or aborted transaction.
    #[error("invalid transaction state: {message}")]
    InvalidState {
        /// Description of the state problem.
        message: String,
    },

    /// Database root is locked by another process.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument issue.
        message: String,
    },

    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Document or log entry serialization failure.
    #[error("codec error: {0}")]
    Codec(#[from] foliodb_codec::CodecError),
}

impl CoreError {
    /// Creates a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    /// Creates a document not found error.
    pub fn document_not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DocumentNotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates a transaction not found error.
    pub fn transaction_not_found(id: impl Into<String>) -> Self {
        Self::TransactionNotFound { id: id.into() }
    }

    /// Creates a unique violation error.
    pub fn unique_violation(field: impl Into<String>) -> Self {
        Self::UniqueViolation {
            field: field.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
