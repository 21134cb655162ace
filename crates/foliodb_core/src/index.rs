//! In-memory secondary index.

use crate::error::{CoreError, CoreResult};
use crate::types::DocumentId;
use foliodb_codec::Value;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A single-field equality index.
///
/// Maps each indexed value to its posting list: the ids of documents that
/// carry that value, in insertion order. An index covers only documents
/// that actually contain the field (sparse indexing). Indexes live in
/// memory only and are rebuilt from documents when a database is opened.
///
/// When `unique` is set, every posting list has length exactly one.
#[derive(Debug)]
pub struct Index {
    field: String,
    unique: bool,
    postings: RwLock<HashMap<Value, Vec<DocumentId>>>,
}

impl Index {
    /// Creates an empty index.
    pub(crate) fn new(field: impl Into<String>, unique: bool) -> Self {
        Self {
            field: field.into(),
            unique,
            postings: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an index from pre-built postings (used by index builds).
    pub(crate) fn from_postings(
        field: impl Into<String>,
        unique: bool,
        postings: HashMap<Value, Vec<DocumentId>>,
    ) -> Self {
        Self {
            field: field.into(),
            unique,
            postings: RwLock::new(postings),
        }
    }

    /// Returns the indexed field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns `true` if the index enforces uniqueness.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Appends `id` to the posting list for `value`.
    ///
    /// Re-adding an id already posted under the same value is a no-op.
    /// Fails with `UniqueViolation` if the index is unique and the list
    /// would grow past one entry; the caller must roll back the
    /// surrounding mutation.
    pub fn add(&self, id: &DocumentId, value: &Value) -> CoreResult<()> {
        let mut postings = self.postings.write();
        let ids = postings.entry(value.clone()).or_default();
        if ids.contains(id) {
            return Ok(());
        }
        if self.unique && !ids.is_empty() {
            return Err(CoreError::unique_violation(&self.field));
        }
        ids.push(id.clone());
        Ok(())
    }

    /// Removes the first occurrence of `id` from the posting list for
    /// `value`, dropping the entry when the list empties.
    ///
    /// Silently succeeds if the id is absent, which keeps replay and
    /// compensation idempotent.
    pub fn remove(&self, id: &DocumentId, value: &Value) {
        let mut postings = self.postings.write();
        if let Some(ids) = postings.get_mut(value) {
            if let Some(pos) = ids.iter().position(|existing| existing == id) {
                ids.remove(pos);
            }
            if ids.is_empty() {
                postings.remove(value);
            }
        }
    }

    /// Returns the posting list for `value`, in insertion order.
    #[must_use]
    pub fn lookup(&self, value: &Value) -> Vec<DocumentId> {
        self.postings
            .read()
            .get(value)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if posting `id` under `value` would break the
    /// unique constraint.
    ///
    /// Collision with `id` itself is allowed: re-inserting the value a
    /// document already holds is a no-op.
    #[must_use]
    pub(crate) fn conflicts(&self, value: &Value, id: Option<&DocumentId>) -> bool {
        if !self.unique {
            return false;
        }
        self.postings
            .read()
            .get(value)
            .is_some_and(|ids| ids.iter().any(|existing| Some(existing) != id))
    }

    /// Returns every posted document id, in no particular order.
    #[must_use]
    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.postings
            .read()
            .values()
            .flat_map(|ids| ids.iter().cloned())
            .collect()
    }

    /// Returns the total number of postings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.postings.read().values().map(Vec::len).sum()
    }

    /// Returns `true` if the index has no postings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.postings.read().is_empty()
    }
}
