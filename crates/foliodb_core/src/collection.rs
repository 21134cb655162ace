//! Document collection: a directory of per-document files plus its
//! in-memory secondary indexes.

use crate::dir;
use crate::error::{CoreError, CoreResult};
use crate::id::IdGenerator;
use crate::index::Index;
use crate::types::DocumentId;
use foliodb_codec::{Document, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const DOC_EXT: &str = "json";

type IndexMap = HashMap<String, Index>;

/// A named collection of schemaless documents.
///
/// Each document is stored as `<id>.json` in the collection's directory.
/// Mutations run under the collection's writer lock: uniqueness is
/// validated against every unique index before any I/O, the document
/// file is written atomically (temp + rename), and only then are the
/// index postings updated, so a successful file write is never followed
/// by a failing index update.
///
/// Reads take the reader lock; `find_by_field` uses an index when one
/// exists and falls back to a directory scan otherwise.
pub struct Collection {
    name: String,
    path: PathBuf,
    sync_on_write: bool,
    ids: Arc<IdGenerator>,
    indexes: RwLock<IndexMap>,
}

impl Collection {
    /// Opens a collection directory, creating it if needed.
    pub(crate) fn open(
        name: String,
        path: PathBuf,
        sync_on_write: bool,
        ids: Arc<IdGenerator>,
    ) -> CoreResult<Arc<Self>> {
        fs::create_dir_all(&path)?;
        Ok(Arc::new(Self {
            name,
            path,
            sync_on_write,
            ids,
            indexes: RwLock::new(HashMap::new()),
        }))
    }

    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the collection's directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts a document, assigning it a fresh id.
    ///
    /// Fails with `UniqueViolation` before any I/O if the document's
    /// value for a uniquely indexed field is already posted.
    pub fn insert(&self, doc: Document) -> CoreResult<DocumentId> {
        let indexes = self.indexes.write();
        self.check_unique(&indexes, &doc, None)?;

        let id = self.ids.document_id();
        self.store(&indexes, id.clone(), doc)?;
        Ok(id)
    }

    /// Inserts a document under a caller-supplied id.
    ///
    /// Used by transaction replay and compensation, where the id was
    /// assigned when the log entry was recorded.
    pub(crate) fn apply_insert(&self, id: DocumentId, doc: Document) -> CoreResult<()> {
        let indexes = self.indexes.write();
        self.check_unique(&indexes, &doc, None)?;
        self.store(&indexes, id, doc)
    }

    /// Returns the document with the given id.
    pub fn find_by_id(&self, id: &DocumentId) -> CoreResult<Document> {
        let _indexes = self.indexes.read();
        self.read_document(id)
    }

    /// Returns every document whose `field` equals `value`.
    ///
    /// With an index on `field` the results come back in posting-list
    /// order; without one the collection directory is scanned and the
    /// result order is unspecified.
    pub fn find_by_field(&self, field: &str, value: &Value) -> CoreResult<Vec<Document>> {
        let indexes = self.indexes.read();

        if let Some(index) = indexes.get(field) {
            let mut results = Vec::new();
            for id in index.lookup(value) {
                results.push(self.read_document(&id)?);
            }
            return Ok(results);
        }

        let mut results = Vec::new();
        for (_, doc) in self.scan()? {
            if doc.get(field) == Some(value) {
                results.push(doc);
            }
        }
        Ok(results)
    }

    /// Returns every document in the collection, in id order.
    pub fn all_documents(&self) -> CoreResult<Vec<Document>> {
        let _indexes = self.indexes.read();
        Ok(self.scan()?.into_iter().map(|(_, doc)| doc).collect())
    }

    /// Replaces the document stored under `id` with `replacement`.
    ///
    /// This is a full replacement, not a merge: fields absent from
    /// `replacement` are gone afterwards. The replacement's `_id` is
    /// forced to `id`. A uniquely indexed value may collide only with
    /// the target document itself.
    pub fn update(&self, id: &DocumentId, mut replacement: Document) -> CoreResult<()> {
        let indexes = self.indexes.write();

        let old = self.read_document(id)?;
        self.check_unique(&indexes, &replacement, Some(id))?;

        replacement.set_id(id.as_str());
        self.write_document(id, &replacement)?;

        for index in indexes.values() {
            let old_value = old.get(index.field());
            let new_value = replacement.get(index.field());
            if old_value == new_value {
                continue;
            }
            if let Some(value) = old_value {
                index.remove(id, value);
            }
            if let Some(value) = new_value {
                index.add(id, value)?;
            }
        }

        Ok(())
    }

    /// Deletes the document stored under `id`.
    pub fn delete(&self, id: &DocumentId) -> CoreResult<()> {
        let indexes = self.indexes.write();

        let old = self.read_document(id)?;
        dir::remove_durable(&self.document_path(id), self.sync_on_write)?;

        for index in indexes.values() {
            if let Some(value) = old.get(index.field()) {
                index.remove(id, value);
            }
        }

        Ok(())
    }

    /// Creates an index on `field`, building it from the documents
    /// already on disk.
    ///
    /// Fails with `IndexExists` if the field is already indexed, and
    /// with `UniqueViolation` if `unique` is requested but existing
    /// documents carry duplicate values; the index is left uncreated in
    /// that case.
    pub fn create_index(&self, field: &str, unique: bool) -> CoreResult<()> {
        if field.is_empty() {
            return Err(CoreError::invalid_argument("index field must not be empty"));
        }

        let mut indexes = self.indexes.write();
        if indexes.contains_key(field) {
            return Err(CoreError::IndexExists {
                field: field.to_string(),
            });
        }

        // Scan in id order so rebuilt posting lists equal the ones
        // incremental maintenance would have produced.
        let mut postings: HashMap<Value, Vec<DocumentId>> = HashMap::new();
        let mut documents = 0usize;
        for (id, doc) in self.scan()? {
            documents += 1;
            if let Some(value) = doc.get(field) {
                let ids = postings.entry(value.clone()).or_default();
                if unique && !ids.is_empty() {
                    return Err(CoreError::unique_violation(field));
                }
                ids.push(id);
            }
        }

        debug!(
            collection = %self.name,
            field,
            unique,
            documents,
            "index built"
        );
        indexes.insert(field.to_string(), Index::from_postings(field, unique, postings));
        Ok(())
    }

    /// Returns the names of indexed fields, sorted.
    #[must_use]
    pub fn index_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.indexes.read().keys().cloned().collect();
        fields.sort();
        fields
    }

    /// Verifies that `doc` breaks no unique constraint. `exclude` names
    /// a document the values may legitimately collide with (the update
    /// target). Runs before any I/O so failures leave no partial state.
    fn check_unique(
        &self,
        indexes: &IndexMap,
        doc: &Document,
        exclude: Option<&DocumentId>,
    ) -> CoreResult<()> {
        for index in indexes.values() {
            if let Some(value) = doc.get(index.field()) {
                if index.conflicts(value, exclude) {
                    return Err(CoreError::unique_violation(index.field()));
                }
            }
        }
        Ok(())
    }

    /// Writes the document file and posts its indexed values. Uniqueness
    /// must already have been validated.
    fn store(&self, indexes: &IndexMap, id: DocumentId, mut doc: Document) -> CoreResult<()> {
        doc.set_id(id.as_str());
        self.write_document(&id, &doc)?;

        for index in indexes.values() {
            if let Some(value) = doc.get(index.field()) {
                index.add(&id, value)?;
            }
        }
        Ok(())
    }

    fn document_path(&self, id: &DocumentId) -> PathBuf {
        self.path.join(format!("{id}.{DOC_EXT}"))
    }

    fn read_document(&self, id: &DocumentId) -> CoreResult<Document> {
        let bytes = match fs::read(self.document_path(id)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(CoreError::document_not_found(&self.name, id.as_str()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(foliodb_codec::from_slice(&bytes)?)
    }

    fn write_document(&self, id: &DocumentId, doc: &Document) -> CoreResult<()> {
        let bytes = foliodb_codec::to_vec(doc)?;
        dir::write_atomic(&self.document_path(id), &bytes, self.sync_on_write)?;
        Ok(())
    }

    /// Reads every document file, in lexicographic filename order.
    /// Because ids are fixed-width hex timestamps this is id order,
    /// which equals insertion order.
    fn scan(&self) -> CoreResult<Vec<(DocumentId, Document)>> {
        let mut stems = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOC_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();

        let mut documents = Vec::with_capacity(stems.len());
        for stem in stems {
            let id = DocumentId::new(stem);
            let doc = self.read_document(&id)?;
            documents.push((id, doc));
        }
        Ok(documents)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("indexes", &self.index_fields())
            .finish_non_exhaustive()
    }
}
