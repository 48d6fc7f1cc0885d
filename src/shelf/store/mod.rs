//! # Storage Layer
//!
//! Records live in a document store, one collection per format. The layer has
//! two levels:
//!
//! - [`DocumentStore`]: the raw document database. It knows collections,
//!   documents keyed by `_id`, text indexes and text search, and nothing about
//!   formats or validation.
//! - [`RecordStore`]: the adapter the record service talks to. It translates
//!   field maps (with `id`) to documents (with `_id`), classifies failures
//!   into [`ShelfError`] variants and reconciles text indexes with the
//!   formats' searchable fields at startup.
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: production storage, one JSON file per collection.
//! - [`memory::InMemoryStore`]: no persistence; tests and `--dbds :memory:`.
//!
//! ## Storage Format
//!
//! For `FileStore`:
//! ```text
//! <data dir>/
//! ├── author.json     # {"documents": {"<id>": {...}}, "text_index": {...}}
//! └── book.json
//! ```

use crate::error::{Result, ShelfError, StoreError};
use crate::format::FormatRegistry;
use crate::model::{split_id, FieldMap, ID_FIELD};
use crate::validate::RecordLookup;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

pub mod collection;
pub mod fs;
pub mod memory;
pub mod text;

pub use text::TextIndex;

/// Key under which backends keep a document's id.
pub const DOCUMENT_ID: &str = "_id";

/// A stored document: string fields plus `_id` once stored.
pub type Document = BTreeMap<String, String>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Abstract document database.
///
/// Implementations are shared between request threads, so every method
/// takes `&self` and the store guards its own state.
pub trait DocumentStore: Send + Sync {
    /// Inserts a document, generating its `_id` if absent. Returns the id.
    fn insert_one(&self, collection: &str, doc: Document) -> StoreResult<String>;

    /// Finds a document by id.
    fn find_one(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Every document of the collection, ordered by id.
    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Replaces the fields of the document with the given id.
    /// Returns the number of matched documents (0 or 1).
    fn replace_one(&self, collection: &str, id: &str, doc: Document) -> StoreResult<u64>;

    /// Text search over the collection's text index.
    fn text_search(&self, collection: &str, query: &str) -> StoreResult<Vec<Document>>;

    /// The collection's text index, if it has one.
    fn text_index(&self, collection: &str) -> StoreResult<Option<TextIndex>>;

    fn create_text_index(
        &self,
        collection: &str,
        fields: &BTreeSet<String>,
    ) -> StoreResult<TextIndex>;

    fn drop_index(&self, collection: &str, name: &str) -> StoreResult<()>;

    /// Flushes pending state and releases resources.
    fn close(&self) -> StoreResult<()>;
}

/// What [`RecordStore::initialize_indexes`] did, by collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub created: Vec<String>,
    pub recreated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl IndexReport {
    /// True when no index was created or dropped.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.recreated.is_empty()
    }
}

/// Record-level adapter over a [`DocumentStore`].
pub struct RecordStore {
    backend: Arc<dyn DocumentStore>,
    collections: BTreeSet<String>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self {
            backend,
            collections: BTreeSet::new(),
        }
    }

    /// Makes every format's text index match its searchable fields, and
    /// registers the formats' collections.
    ///
    /// A missing index is created; an index over different fields is dropped
    /// and recreated; a matching index is left alone.
    pub fn initialize_indexes(&mut self, registry: &FormatRegistry) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        for format in registry.iter() {
            let name = format.name.as_str();
            match self.backend.text_index(name)? {
                Some(index) if format.searchable_are(&index.fields) => {
                    debug!(collection = name, index = %index.name, "text index up to date");
                    report.unchanged.push(name.to_string());
                }
                Some(index) => {
                    self.backend.drop_index(name, &index.name)?;
                    let created = self.backend.create_text_index(name, &format.searchable)?;
                    info!(collection = name, index = %created.name, "updated text index");
                    report.recreated.push(name.to_string());
                }
                None => {
                    let created = self.backend.create_text_index(name, &format.searchable)?;
                    info!(collection = name, index = %created.name, "created text index");
                    report.created.push(name.to_string());
                }
            }
            self.collections.insert(name.to_string());
        }
        Ok(report)
    }

    fn collection<'a>(&self, format: &'a str) -> Result<&'a str> {
        if self.collections.contains(format) {
            Ok(format)
        } else {
            Err(ShelfError::FormatNotFound(format.to_string()))
        }
    }

    pub fn create(&self, format: &str, fields: FieldMap) -> Result<String> {
        if fields.contains_key(ID_FIELD) {
            return Err(ShelfError::RecordHasId);
        }
        let collection = self.collection(format)?;
        let id = self.backend.insert_one(collection, fields)?;
        debug!(collection, %id, "inserted record");
        Ok(id)
    }

    pub fn replace(&self, format: &str, fields: FieldMap) -> Result<()> {
        let (id, fields) = split_id(fields);
        let id = id.ok_or(ShelfError::RecordDoesntHaveId)?;
        let collection = self.collection(format)?;
        match self.backend.replace_one(collection, &id, fields)? {
            0 => Err(ShelfError::RecordNotFound(id)),
            _ => {
                debug!(collection, %id, "replaced record");
                Ok(())
            }
        }
    }

    pub fn read_one(&self, format: &str, id: &str) -> Result<FieldMap> {
        let collection = self.collection(format)?;
        self.backend
            .find_one(collection, id)?
            .map(document_to_record)
            .ok_or_else(|| ShelfError::RecordNotFound(id.to_string()))
    }

    pub fn read_all(&self, format: &str) -> Result<Vec<FieldMap>> {
        let collection = self.collection(format)?;
        let docs = self.backend.find_all(collection)?;
        Ok(docs.into_iter().map(document_to_record).collect())
    }

    pub fn search(&self, format: &str, query: &str) -> Result<Vec<FieldMap>> {
        let collection = self.collection(format)?;
        let docs = self.backend.text_search(collection, query)?;
        Ok(docs.into_iter().map(document_to_record).collect())
    }

    pub fn close(&self) -> Result<()> {
        self.backend.close()?;
        Ok(())
    }
}

impl RecordLookup for RecordStore {
    fn lookup(&self, format: &str, id: &str) -> Result<FieldMap> {
        self.read_one(format, id)
    }
}

/// Renames the backend `_id` key to `id`.
fn document_to_record(mut doc: Document) -> FieldMap {
    if let Some(id) = doc.remove(DOCUMENT_ID) {
        doc.insert(ID_FIELD.to_string(), id);
    }
    doc
}
