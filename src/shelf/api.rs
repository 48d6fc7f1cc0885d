//! # API Facade
//!
//! [`RecordService`] is the single entry point for record operations. The web
//! dispatcher, the fixtures and any future client talk to it; it forwards
//! each call to the matching `commands::<op>::run` with the registry and
//! store it owns.
//!
//! The facade does no validation and no I/O of its own. It returns
//! structured results and the [`ShelfError`](crate::error::ShelfError)
//! taxonomy, leaving presentation (HTML, JSON, status codes) to the caller.
//!
//! ## Testing Strategy
//!
//! Operation logic is tested in `commands/*.rs`. Tests here only check that
//! the facade reaches the right command and that the service can be shared
//! between threads.

use crate::commands;
use crate::error::Result;
use crate::format::FormatRegistry;
use crate::model::FieldMap;
use crate::store::RecordStore;
use std::sync::Arc;

/// Validating record service over a [`RecordStore`].
///
/// Shared between request workers behind an `Arc`; every method takes `&self`.
pub struct RecordService {
    registry: Arc<FormatRegistry>,
    store: RecordStore,
}

impl RecordService {
    pub fn new(registry: Arc<FormatRegistry>, store: RecordStore) -> Self {
        Self { registry, store }
    }

    /// Validates and stores a new record; returns the generated id.
    pub fn add_record(&self, format: &str, fields: FieldMap) -> Result<String> {
        commands::add::run(&self.registry, &self.store, format, fields)
    }

    /// Validates and replaces a record, completing partial submissions from
    /// the stored record.
    pub fn update_record(&self, format: &str, fields: FieldMap) -> Result<()> {
        commands::update::run(&self.registry, &self.store, format, fields)
    }

    pub fn get_record(&self, format: &str, id: &str) -> Result<FieldMap> {
        commands::get::run(&self.registry, &self.store, format, id)
    }

    pub fn list_records(&self, format: &str) -> Result<Vec<FieldMap>> {
        commands::list::run(&self.registry, &self.store, format)
    }

    pub fn search_records(&self, format: &str, query: &str) -> Result<Vec<FieldMap>> {
        commands::search::run(&self.registry, &self.store, format, query)
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Flushes and releases the underlying store.
    pub fn close(&self) -> Result<()> {
        self.store.close()
    }
}
