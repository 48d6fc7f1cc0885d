use crate::error::{Result, ShelfError};
use crate::format::{Format, FormatRegistry};
use crate::model::FieldMap;
use crate::store::RecordStore;
use tracing::debug;

pub fn format_for<'a>(registry: &'a FormatRegistry, name: &str) -> Result<&'a Format> {
    registry
        .get(name)
        .ok_or_else(|| ShelfError::FormatNotFound(name.to_string()))
}

/// Runs the format's validators, failing with every rejected field at once.
pub fn ensure_valid(format: &Format, store: &RecordStore, fields: &FieldMap) -> Result<()> {
    let failed = format.validate(store, fields);
    if failed.is_empty() {
        Ok(())
    } else {
        debug!(format = %format.name, failed = failed.len(), "validation failed");
        Err(ShelfError::ValidationFailed(failed))
    }
}
