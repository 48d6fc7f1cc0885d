use super::helpers::{ensure_valid, format_for};
use crate::error::{Result, ShelfError};
use crate::format::FormatRegistry;
use crate::model::{merge_fields, FieldMap, ID_FIELD};
use crate::store::RecordStore;

/// Validates and replaces a stored record.
///
/// A submission that leaves out declared fields is completed from the stored
/// record, so a partial update never erases the fields it did not mention.
pub fn run(
    registry: &FormatRegistry,
    store: &RecordStore,
    format: &str,
    fields: FieldMap,
) -> Result<()> {
    let format = format_for(registry, format)?;
    ensure_valid(format, store, &fields)?;

    let fields = if format.covers(&fields) {
        fields
    } else {
        let id = fields
            .get(ID_FIELD)
            .ok_or(ShelfError::RecordDoesntHaveId)?;
        let stored = store.read_one(&format.name, id)?;
        merge_fields(fields, stored)
    };
    store.replace(&format.name, fields)
}
