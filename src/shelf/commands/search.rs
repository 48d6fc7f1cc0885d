use super::helpers::format_for;
use crate::error::Result;
use crate::format::FormatRegistry;
use crate::model::FieldMap;
use crate::store::RecordStore;

/// Text search over the format's searchable fields, best matches first.
pub fn run(
    registry: &FormatRegistry,
    store: &RecordStore,
    format: &str,
    query: &str,
) -> Result<Vec<FieldMap>> {
    let format = format_for(registry, format)?;
    store.search(&format.name, query)
}
