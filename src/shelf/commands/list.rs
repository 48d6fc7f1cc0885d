use super::helpers::format_for;
use crate::error::Result;
use crate::format::FormatRegistry;
use crate::model::FieldMap;
use crate::store::RecordStore;

/// Every record of the format, ordered by id.
pub fn run(
    registry: &FormatRegistry,
    store: &RecordStore,
    format: &str,
) -> Result<Vec<FieldMap>> {
    let format = format_for(registry, format)?;
    store.read_all(&format.name)
}
