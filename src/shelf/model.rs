use std::collections::BTreeMap;

/// Reserved field carrying a record's identifier.
pub const ID_FIELD: &str = "id";

/// A record as seen above the store: field name to string value, with the
/// identifier under [`ID_FIELD`].
pub type FieldMap = BTreeMap<String, String>;

/// Per-field validation failures: field name to human readable reason.
/// Non-empty means the submission was rejected.
pub type Failures = BTreeMap<String, String>;

/// Separates the id from the rest of the fields.
pub fn split_id(mut fields: FieldMap) -> (Option<String>, FieldMap) {
    let id = fields.remove(ID_FIELD);
    (id, fields)
}

/// Fills the fields missing from `incoming` with the values in `stored`.
///
/// Incoming values win. The id is kept from whichever map has one,
/// preferring `incoming`.
pub fn merge_fields(incoming: FieldMap, stored: FieldMap) -> FieldMap {
    let mut merged = stored;
    merged.extend(incoming);
    merged
}
