//! Record formats and the registry that owns them.
//!
//! A format name is used three ways: as the registry key, as the store
//! collection name, and as the file stem that ties a template to a format.

use crate::error::ConfigError;
use crate::model::{FieldMap, Failures, ID_FIELD};
use crate::store::DOCUMENT_ID;
use crate::validate::{RecordLookup, Validation, Validator};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct Format {
    pub name: String,
    pub fields: BTreeMap<String, Option<Validator>>,
    pub searchable: BTreeSet<String>,
}

impl Format {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            searchable: BTreeSet::new(),
        }
    }

    pub fn field(mut self, name: &str, validator: Option<Validator>) -> Self {
        self.fields.insert(name.to_string(), validator);
        self
    }

    pub fn searchable_field(mut self, name: &str, validator: Option<Validator>) -> Self {
        self.searchable.insert(name.to_string());
        self.field(name, validator)
    }

    /// Validates every submitted field except the id.
    ///
    /// Fields the format does not declare fail with "not a field of format".
    /// Declared fields without a validator always pass.
    pub fn validate(&self, ctx: &dyn RecordLookup, fields: &FieldMap) -> Failures {
        let mut failed = Failures::new();
        for (name, value) in fields {
            if name == ID_FIELD {
                continue;
            }
            match self.fields.get(name) {
                None => {
                    failed.insert(
                        name.clone(),
                        format!("not a field of format '{}'", self.name),
                    );
                }
                Some(Some(validator)) => {
                    if let Validation::Invalid(reason) = validator.validate(ctx, value) {
                        failed.insert(name.clone(), reason);
                    }
                }
                Some(None) => {}
            }
        }
        failed
    }

    /// True when every declared field is present in `fields`.
    pub fn covers(&self, fields: &FieldMap) -> bool {
        self.fields.keys().all(|name| fields.contains_key(name))
    }

    /// True when the searchable fields are exactly `fields`.
    pub fn searchable_are(&self, fields: &BTreeSet<String>) -> bool {
        &self.searchable == fields
    }
}

/// Names a format may not declare: the record id, the store's document id
/// and anything starting with `_`, which the web layer treats as control keys.
fn is_reserved(field: &str) -> bool {
    field == ID_FIELD || field == DOCUMENT_ID || field.starts_with('_')
}

/// Formats by name. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, Format>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, format: Format) -> Result<&mut Self, ConfigError> {
        if self.formats.contains_key(&format.name) {
            return Err(ConfigError::DuplicateFormat(format.name));
        }
        if let Some(field) = format.fields.keys().find(|f| is_reserved(f)) {
            return Err(ConfigError::ReservedField {
                format: format.name.clone(),
                field: field.clone(),
            });
        }
        if let Some(field) = format
            .searchable
            .iter()
            .find(|f| !format.fields.contains_key(*f))
        {
            return Err(ConfigError::UnknownSearchable {
                format: format.name.clone(),
                field: field.clone(),
            });
        }
        self.formats.insert(format.name.clone(), format);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Format> {
        self.formats.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Format> {
        self.formats.values()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Checks that every reference validator points at a registered format.
    pub fn check_references(&self) -> Result<(), ConfigError> {
        for format in self.formats.values() {
            for (field, validator) in &format.fields {
                if let Some(Validator::Reference(target)) = validator {
                    if !self.formats.contains_key(target) {
                        return Err(ConfigError::UnknownReference {
                            field: format!("{}.{}", format.name, field),
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
