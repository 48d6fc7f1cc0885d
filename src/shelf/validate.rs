//! Field validators.
//!
//! A [`Validator`] classifies a submitted value as [`Validation::Valid`] or
//! [`Validation::Invalid`] with a reason meant for the person filling the form.
//! Fields without a validator accept anything, which formats express as
//! `Option::None`.

use crate::error::Result;
use crate::model::FieldMap;
use regex::Regex;
use std::fmt;

/// Read access to stored records, used by [`Validator::Reference`].
pub trait RecordLookup {
    fn lookup(&self, format: &str, id: &str) -> Result<FieldMap>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

#[derive(Clone)]
pub enum Validator {
    /// Value must contain a match of the pattern.
    Regex(Regex),
    /// Value must be a non-negative integer.
    Year,
    /// Value must be the id of a stored record of the named format.
    Reference(String),
}

impl Validator {
    /// Compiles `pattern` into a regex validator.
    pub fn regex(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Regex::new(pattern).map(Validator::Regex)
    }

    pub fn reference(format: impl Into<String>) -> Self {
        Validator::Reference(format.into())
    }

    pub fn validate(&self, ctx: &dyn RecordLookup, value: &str) -> Validation {
        match self {
            Validator::Regex(re) => {
                if re.is_match(value) {
                    Validation::Valid
                } else {
                    Validation::Invalid("doesn't match regular expression".to_string())
                }
            }
            Validator::Year => match value.parse::<i64>() {
                Ok(year) if year >= 0 => Validation::Valid,
                _ => Validation::Invalid("not a valid year number".to_string()),
            },
            Validator::Reference(format) => match ctx.lookup(format, value) {
                Ok(_) => Validation::Valid,
                Err(_) => Validation::Invalid(format!(
                    "record of format '{}' and ID '{}' not found",
                    format, value
                )),
            },
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Regex(re) => write!(f, "Regex({:?})", re.as_str()),
            Validator::Year => write!(f, "Year"),
            Validator::Reference(format) => write!(f, "Reference({:?})", format),
        }
    }
}
