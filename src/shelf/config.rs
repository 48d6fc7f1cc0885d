use crate::error::ConfigError;
use crate::format::{Format, FormatRegistry};
use crate::validate::Validator;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Value of `db` that selects the in-memory store.
pub const MEMORY_DB: &str = ":memory:";

const DEFAULT_URL: &str = "localhost:8080";
const DEFAULT_WEB_ROOT: &str = "web";
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;
const NAME_PATTERN: &str = "^([A-Z][a-z]*)([ |-][A-Z][a-z]*)*$";

/// Server configuration, read from a JSON file. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShelfConfig {
    /// Address to listen on (e.g. "localhost:8080")
    pub url: String,

    /// Data directory of the file store, or ":memory:"
    pub db: String,

    /// Directory holding templates and static files
    pub web_root: PathBuf,

    /// Number of request worker threads
    pub workers: usize,

    /// How long shutdown waits for in-flight requests
    pub shutdown_timeout_secs: u64,

    pub formats: Vec<FormatSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatSpec {
    pub name: String,
    /// Field name to validator; `null` accepts anything
    pub fields: BTreeMap<String, Option<ValidatorSpec>>,
    #[serde(default)]
    pub searchable: BTreeSet<String>,
}

/// Declarative validator: `{"regex": "..."}`, `"year"` or `{"reference": "author"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorSpec {
    Regex(String),
    Year,
    Reference(String),
}

fn default_db() -> String {
    ProjectDirs::from("org", "shelf", "shelf")
        .map(|dirs| dirs.data_dir().to_string_lossy().into_owned())
        .unwrap_or_else(|| "shelf-data".to_string())
}

fn default_formats() -> Vec<FormatSpec> {
    let name = || Some(ValidatorSpec::Regex(NAME_PATTERN.to_string()));
    vec![
        FormatSpec {
            name: "author".to_string(),
            fields: BTreeMap::from([
                ("name".to_string(), name()),
                ("birthdate".to_string(), Some(ValidatorSpec::Year)),
                ("biography".to_string(), None),
            ]),
            searchable: BTreeSet::from(["name".to_string(), "biography".to_string()]),
        },
        FormatSpec {
            name: "book".to_string(),
            fields: BTreeMap::from([
                ("name".to_string(), name()),
                ("year".to_string(), Some(ValidatorSpec::Year)),
                (
                    "author".to_string(),
                    Some(ValidatorSpec::Reference("author".to_string())),
                ),
                ("synopsis".to_string(), None),
            ]),
            searchable: BTreeSet::from(["name".to_string(), "synopsis".to_string()]),
        },
    ]
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            db: default_db(),
            web_root: PathBuf::from(DEFAULT_WEB_ROOT),
            workers: DEFAULT_WORKERS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            formats: default_formats(),
        }
    }
}

impl ShelfConfig {
    /// Load config from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ShelfConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db == MEMORY_DB
    }

    /// Compiles the format definitions into a registry.
    ///
    /// Fails on invalid patterns, duplicate formats, reserved field names,
    /// undeclared searchable fields and references to formats that do not
    /// exist.
    pub fn build_registry(&self) -> Result<FormatRegistry, ConfigError> {
        let mut registry = FormatRegistry::new();
        for spec in &self.formats {
            registry.register(spec.build()?)?;
        }
        registry.check_references()?;
        Ok(registry)
    }
}

impl FormatSpec {
    fn build(&self) -> Result<Format, ConfigError> {
        let mut format = Format::new(&self.name);
        for (field, spec) in &self.fields {
            let validator = match spec {
                None => None,
                Some(ValidatorSpec::Year) => Some(Validator::Year),
                Some(ValidatorSpec::Reference(target)) => Some(Validator::reference(target)),
                Some(ValidatorSpec::Regex(pattern)) => {
                    Some(Validator::regex(pattern).map_err(|source| {
                        ConfigError::InvalidPattern {
                            field: format!("{}.{}", self.name, field),
                            source,
                        }
                    })?)
                }
            };
            format = format.field(field, validator);
        }
        format.searchable = self.searchable.clone();
        Ok(format)
    }
}
