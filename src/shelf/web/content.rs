//! Templates and static files served by the web layer.
//!
//! Everything under the web root is read once at startup:
//!
//! ```text
//! web/
//! ├── index.html          -> /index (also served for /)
//! ├── style.css           -> /style.css
//! ├── author.jinja        -> /author        (template of format "author")
//! └── edit/book.jinja     -> /edit/book     (template of format "book")
//! ```
//!
//! A template's file stem names the format it renders. Templates whose stem
//! is not a registered format are skipped.

use crate::error::WebError;
use crate::format::FormatRegistry;
use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const TEMPLATE_EXT: &str = "jinja";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub content: Vec<u8>,
    pub content_type: &'static str,
}

pub struct WebContent {
    env: Environment<'static>,
    /// URL path of each template to the format it renders.
    templates: BTreeMap<String, String>,
    statics: BTreeMap<String, StaticFile>,
}

impl Default for WebContent {
    fn default() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        Self {
            env,
            templates: BTreeMap::new(),
            statics: BTreeMap::new(),
        }
    }
}

impl WebContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the web root. A missing root yields empty content, leaving
    /// only the JSON routes.
    pub fn load(root: &Path, registry: &FormatRegistry) -> Result<Self, WebError> {
        let mut content = Self::new();
        if !root.is_dir() {
            warn!(root = %root.display(), "web root not found, serving JSON only");
            return Ok(content);
        }
        content.load_dir(root, "", registry)?;
        info!(
            root = %root.display(),
            templates = content.templates.len(),
            files = content.statics.len(),
            "loaded web content"
        );
        Ok(content)
    }

    fn load_dir(
        &mut self,
        dir: &Path,
        prefix: &str,
        registry: &FormatRegistry,
    ) -> Result<(), WebError> {
        let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let url = format!("{}/{}", prefix, name);
            if path.is_dir() {
                self.load_dir(&path, &url, registry)?;
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            let keyed = format!("{}/{}", prefix, stem);
            match ext {
                TEMPLATE_EXT => {
                    if !registry.contains(stem) {
                        warn!(template = %url, "no format named '{}', skipping template", stem);
                        continue;
                    }
                    let source = fs::read_to_string(&path)?;
                    self.add_template(&keyed, stem, source)?;
                }
                "html" | "htm" => {
                    self.add_static(&keyed, fs::read(&path)?, "text/html; charset=utf-8")
                }
                _ => self.add_static(&url, fs::read(&path)?, content_type_for(ext)),
            }
        }
        Ok(())
    }

    /// Registers a template served at `path` for records of `format`.
    pub fn add_template(
        &mut self,
        path: &str,
        format: &str,
        source: String,
    ) -> Result<(), WebError> {
        self.env
            .add_template_owned(path.to_string(), source)
            .map_err(|source| WebError::Template {
                name: path.to_string(),
                source,
            })?;
        self.templates.insert(path.to_string(), format.to_string());
        debug!(path, format, "registered template");
        Ok(())
    }

    pub fn add_static(&mut self, path: &str, content: Vec<u8>, content_type: &'static str) {
        self.statics.insert(
            path.to_string(),
            StaticFile {
                content,
                content_type,
            },
        );
    }

    /// The format rendered by the template at `path`.
    pub fn template_format(&self, path: &str) -> Option<&str> {
        self.templates.get(path).map(String::as_str)
    }

    pub fn static_file(&self, path: &str) -> Option<&StaticFile> {
        self.statics.get(path)
    }

    pub fn render<S: Serialize>(&self, path: &str, ctx: S) -> Result<String, WebError> {
        let to_err = |source| WebError::Template {
            name: path.to_string(),
            source,
        };
        self.env
            .get_template(path)
            .map_err(to_err)?
            .render(ctx)
            .map_err(to_err)
    }
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
