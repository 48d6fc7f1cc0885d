//! Request dispatch, independent of the HTTP server.
//!
//! [`handle`] turns a method, URL and body into a [`Reply`]. It picks a
//! route (template, JSON or static file), maps the method and submitted
//! values to an [`Operation`], runs it against the [`RecordService`] and
//! renders the [`Outcome`] or error.

use super::content::{StaticFile, WebContent};
use crate::error::ShelfError;
use crate::model::{Failures, FieldMap, ID_FIELD};
use crate::RecordService;
use serde::Serialize;
use std::collections::btree_map::Entry;
use tiny_http::Method;
use tracing::error;

/// Query key that turns a list into a search.
pub const SEARCH_KEY: &str = "_search";

const JSON: &str = "application/json";
const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    List,
    Search(String),
    Get(String),
    Create(FieldMap),
    Update(FieldMap),
}

impl Operation {
    /// Maps a request to an operation. `None` for methods other than GET and POST.
    pub fn from_request(method: &Method, values: &FieldMap) -> Option<Self> {
        let id = values.get(ID_FIELD);
        match method {
            Method::Get => Some(match (id, values.get(SEARCH_KEY)) {
                (Some(id), _) => Operation::Get(id.clone()),
                (None, Some(query)) => Operation::Search(query.clone()),
                (None, None) => Operation::List,
            }),
            Method::Post => {
                let fields = record_fields(values);
                Some(match id {
                    Some(_) => Operation::Update(fields),
                    None => Operation::Create(fields),
                })
            }
            _ => None,
        }
    }
}

/// What a successful (or validly rejected) operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Records {
        records: Vec<FieldMap>,
        search: Option<String>,
    },
    Record(FieldMap),
    Created {
        id: String,
        record: FieldMap,
    },
    Updated(FieldMap),
    Invalid {
        failures: Failures,
        record: FieldMap,
    },
}

/// A response ready to be written by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, JSON, value.to_string())
    }

    fn error_json(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }
}

/// Collects the submitted values: query parameters first, form fields
/// override them. Only the first value of a repeated key counts.
pub fn submitted_values(query: Option<&str>, form: &[u8]) -> FieldMap {
    let mut values = first_values(url::form_urlencoded::parse(query.unwrap_or("").as_bytes()));
    values.extend(first_values(url::form_urlencoded::parse(form)));
    values
}

fn first_values<'a>(
    pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> FieldMap {
    let mut values = FieldMap::new();
    for (key, value) in pairs {
        if let Entry::Vacant(slot) = values.entry(key.into_owned()) {
            slot.insert(value.into_owned());
        }
    }
    values
}

/// Submitted values minus control keys (those starting with `_`).
pub fn record_fields(values: &FieldMap) -> FieldMap {
    values
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub fn status_for(err: &ShelfError) -> u16 {
    match err {
        ShelfError::FormatNotFound(_) | ShelfError::RecordNotFound(_) => 404,
        ShelfError::RecordHasId | ShelfError::RecordDoesntHaveId => 400,
        ShelfError::ValidationFailed(_) => 200,
        ShelfError::Internal(_) => 500,
    }
}

/// Runs an operation. Validation failures become [`Outcome::Invalid`]
/// carrying the submitted record.
pub fn execute(
    service: &RecordService,
    format: &str,
    op: Operation,
) -> Result<Outcome, ShelfError> {
    match op {
        Operation::List => service.list_records(format).map(|records| Outcome::Records {
            records,
            search: None,
        }),
        Operation::Search(query) => {
            let records = service.search_records(format, &query)?;
            Ok(Outcome::Records {
                records,
                search: Some(query),
            })
        }
        Operation::Get(id) => service.get_record(format, &id).map(Outcome::Record),
        Operation::Create(fields) => {
            let submitted = fields.clone();
            match service.add_record(format, fields) {
                Ok(id) => {
                    let mut record = submitted;
                    record.insert(ID_FIELD.to_string(), id.clone());
                    Ok(Outcome::Created { id, record })
                }
                Err(ShelfError::ValidationFailed(failures)) => Ok(Outcome::Invalid {
                    failures,
                    record: submitted,
                }),
                Err(e) => Err(e),
            }
        }
        Operation::Update(fields) => {
            let id = fields.get(ID_FIELD).cloned();
            let submitted = fields.clone();
            match service.update_record(format, fields) {
                Ok(()) => {
                    let id = id.ok_or(ShelfError::RecordDoesntHaveId)?;
                    service.get_record(format, &id).map(Outcome::Updated)
                }
                Err(ShelfError::ValidationFailed(failures)) => Ok(Outcome::Invalid {
                    failures,
                    record: submitted,
                }),
                Err(e) => Err(e),
            }
        }
    }
}

/// Template context. Absent values render as `none`.
#[derive(Serialize)]
struct Page<'a> {
    format: &'a str,
    record: Option<&'a FieldMap>,
    records: Option<&'a [FieldMap]>,
    search: Option<&'a str>,
    failures: Option<&'a Failures>,
    success: bool,
    id: Option<&'a str>,
}

impl<'a> Page<'a> {
    fn new(format: &'a str, outcome: &'a Outcome) -> Self {
        let mut page = Page {
            format,
            record: None,
            records: None,
            search: None,
            failures: None,
            success: false,
            id: None,
        };
        match outcome {
            Outcome::Records { records, search } => {
                page.records = Some(records);
                page.search = search.as_deref();
            }
            Outcome::Record(record) => page.record = Some(record),
            Outcome::Created { id, record } => {
                page.record = Some(record);
                page.id = Some(id);
                page.success = true;
            }
            Outcome::Updated(record) => {
                page.record = Some(record);
                page.success = true;
            }
            Outcome::Invalid { failures, record } => {
                page.record = Some(record);
                page.failures = Some(failures);
            }
        }
        page
    }
}

fn json_for(outcome: &Outcome) -> serde_json::Value {
    match outcome {
        Outcome::Records { records, .. } => serde_json::json!(records),
        Outcome::Record(record) | Outcome::Updated(record) => serde_json::json!(record),
        Outcome::Created { id, .. } => serde_json::json!({ "id": id }),
        Outcome::Invalid { failures, record } => {
            serde_json::json!({ "failures": failures, "record": record })
        }
    }
}

enum Route<'a> {
    Template { path: String, format: &'a str },
    Json { format: String },
    Static(&'a StaticFile),
    NotFound,
}

fn route<'a>(service: &RecordService, content: &'a WebContent, path: &str) -> Route<'a> {
    let path = if path == "/" { "/index" } else { path };
    if let Some(format) = content.template_format(path) {
        return Route::Template {
            path: path.to_string(),
            format,
        };
    }
    if let Some(name) = path.strip_prefix('/') {
        if service.formats().contains(name) {
            return Route::Json {
                format: name.to_string(),
            };
        }
    }
    match content.static_file(path) {
        Some(file) => Route::Static(file),
        None => Route::NotFound,
    }
}

/// Serves one request.
pub fn handle(
    service: &RecordService,
    content: &WebContent,
    method: &Method,
    url: &str,
    body: &[u8],
) -> Reply {
    let parsed = match url::Url::parse(&format!("http://localhost{url}")) {
        Ok(u) => u,
        Err(_) => return Reply::new(400, TEXT, "bad request"),
    };
    let values = submitted_values(parsed.query(), body);
    let Some(op) = Operation::from_request(method, &values) else {
        return Reply::new(405, TEXT, "method not allowed");
    };

    match route(service, content, parsed.path()) {
        Route::Template { path, format } => match execute(service, format, op) {
            Ok(outcome) => render(content, &path, format, &outcome),
            Err(e) => Reply::new(status_for(&e), TEXT, e.to_string()),
        },
        Route::Json { format } => match execute(service, &format, op) {
            Ok(outcome) => Reply::json(200, &json_for(&outcome)),
            Err(e) => Reply::error_json(status_for(&e), &e.to_string()),
        },
        Route::Static(file) => Reply::new(200, file.content_type, file.content.clone()),
        Route::NotFound => Reply::new(404, TEXT, "not found"),
    }
}

fn render(content: &WebContent, path: &str, format: &str, outcome: &Outcome) -> Reply {
    match content.render(path, Page::new(format, outcome)) {
        Ok(html) => Reply::new(200, HTML, html),
        Err(e) => {
            error!(template = path, error = %e, "template rendering failed");
            Reply::new(500, TEXT, "template error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::ServiceFixture;

    fn map(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn json_body(reply: &Reply) -> serde_json::Value {
        assert_eq!(reply.content_type, JSON);
        serde_json::from_slice(&reply.body).unwrap()
    }

    #[test]
    fn form_values_override_query_values() {
        let values = submitted_values(Some("name=Query&year=1949"), b"name=Form+Value");
        assert_eq!(values, map(&[("name", "Form Value"), ("year", "1949")]));
    }

    #[test]
    fn first_value_of_repeated_key_wins() {
        let values = submitted_values(Some("a=1&a=2"), b"b=x&b=y");
        assert_eq!(values, map(&[("a", "1"), ("b", "x")]));
    }

    #[test]
    fn get_maps_to_list_search_or_get() {
        assert_eq!(
            Operation::from_request(&Method::Get, &map(&[])),
            Some(Operation::List)
        );
        assert_eq!(
            Operation::from_request(&Method::Get, &map(&[("_search", "farm")])),
            Some(Operation::Search("farm".into()))
        );
        assert_eq!(
            Operation::from_request(&Method::Get, &map(&[("id", "7"), ("_search", "farm")])),
            Some(Operation::Get("7".into()))
        );
    }

    #[test]
    fn post_maps_to_create_or_update_without_control_keys() {
        assert_eq!(
            Operation::from_request(&Method::Post, &map(&[("name", "A"), ("_search", "x")])),
            Some(Operation::Create(map(&[("name", "A")])))
        );
        assert_eq!(
            Operation::from_request(&Method::Post, &map(&[("id", "7"), ("name", "A")])),
            Some(Operation::Update(map(&[("id", "7"), ("name", "A")])))
        );
    }

    #[test]
    fn other_methods_have_no_operation() {
        assert_eq!(Operation::from_request(&Method::Delete, &map(&[])), None);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(&ShelfError::FormatNotFound("x".into())), 404);
        assert_eq!(status_for(&ShelfError::RecordNotFound("x".into())), 404);
        assert_eq!(status_for(&ShelfError::RecordHasId), 400);
        assert_eq!(status_for(&ShelfError::RecordDoesntHaveId), 400);
        assert_eq!(status_for(&ShelfError::ValidationFailed(Failures::new())), 200);
        assert_eq!(
            status_for(&ShelfError::Internal(
                crate::error::StoreError::NoTextIndex("book".into())
            )),
            500
        );
    }

    #[test]
    fn json_list_and_get() {
        let fx = ServiceFixture::new();
        let content = WebContent::new();

        let reply = handle(&fx.service, &content, &Method::Get, "/author", b"");
        assert_eq!(reply.status, 200);
        assert_eq!(json_body(&reply).as_array().unwrap().len(), 2);

        let url = format!("/author?id={}", fx.authors[1]);
        let reply = handle(&fx.service, &content, &Method::Get, &url, b"");
        assert_eq!(json_body(&reply)["name"], "George Orwell");
    }

    #[test]
    fn json_search() {
        let fx = ServiceFixture::new();
        let reply = handle(
            &fx.service,
            &WebContent::new(),
            &Method::Get,
            "/book?_search=fable",
            b"",
        );
        let found = json_body(&reply);
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["name"], "Animal Farm");
    }

    #[test]
    fn json_create_returns_id() {
        let fx = ServiceFixture::empty();
        let reply = handle(
            &fx.service,
            &WebContent::new(),
            &Method::Post,
            "/author",
            b"name=George+Orwell&birthdate=1903",
        );
        assert_eq!(reply.status, 200);
        let id = json_body(&reply)["id"].as_str().unwrap().to_string();
        assert_eq!(
            fx.service.get_record("author", &id).unwrap()["name"],
            "George Orwell"
        );
    }

    #[test]
    fn json_validation_failure_is_200_with_failures() {
        let fx = ServiceFixture::empty();
        let reply = handle(
            &fx.service,
            &WebContent::new(),
            &Method::Post,
            "/author",
            b"name=george+orwell&birthdate=1903",
        );
        assert_eq!(reply.status, 200);
        let body = json_body(&reply);
        assert_eq!(body["failures"]["name"], "doesn't match regular expression");
        assert_eq!(body["record"]["name"], "george orwell");
        assert_eq!(fx.backend.count("author"), 0);
    }

    #[test]
    fn json_update_returns_stored_record() {
        let fx = ServiceFixture::new();
        let body = format!("id={}&biography=Essayist", fx.authors[1]);
        let reply = handle(
            &fx.service,
            &WebContent::new(),
            &Method::Post,
            "/author",
            body.as_bytes(),
        );
        let stored = json_body(&reply);
        assert_eq!(stored["biography"], "Essayist");
        assert_eq!(stored["birthdate"], "1903");
    }

    #[test]
    fn error_statuses() {
        let fx = ServiceFixture::new();
        let content = WebContent::new();
        let missing = handle(&fx.service, &content, &Method::Get, "/author?id=nope", b"");
        assert_eq!(missing.status, 404);
        assert!(json_body(&missing)["error"].is_string());

        let update_missing = handle(&fx.service, &content, &Method::Post, "/author", b"id=");
        assert_eq!(update_missing.status, 404);

        let unknown = handle(&fx.service, &content, &Method::Get, "/magazine", b"");
        assert_eq!(unknown.status, 404);

        let put = handle(&fx.service, &content, &Method::Put, "/author", b"");
        assert_eq!(put.status, 405);
    }

    #[test]
    fn template_routes_render_html() {
        let fx = ServiceFixture::new();
        let mut content = WebContent::new();
        content
            .add_template(
                "/list/book",
                "book",
                "{% for b in records %}[{{ b.name }}]{% endfor %}".to_string(),
            )
            .unwrap();
        content
            .add_template(
                "/edit/author",
                "author",
                "{% if failures %}{{ failures.name }}{% elif success %}saved {{ id }}{% endif %}"
                    .to_string(),
            )
            .unwrap();

        let reply = handle(&fx.service, &content, &Method::Get, "/list/book?_search=novel", b"");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, HTML);
        let html = String::from_utf8(reply.body).unwrap();
        assert!(html.contains("[Kafka On The Shore]"));
        assert!(!html.contains("Animal Farm"));

        let reply = handle(
            &fx.service,
            &content,
            &Method::Post,
            "/edit/author",
            b"name=lowercase",
        );
        assert_eq!(
            String::from_utf8(reply.body).unwrap(),
            "doesn&#x27;t match regular expression"
        );

        let reply = handle(
            &fx.service,
            &content,
            &Method::Post,
            "/edit/author",
            b"name=Jane+Austen",
        );
        assert!(String::from_utf8(reply.body).unwrap().starts_with("saved "));
    }

    #[test]
    fn template_errors_use_plain_status() {
        let fx = ServiceFixture::new();
        let mut content = WebContent::new();
        content
            .add_template("/author", "author", "{{ record.name }}".to_string())
            .unwrap();
        let reply = handle(&fx.service, &content, &Method::Get, "/author?id=nope", b"");
        assert_eq!(reply.status, 404);
        assert_eq!(reply.content_type, TEXT);
    }

    #[test]
    fn root_serves_index_then_static_files() {
        let fx = ServiceFixture::empty();
        let mut content = WebContent::new();
        content.add_static("/index", b"<h1>Shelf</h1>".to_vec(), HTML);
        content.add_static("/style.css", b"body {}".to_vec(), "text/css; charset=utf-8");

        let reply = handle(&fx.service, &content, &Method::Get, "/", b"");
        assert_eq!(reply.body, b"<h1>Shelf</h1>");
        let reply = handle(&fx.service, &content, &Method::Get, "/style.css", b"");
        assert_eq!(reply.content_type, "text/css; charset=utf-8");
        let reply = handle(&fx.service, &content, &Method::Get, "/missing.css", b"");
        assert_eq!(reply.status, 404);
    }
}
