//! # Web Layer
//!
//! The HTTP face of shelf, built on `tiny_http` with a fixed pool of worker
//! threads.
//!
//! - [`content`]: templates and static files read from the web root
//! - [`dispatch`]: request to operation mapping, status codes and rendering,
//!   kept free of sockets so it can be tested directly
//! - [`Server`]: listener, worker pool and graceful shutdown
//!
//! ## Routes
//!
//! | Request                      | Operation        |
//! |------------------------------|------------------|
//! | `GET /{path}`                | list records     |
//! | `GET /{path}?_search=terms`  | search records   |
//! | `GET /{path}?id=...`         | get one record   |
//! | `POST /{path}`               | create record    |
//! | `POST /{path}` with `id`     | update record    |
//!
//! `{path}` is either a template path (rendered as HTML for the template's
//! format) or a bare format name (answered with JSON).

pub mod content;
pub mod dispatch;
mod server;

pub use content::WebContent;
pub use server::{Server, MAX_BODY_BYTES};
