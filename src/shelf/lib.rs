//! # Shelf Architecture
//!
//! Shelf serves HTML forms and lists for records of a few named formats
//! ("author", "book", ...), validates what people submit and keeps the
//! records in a document store. The HTTP server is one client of a record
//! library; nothing below `web/` knows about requests or templates.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Web Layer (web/, wired by main.rs)                         │
//! │  - tiny_http workers, request -> operation mapping          │
//! │  - minijinja templates, JSON, static files, status codes    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - RecordService: thin facade over commands                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Validation policy, partial update merge                  │
//! │  - Formats and validators (format.rs, validate.rs)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - RecordStore adapter, text index reconciliation           │
//! │  - DocumentStore trait: FileStore, InMemoryStore            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Formats
//!
//! A format is a set of field names, each with an optional [`validate::Validator`],
//! and the subset of fields covered by text search. Formats come from
//! [`config::ShelfConfig`] and are fixed once the server starts. The format
//! name doubles as the collection name in the store and as the file stem of
//! the templates that render it.
//!
//! ## Testing Strategy
//!
//! 1. **Commands** (`commands/*.rs`): operation logic against the in-memory
//!    store, through `store::memory::fixtures::ServiceFixture`.
//! 2. **Store** (`store/`): backends, text search and index reconciliation.
//! 3. **Web** (`web/`): request mapping and status codes as pure functions;
//!    `tests/` drives a live server over TCP.
//!
//! ## Module Overview
//!
//! - [`api`]: The record service facade
//! - [`commands`]: Logic of each record operation
//! - [`format`]: Formats and the format registry
//! - [`validate`]: Field validators
//! - [`store`]: Record store adapter and document backends
//! - [`model`]: Field maps and failures
//! - [`config`]: Configuration file and built-in formats
//! - [`web`]: HTTP server, dispatch and web content
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod store;
pub mod validate;
pub mod web;

pub use api::RecordService;
