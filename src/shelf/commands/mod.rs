//! Record operations, one module per operation.
//!
//! Each `run` takes the format registry and the record store explicitly and
//! returns plain Rust values. Validation policy and the merge of partial
//! updates live here; persistence lives in [`crate::store`].

pub mod add;
pub mod get;
pub mod helpers;
pub mod list;
pub mod search;
pub mod update;
