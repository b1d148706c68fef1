//! Framework-agnostic client primitives.

pub mod auth;
pub mod cache;
pub mod debounce;
pub mod envelope;
pub mod filters;
pub mod mutations;
pub mod query_key;
pub mod scroll;
pub mod store;
pub mod ui;
