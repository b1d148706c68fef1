#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::future_not_send)]
//! Vidshelf gallery client core.
//!
//! Filter state codecs, the response envelope, the paginated query cache, the
//! optimistic mutation engine and the infinite-scroll controller. Everything
//! here is DOM-free so it runs (and is tested) natively; the browser transport
//! and local storage bindings are compiled for `wasm32` only.

pub mod app;
pub mod core;
pub mod features;
pub mod services;

pub use app::GalleryContext;
