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

//! Client configuration for the Vidshelf gallery.
//!
//! Layout: `model.rs` (typed config + file patch), `defaults.rs` (baseline
//! values), `loader.rs` (defaults, file, environment layering), `validate.rs`
//! (range and URL checks), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use model::{ClientConfig, ClientConfigPatch};
pub use validate::validate;
