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
//! Process-wide signal bus for the Vidshelf client.
//!
//! Layout: payloads.rs (signal types), routing.rs (bus + streams), topics.rs (kind helpers).
//!
//! The network layer publishes signals (auth required, re-authentication
//! required, cache clear) and UI collaborators subscribe to them. The bus is an
//! explicit value handed to whoever needs it; there is no ambient dispatcher.

pub mod payloads;
pub mod routing;
pub mod topics;

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Signal, SignalEnvelope, SignalId};
pub use routing::{SignalBus, SignalStream};
pub use topics::signal_kind;
