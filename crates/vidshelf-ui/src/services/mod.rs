//! Network services: the transport seam and the typed API client.

pub mod api;
#[cfg(target_arch = "wasm32")]
pub mod http;
pub mod transport;
