//! Baseline configuration values.
//!
//! # Design
//! - Keep every default in one place so the loader and docs agree.

/// API origin used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
/// Items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 24;
/// Largest page size the backend accepts.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Scroll records kept before the oldest is evicted.
pub const DEFAULT_SCROLL_STORE_CAPACITY: usize = 50;
/// Quiet period before a search keystroke is written to the URL.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
/// Native transport request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming a JSON config file.
pub const ENV_CONFIG_FILE: &str = "VIDSHELF_CONFIG";
/// Environment variable overriding the API origin.
pub const ENV_API_URL: &str = "VIDSHELF_API_URL";
/// Environment variable carrying the API token.
pub const ENV_API_KEY: &str = "VIDSHELF_API_KEY";
/// Environment variable overriding the page size.
pub const ENV_PAGE_SIZE: &str = "VIDSHELF_PAGE_SIZE";
/// Environment variable overriding the scroll store capacity.
pub const ENV_SCROLL_CAPACITY: &str = "VIDSHELF_SCROLL_CAPACITY";
/// Environment variable overriding the search debounce.
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "VIDSHELF_SEARCH_DEBOUNCE_MS";
/// Environment variable overriding the request timeout.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "VIDSHELF_REQUEST_TIMEOUT_SECS";
