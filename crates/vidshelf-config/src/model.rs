//! Typed configuration model.

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SCROLL_STORE_CAPACITY, DEFAULT_SEARCH_DEBOUNCE_MS,
};

/// Effective client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API origin, e.g. `https://gallery.example.org`.
    pub api_base_url: String,
    /// Optional API token sent with every request.
    pub api_key: Option<String>,
    /// Items requested per page.
    pub page_size: u32,
    /// Scroll records retained before eviction.
    pub scroll_store_capacity: usize,
    /// Search debounce window in milliseconds.
    pub search_debounce_ms: u64,
    /// Request timeout for the native transport, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            scroll_store_capacity: DEFAULT_SCROLL_STORE_CAPACITY,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Overlay the fields present in `patch`.
    pub fn apply(&mut self, patch: ClientConfigPatch) {
        if let Some(url) = patch.api_base_url {
            self.api_base_url = url;
        }
        if let Some(key) = patch.api_key {
            self.api_key = if key.trim().is_empty() {
                None
            } else {
                Some(key)
            };
        }
        if let Some(size) = patch.page_size {
            self.page_size = size;
        }
        if let Some(capacity) = patch.scroll_store_capacity {
            self.scroll_store_capacity = capacity;
        }
        if let Some(debounce) = patch.search_debounce_ms {
            self.search_debounce_ms = debounce;
        }
        if let Some(timeout) = patch.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

/// Partial configuration as read from a file or the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfigPatch {
    /// API origin override.
    pub api_base_url: Option<String>,
    /// API token override; an empty string clears it.
    pub api_key: Option<String>,
    /// Page size override.
    pub page_size: Option<u32>,
    /// Scroll store capacity override.
    pub scroll_store_capacity: Option<usize>,
    /// Search debounce override.
    pub search_debounce_ms: Option<u64>,
    /// Request timeout override.
    pub request_timeout_secs: Option<u64>,
}
