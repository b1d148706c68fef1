//! Persisted UI preferences.
//!
//! Preferences are read once at startup. Storage goes through
//! [`KeyValueStorage`] so the same logic runs against browser local storage in
//! the wasm build and an in-memory map everywhere else.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::core::ui::ScrollMode;

/// Storage key for the infinite-scroll mode.
pub const SCROLL_MODE_KEY: &str = "vidshelf.scroll_mode";

/// Minimal string key/value store.
pub trait KeyValueStorage {
    /// Stored value, if any.
    fn get(&self, key: &str) -> Option<String>;
    /// Store a value. Failures are logged by the implementation.
    fn set(&self, key: &str, value: &str);
    /// Remove a value.
    fn delete(&self, key: &str);
}

/// Process-local storage used by native builds and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn delete(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

/// Browser `localStorage`.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

#[cfg(target_arch = "wasm32")]
impl KeyValueStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        use gloo::storage::{LocalStorage, Storage};
        LocalStorage::get::<String>(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        use gloo::storage::{LocalStorage, Storage};
        if let Err(err) = LocalStorage::set(key, value) {
            tracing::error!(key, error = %err, "failed to persist preference");
        }
    }

    fn delete(&self, key: &str) {
        use gloo::storage::{LocalStorage, Storage};
        LocalStorage::delete(key);
    }
}

/// Stored scroll mode, defaulting to [`ScrollMode::Auto`].
#[must_use]
pub fn load_scroll_mode(storage: &dyn KeyValueStorage) -> ScrollMode {
    storage
        .get(SCROLL_MODE_KEY)
        .and_then(|value| ScrollMode::parse(&value))
        .unwrap_or_default()
}

/// Persist the scroll mode.
pub fn persist_scroll_mode(storage: &dyn KeyValueStorage, mode: ScrollMode) {
    storage.set(SCROLL_MODE_KEY, mode.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_mode_defaults_and_persists() {
        let storage = MemoryStorage::new();
        assert_eq!(load_scroll_mode(&storage), ScrollMode::Auto);
        persist_scroll_mode(&storage, ScrollMode::Manual);
        assert_eq!(load_scroll_mode(&storage), ScrollMode::Manual);
        storage.set(SCROLL_MODE_KEY, "bogus");
        assert_eq!(load_scroll_mode(&storage), ScrollMode::Auto);
        storage.delete(SCROLL_MODE_KEY);
        assert_eq!(storage.get(SCROLL_MODE_KEY), None);
    }
}
