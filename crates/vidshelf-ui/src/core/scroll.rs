//! Bounded memory of scroll positions per filter.

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use crate::core::query_key::QueryKey;

/// Where the user was in one filtered list.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollPositionRecord {
    /// Signature of the list's query key.
    pub filter_signature: String,
    /// Pixel offset from the top.
    pub scroll_offset: f64,
    /// Pages that were loaded when the user left.
    pub pages_loaded: usize,
    /// When the position was recorded.
    pub saved_at: DateTime<Utc>,
}

/// Scroll positions keyed by filter signature, oldest evicted first.
#[derive(Debug)]
pub struct ScrollPositionStore {
    capacity: usize,
    records: RefCell<IndexMap<String, ScrollPositionRecord>>,
}

impl ScrollPositionStore {
    /// Store holding at most `capacity` records (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: RefCell::new(IndexMap::new()),
        }
    }

    /// Record a position, replacing any earlier one for the same key.
    pub fn save(&self, key: &QueryKey, scroll_offset: f64, pages_loaded: usize) -> ScrollPositionRecord {
        let record = ScrollPositionRecord {
            filter_signature: key.signature(),
            scroll_offset: scroll_offset.max(0.0),
            pages_loaded,
            saved_at: Utc::now(),
        };
        let mut records = self.records.borrow_mut();
        records.shift_remove(&record.filter_signature);
        records.insert(record.filter_signature.clone(), record.clone());
        while records.len() > self.capacity {
            if let Some((evicted, _)) = records.shift_remove_index(0) {
                debug!(signature = %evicted, "evicting scroll position");
            }
        }
        record
    }

    /// Recorded position for a key.
    #[must_use]
    pub fn get(&self, key: &QueryKey) -> Option<ScrollPositionRecord> {
        self.records.borrow().get(&key.signature()).cloned()
    }

    /// Forget the position for a key.
    pub fn remove(&self, key: &QueryKey) -> Option<ScrollPositionRecord> {
        self.records.borrow_mut().shift_remove(&key.signature())
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Whether no record is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::{FilterState, Scope};

    fn key(search: &str) -> QueryKey {
        let mut state = FilterState::new(Scope::Subscribed);
        state.set_search(search);
        QueryKey::for_channels(&state, None)
    }

    #[test]
    fn oldest_record_is_evicted_at_capacity() {
        let store = ScrollPositionStore::new(2);
        store.save(&key("a"), 10.0, 1);
        store.save(&key("b"), 20.0, 2);
        store.save(&key("a"), 15.0, 3);
        store.save(&key("c"), 30.0, 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(&key("b")).is_none());
        assert_eq!(store.get(&key("a")).map(|record| record.pages_loaded), Some(3));
        assert!(store.get(&key("c")).is_some());
    }

    #[test]
    fn negative_offsets_clamp_to_top() {
        let store = ScrollPositionStore::new(0);
        let record = store.save(&key("x"), -5.0, 1);
        assert!(record.scroll_offset.abs() < f64::EPSILON);
        assert_eq!(store.remove(&key("x")), Some(record));
        assert!(store.is_empty());
    }
}
