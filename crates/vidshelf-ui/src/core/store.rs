//! App-wide cache store: one query cache slice per resource type.
//!
//! # Design
//! - Keep every cached list in one store so invalidation and logout reach all of it.
//! - Slices are `Rc`-shared so scroll controllers can hold their own handle.

use std::rc::Rc;

use tracing::info;
use vidshelf_api_models::{Channel, Tag, Video};
use vidshelf_events::Signal;

use crate::core::cache::{ItemChanges, QueryCache};
use crate::core::query_key::{KeyPattern, QueryKey};

/// Cached lists for the whole client.
#[derive(Debug, Default)]
pub struct GalleryCache {
    /// Video gallery lists.
    pub videos: Rc<QueryCache<Video>>,
    /// Subscribed and available channel lists.
    pub channels: Rc<QueryCache<Channel>>,
    /// Tag catalogue lists.
    pub tags: Rc<QueryCache<Tag>>,
}

/// Item changes recorded across every slice by one optimistic write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheChanges {
    videos: Vec<ItemChanges<Video>>,
    channels: Vec<ItemChanges<Channel>>,
    tags: Vec<ItemChanges<Tag>>,
}

impl CacheChanges {
    /// Number of entries with changed items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.videos.len() + self.channels.len() + self.tags.len()
    }

    /// Whether the write changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.videos
            .iter()
            .map(ItemChanges::key)
            .chain(self.channels.iter().map(ItemChanges::key))
            .chain(self.tags.iter().map(ItemChanges::key))
    }
}

impl GalleryCache {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every entry selected by any pattern. Returns the number reset.
    pub fn invalidate(&self, patterns: &[KeyPattern]) -> usize {
        patterns
            .iter()
            .map(|pattern| {
                self.videos.invalidate(pattern)
                    + self.channels.invalidate(pattern)
                    + self.tags.invalidate(pattern)
            })
            .sum()
    }

    /// Drop every cached list.
    pub fn clear(&self) {
        self.videos.clear();
        self.channels.clear();
        self.tags.clear();
    }

    /// Run an optimistic write and record which items it changed under keys
    /// selected by any pattern.
    pub fn apply_tracked(
        &self,
        patterns: &[KeyPattern],
        apply: impl FnOnce(&Self),
    ) -> CacheChanges {
        let videos = self.videos.capture(patterns);
        let channels = self.channels.capture(patterns);
        let tags = self.tags.capture(patterns);
        apply(self);
        CacheChanges {
            videos: self.videos.changes_since(&videos),
            channels: self.channels.changes_since(&channels),
            tags: self.tags.changes_since(&tags),
        }
    }

    /// Undo a recorded write item by item. Returns how many entries had to be
    /// reset because they no longer matched the write.
    pub fn rollback(&self, changes: CacheChanges) -> usize {
        self.videos.rollback(changes.videos)
            + self.channels.rollback(changes.channels)
            + self.tags.rollback(changes.tags)
    }

    /// Reset every entry a recorded write changed, so the next read refetches.
    pub fn reset_changed(&self, changes: &CacheChanges) -> usize {
        let patterns: Vec<KeyPattern> = changes.keys().cloned().map(KeyPattern::Exact).collect();
        self.invalidate(&patterns)
    }

    /// React to a bus signal. Returns `true` when the cache changed.
    pub fn handle_signal(&self, signal: &Signal) -> bool {
        match signal {
            Signal::CacheClear { reason } => {
                info!(%reason, "clearing query cache");
                self.clear();
                true
            }
            Signal::AuthRequired { .. } | Signal::ReauthRequired { .. } => false,
        }
    }
}
