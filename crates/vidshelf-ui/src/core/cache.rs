//! Paginated query cache keyed by [`QueryKey`].
//!
//! # Design
//! - Single-threaded: state lives in a `RefCell` and no borrow is held across
//!   an `.await`.
//! - Every fetch records the entry generation it was started for. Invalidation,
//!   cancellation and newer fetches bump the generation, so late results are
//!   dropped instead of overwriting fresher state.
//! - At most one fetch per key is in flight; a second caller receives the
//!   current entry instead of issuing a duplicate request.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use vidshelf_api_models::{Channel, PaginatedResult, Tag, Video};

use crate::core::envelope::{ApiError, Envelope};
use crate::core::query_key::{KeyPattern, QueryKey};

/// Lifecycle of a cached list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchStatus {
    /// Never fetched, or invalidated.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// Last fetch succeeded.
    Success,
    /// Last fetch failed.
    Error,
}

/// Cached pages for one key.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry<T> {
    /// Pages in load order.
    pub pages: Vec<PaginatedResult<T>>,
    /// Fetch lifecycle.
    pub status: FetchStatus,
    /// Error from the last failed fetch.
    pub error: Option<ApiError>,
    /// When the last page landed.
    pub updated_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            status: FetchStatus::Idle,
            error: None,
            updated_at: None,
            generation: 0,
        }
    }
}

impl<T> CacheEntry<T> {
    /// Items across every page, in order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.results.iter())
    }

    /// Number of pages held.
    #[must_use]
    pub const fn pages_loaded(&self) -> usize {
        self.pages.len()
    }

    /// Cursor of the next page, if the server advertised one.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.pages.last().and_then(|page| page.next.as_deref())
    }

    /// Whether another page can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_cursor().is_some()
    }

    /// Total reported by the first page.
    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        self.pages.first().map(|page| page.count)
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

/// Which page a fetcher should retrieve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// One-based page number being requested.
    pub page: usize,
    /// Absolute `next` URL from the previous page; `None` for the first page.
    pub cursor: Option<String>,
}

impl PageRequest {
    /// Request for the first page.
    #[must_use]
    pub const fn first() -> Self {
        Self {
            page: 1,
            cursor: None,
        }
    }
}

/// Result of a `load_more` call.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadMoreOutcome {
    /// A page was appended.
    Appended,
    /// The last page has no `next` cursor.
    Exhausted,
    /// Another fetch for the key is in flight.
    Busy,
    /// The key has no entry yet; run the initial query first.
    NotLoaded,
    /// The entry changed while the fetch was in flight; the page was dropped.
    Stale,
    /// The fetch failed; the entry keeps its pages and records the error.
    Failed(ApiError),
}

/// Entries captured before an optimistic write.
pub type Snapshot<T> = Vec<(QueryKey, CacheEntry<T>)>;

/// Items with a stable identity across pages and refetches.
pub trait CacheItem {
    /// Identity used to match an item between two versions of a list.
    fn item_id(&self) -> String;
}

impl CacheItem for Video {
    fn item_id(&self) -> String {
        self.id.clone()
    }
}

impl CacheItem for Channel {
    fn item_id(&self) -> String {
        self.id.clone()
    }
}

impl CacheItem for Tag {
    fn item_id(&self) -> String {
        self.id.to_string()
    }
}

/// One item changed by an optimistic write.
#[derive(Clone, Debug, PartialEq)]
enum ItemChange<T> {
    /// Item edited in place.
    Updated { before: T, after: T },
    /// Item dropped from a page.
    Removed { page: usize, index: usize, before: T },
}

/// Item-level record of an optimistic write under one key.
///
/// Optimistic writes only edit or remove items; they never insert.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemChanges<T> {
    key: QueryKey,
    generation: u64,
    changes: Vec<ItemChange<T>>,
}

impl<T> ItemChanges<T> {
    /// Key the changes were made under.
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Number of changed items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

fn diff_entry<T: Clone + CacheItem + PartialEq>(
    before: &CacheEntry<T>,
    after: &CacheEntry<T>,
) -> Vec<ItemChange<T>> {
    let mut changes = Vec::new();
    for (page_index, page) in before.pages.iter().enumerate() {
        let current: HashMap<String, &T> = after
            .pages
            .get(page_index)
            .map(|page| page.results.iter().map(|item| (item.item_id(), item)).collect())
            .unwrap_or_default();
        for (index, item) in page.results.iter().enumerate() {
            match current.get(&item.item_id()) {
                Some(now) if *now == item => {}
                Some(now) => changes.push(ItemChange::Updated {
                    before: item.clone(),
                    after: (*now).clone(),
                }),
                None => changes.push(ItemChange::Removed {
                    page: page_index,
                    index,
                    before: item.clone(),
                }),
            }
        }
    }
    changes
}

/// Undo recorded changes on one entry. Returns `false` when an item no longer
/// matches what the write left behind.
fn revert_entry<T: CacheItem + PartialEq>(
    entry: &mut CacheEntry<T>,
    changes: Vec<ItemChange<T>>,
) -> bool {
    let mut clean = true;
    for change in changes {
        match change {
            ItemChange::Updated { before, after } => {
                let id = after.item_id();
                match entry
                    .pages
                    .iter_mut()
                    .flat_map(|page| page.results.iter_mut())
                    .find(|item| item.item_id() == id)
                {
                    Some(item) if *item == after => *item = before,
                    _ => clean = false,
                }
            }
            ItemChange::Removed {
                page,
                index,
                before,
            } => {
                let id = before.item_id();
                if entry.items().any(|item| item.item_id() == id) {
                    clean = false;
                    continue;
                }
                let Some(target) = entry.pages.get_mut(page) else {
                    clean = false;
                    continue;
                };
                let at = index.min(target.results.len());
                target.results.insert(at, before);
                for page in &mut entry.pages {
                    page.count += 1;
                }
            }
        }
    }
    clean
}

/// Cache of paginated lists for one item type.
#[derive(Debug)]
pub struct QueryCache<T> {
    entries: RefCell<HashMap<QueryKey, CacheEntry<T>>>,
    generation: Cell<u64>,
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            generation: Cell::new(0),
        }
    }
}

impl<T: Clone> QueryCache<T> {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        next
    }

    /// Clone of the entry for a key.
    #[must_use]
    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry<T>> {
        self.entries.borrow().get(key).cloned()
    }

    /// Status for a key; absent keys read as idle.
    #[must_use]
    pub fn status(&self, key: &QueryKey) -> FetchStatus {
        self.entries
            .borrow()
            .get(key)
            .map_or(FetchStatus::Idle, |entry| entry.status)
    }

    /// Cached keys.
    #[must_use]
    pub fn keys(&self) -> Vec<QueryKey> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Ensure the first page for `key` is loaded.
    ///
    /// Fetches only when the key is absent, idle, or failed without any
    /// pages. While a fetch is in flight the current entry is returned as-is.
    pub async fn query<F, Fut>(&self, key: &QueryKey, fetch: F) -> CacheEntry<T>
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Envelope<PaginatedResult<T>>>,
    {
        let generation = {
            let mut entries = self.entries.borrow_mut();
            if let Some(entry) = entries.get(key) {
                let retry = match entry.status {
                    FetchStatus::Idle => true,
                    FetchStatus::Error => entry.pages.is_empty(),
                    FetchStatus::Loading => {
                        debug!(key = %key, "query already in flight");
                        false
                    }
                    FetchStatus::Success => false,
                };
                if !retry {
                    return entry.clone();
                }
            }
            let generation = self.next_generation();
            let entry = entries.entry(key.clone()).or_default();
            entry.status = FetchStatus::Loading;
            entry.error = None;
            entry.generation = generation;
            generation
        };

        debug!(key = %key, "fetching first page");
        let envelope = fetch(PageRequest::first()).await;

        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.get_mut(key) else {
            debug!(key = %key, "cache cleared while fetching; dropping result");
            return CacheEntry::default();
        };
        if entry.generation != generation {
            debug!(key = %key, "stale first page dropped");
            return entry.clone();
        }
        match envelope.into_result() {
            Ok(page) => {
                entry.pages = vec![page];
                entry.status = FetchStatus::Success;
                entry.updated_at = Some(Utc::now());
            }
            Err(error) => {
                warn!(key = %key, error = %error, "first page failed");
                entry.status = FetchStatus::Error;
                entry.error = Some(error);
            }
        }
        entry.clone()
    }

    /// Fetch the page after the last loaded one and append it.
    ///
    /// The page is appended only if nothing else touched the entry while the
    /// fetch was in flight, so pages always land in cursor order.
    pub async fn load_more<F, Fut>(&self, key: &QueryKey, fetch: F) -> LoadMoreOutcome
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Envelope<PaginatedResult<T>>>,
    {
        let (generation, request) = {
            let mut entries = self.entries.borrow_mut();
            let Some(entry) = entries.get_mut(key) else {
                return LoadMoreOutcome::NotLoaded;
            };
            if entry.status == FetchStatus::Loading {
                return LoadMoreOutcome::Busy;
            }
            if entry.pages.is_empty() {
                return LoadMoreOutcome::NotLoaded;
            }
            let Some(cursor) = entry.next_cursor().map(str::to_string) else {
                return LoadMoreOutcome::Exhausted;
            };
            let generation = self.next_generation();
            entry.status = FetchStatus::Loading;
            entry.error = None;
            entry.generation = generation;
            let request = PageRequest {
                page: entry.pages.len() + 1,
                cursor: Some(cursor),
            };
            (generation, request)
        };

        debug!(key = %key, page = request.page, "fetching next page");
        let envelope = fetch(request).await;

        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.get_mut(key) else {
            return LoadMoreOutcome::Stale;
        };
        if entry.generation != generation {
            debug!(key = %key, "stale page dropped");
            return LoadMoreOutcome::Stale;
        }
        match envelope.into_result() {
            Ok(page) => {
                entry.pages.push(page);
                entry.status = FetchStatus::Success;
                entry.updated_at = Some(Utc::now());
                LoadMoreOutcome::Appended
            }
            Err(error) => {
                warn!(key = %key, error = %error, "next page failed");
                entry.status = FetchStatus::Error;
                entry.error = Some(error.clone());
                LoadMoreOutcome::Failed(error)
            }
        }
    }

    /// Reset matching entries to idle so their next query refetches.
    ///
    /// Keys that were never cached stay absent. Returns how many entries were
    /// reset.
    pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut entries = self.entries.borrow_mut();
        let mut count = 0;
        for (key, entry) in entries.iter_mut().filter(|(key, _)| pattern.matches(key)) {
            debug!(key = %key, "invalidating");
            *entry = CacheEntry {
                generation: self.next_generation(),
                ..CacheEntry::default()
            };
            count += 1;
        }
        count
    }

    /// Abandon the in-flight fetch for a key; its result will be dropped.
    pub fn cancel(&self, key: &QueryKey) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        if entry.status != FetchStatus::Loading {
            return false;
        }
        debug!(key = %key, "cancelling in-flight fetch");
        entry.generation = self.next_generation();
        entry.status = if entry.pages.is_empty() {
            FetchStatus::Idle
        } else {
            FetchStatus::Success
        };
        true
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Mutate every cached item selected by `select` under matching keys.
    /// Returns how many items were touched.
    pub fn update_items(
        &self,
        pattern: &KeyPattern,
        select: impl Fn(&T) -> bool,
        mut update: impl FnMut(&mut T),
    ) -> usize {
        let mut entries = self.entries.borrow_mut();
        let mut count = 0;
        for (_, entry) in entries.iter_mut().filter(|(key, _)| pattern.matches(key)) {
            for item in entry
                .pages
                .iter_mut()
                .flat_map(|page| page.results.iter_mut())
                .filter(|item| select(item))
            {
                update(item);
                count += 1;
            }
        }
        count
    }

    /// First cached item selected by `select`, under any key.
    #[must_use]
    pub fn find_item(&self, select: impl Fn(&T) -> bool) -> Option<T> {
        self.entries
            .borrow()
            .values()
            .find_map(|entry| entry.items().find(|item| select(item)).cloned())
    }

    /// Remove cached items selected by `select` under matching keys, keeping
    /// page counts in step. Returns how many items were removed.
    pub fn remove_items(&self, pattern: &KeyPattern, select: impl Fn(&T) -> bool) -> usize {
        let mut entries = self.entries.borrow_mut();
        let mut removed = 0;
        for (_, entry) in entries.iter_mut().filter(|(key, _)| pattern.matches(key)) {
            let mut removed_here = 0_usize;
            for page in &mut entry.pages {
                let before = page.results.len();
                page.results.retain(|item| !select(item));
                removed_here += before - page.results.len();
            }
            for page in &mut entry.pages {
                page.count = page.count.saturating_sub(removed_here as u64);
            }
            removed += removed_here;
        }
        removed
    }
}

impl<T: Clone + CacheItem + PartialEq> QueryCache<T> {
    /// Copy entries matching any pattern, ahead of an optimistic write.
    #[must_use]
    pub fn capture(&self, patterns: &[KeyPattern]) -> Snapshot<T> {
        self.entries
            .borrow()
            .iter()
            .filter(|(key, _)| patterns.iter().any(|pattern| pattern.matches(key)))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Items that differ between a capture and the current entries.
    ///
    /// Keys without item changes are left out.
    #[must_use]
    pub fn changes_since(&self, snapshot: &Snapshot<T>) -> Vec<ItemChanges<T>> {
        let entries = self.entries.borrow();
        snapshot
            .iter()
            .filter_map(|(key, saved)| {
                let current = entries.get(key)?;
                let changes = diff_entry(saved, current);
                (!changes.is_empty()).then(|| ItemChanges {
                    key: key.clone(),
                    generation: saved.generation,
                    changes,
                })
            })
            .collect()
    }

    /// Undo recorded item changes, leaving every other item as it is now.
    ///
    /// An entry refetched or invalidated since the write, or one whose items
    /// were changed again by another writer, is reset to idle instead.
    /// Returns how many entries were reset.
    pub fn rollback(&self, recorded: Vec<ItemChanges<T>>) -> usize {
        let mut entries = self.entries.borrow_mut();
        let mut reset = 0;
        for changes in recorded {
            let Some(entry) = entries.get_mut(&changes.key) else {
                continue;
            };
            if entry.generation == changes.generation && revert_entry(entry, changes.changes) {
                continue;
            }
            debug!(key = %changes.key, "items changed since the write; resetting entry");
            *entry = CacheEntry {
                generation: self.next_generation(),
                ..CacheEntry::default()
            };
            reset += 1;
        }
        reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query_key::Resource;
    use std::cell::RefCell;
    use tokio::sync::oneshot;

    fn key() -> QueryKey {
        QueryKey::bare(Resource::Tags)
    }

    fn page(items: &[u32], next: Option<&str>) -> PaginatedResult<u32> {
        PaginatedResult {
            count: 100,
            next: next.map(str::to_string),
            previous: None,
            results: items.to_vec(),
        }
    }

    fn ok(page: PaginatedResult<u32>) -> Envelope<PaginatedResult<u32>> {
        Envelope::success(200, page)
    }

    fn unexpected(_: PageRequest) -> std::future::Ready<Envelope<PaginatedResult<u32>>> {
        panic!("unexpected fetch")
    }

    fn items(cache: &QueryCache<u32>) -> Vec<u32> {
        cache
            .get(&key())
            .map(|entry| entry.items().copied().collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn first_query_fetches_once_and_caches() {
        let cache = QueryCache::new();
        let calls = RefCell::new(Vec::new());
        let entry = cache
            .query(&key(), |request| {
                calls.borrow_mut().push(request);
                async { ok(page(&[1, 2], Some("http://api/tags/?page=2"))) }
            })
            .await;
        assert_eq!(entry.status, FetchStatus::Success);
        assert!(entry.has_more());

        let again = cache.query(&key(), unexpected).await;
        assert_eq!(again.pages_loaded(), 1);
        assert_eq!(calls.borrow().as_slice(), &[PageRequest::first()]);
    }

    #[tokio::test]
    async fn concurrent_queries_share_one_fetch() {
        let cache = QueryCache::new();
        let key = key();
        let (tx, rx) = oneshot::channel();
        let first = cache.query(&key, |_| async move { rx.await.unwrap() });
        let second = async {
            tokio::task::yield_now().await;
            let entry = cache.query(&key, unexpected).await;
            tx.send(ok(page(&[7], None))).unwrap();
            entry
        };
        let (first, second) = tokio::join!(first, second);
        assert_eq!(second.status, FetchStatus::Loading);
        assert_eq!(first.status, FetchStatus::Success);
        assert_eq!(items(&cache), vec![7]);
    }

    #[tokio::test]
    async fn pages_append_in_call_order() {
        let cache = QueryCache::new();
        cache
            .query(&key(), |_| async { ok(page(&[1], Some("c2"))) })
            .await;
        let seen = RefCell::new(Vec::new());
        for (cursor_next, value) in [(Some("c3"), 2), (Some("c4"), 3), (None, 4)] {
            let outcome = cache
                .load_more(&key(), |request| {
                    seen.borrow_mut().push(request.cursor.clone());
                    async move { ok(page(&[value], cursor_next)) }
                })
                .await;
            assert_eq!(outcome, LoadMoreOutcome::Appended);
        }
        assert_eq!(items(&cache), vec![1, 2, 3, 4]);
        assert_eq!(
            seen.into_inner(),
            vec![Some("c2".to_string()), Some("c3".to_string()), Some("c4".to_string())]
        );
        let done = cache.load_more(&key(), unexpected).await;
        assert_eq!(done, LoadMoreOutcome::Exhausted);
    }

    // Only one fetch per key runs at a time, so of three overlapping
    // load-more calls the later two are turned away as busy. Whatever order
    // the responses arrive in, pages can only be appended in request order.
    #[tokio::test]
    async fn overlapping_load_more_never_reorders_pages() {
        let cache = QueryCache::new();
        cache
            .query(&key(), |_| async { ok(page(&[1], Some("c2"))) })
            .await;
        let key = key();
        let (tx2, rx2) = oneshot::channel();
        let (tx3, rx3) = oneshot::channel::<Envelope<PaginatedResult<u32>>>();
        let (tx4, rx4) = oneshot::channel::<Envelope<PaginatedResult<u32>>>();

        let resolve_in_reverse = async {
            tokio::task::yield_now().await;
            let _ = tx4.send(ok(page(&[4], None)));
            let _ = tx3.send(ok(page(&[3], Some("c4"))));
            tx2.send(ok(page(&[2], Some("c3")))).unwrap();
        };
        let (second, third, fourth, ()) = tokio::join!(
            cache.load_more(&key, |_| async move { rx2.await.unwrap() }),
            cache.load_more(&key, |_| async move { rx3.await.unwrap() }),
            cache.load_more(&key, |_| async move { rx4.await.unwrap() }),
            resolve_in_reverse,
        );
        assert_eq!(second, LoadMoreOutcome::Appended);
        assert_eq!(third, LoadMoreOutcome::Busy);
        assert_eq!(fourth, LoadMoreOutcome::Busy);
        assert_eq!(items(&cache), vec![1, 2]);
        assert_eq!(cache.get(&key).unwrap().next_cursor(), Some("c3"));

        let third = cache
            .load_more(&key, |request| async move {
                assert_eq!(request.cursor.as_deref(), Some("c3"));
                ok(page(&[3], Some("c4")))
            })
            .await;
        let fourth = cache
            .load_more(&key, |_| async { ok(page(&[4], None)) })
            .await;
        assert_eq!((third, fourth), (LoadMoreOutcome::Appended, LoadMoreOutcome::Appended));
        assert_eq!(items(&cache), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn invalidation_drops_in_flight_results() {
        let cache = QueryCache::new();
        cache
            .query(&key(), |_| async { ok(page(&[1], Some("c2"))) })
            .await;
        let key = key();
        let (tx, rx) = oneshot::channel();
        let load = cache.load_more(&key, |_| async move { rx.await.unwrap() });
        let interrupt = async {
            tokio::task::yield_now().await;
            assert_eq!(cache.invalidate(&KeyPattern::Resource(Resource::Tags)), 1);
            tx.send(ok(page(&[2], None))).unwrap();
        };
        let (outcome, ()) = tokio::join!(load, interrupt);
        assert_eq!(outcome, LoadMoreOutcome::Stale);
        assert_eq!(cache.status(&key), FetchStatus::Idle);
        assert!(items(&cache).is_empty());
    }

    #[tokio::test]
    async fn failed_first_page_is_retried_on_next_query() {
        let cache: QueryCache<u32> = QueryCache::new();
        let failed = cache
            .query(&key(), |_| async {
                Envelope::failure(Some(503), ApiError::Network {
                    status: Some(503),
                    message: "unavailable".to_string(),
                })
            })
            .await;
        assert_eq!(failed.status, FetchStatus::Error);
        assert!(failed.error.is_some());
        let retried = cache
            .query(&key(), |_| async { ok(page(&[9], None)) })
            .await;
        assert_eq!(retried.status, FetchStatus::Success);
        assert_eq!(retried.error, None);
    }

    #[tokio::test]
    async fn load_more_failure_keeps_pages() {
        let cache = QueryCache::new();
        cache
            .query(&key(), |_| async { ok(page(&[1], Some("c2"))) })
            .await;
        let outcome = cache
            .load_more(&key(), |_| async {
                Envelope::failure(None, ApiError::Network {
                    status: None,
                    message: "offline".to_string(),
                })
            })
            .await;
        assert!(matches!(outcome, LoadMoreOutcome::Failed(_)));
        let entry = cache.get(&key()).unwrap();
        assert_eq!(entry.status, FetchStatus::Error);
        assert_eq!(entry.pages_loaded(), 1);
        assert!(entry.has_more());
    }

    #[test]
    fn invalidate_without_entries_is_a_no_op() {
        let cache: QueryCache<u32> = QueryCache::new();
        assert_eq!(cache.invalidate(&KeyPattern::All), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn cancel_discards_late_result() {
        let cache = QueryCache::new();
        let key = key();
        let (tx, rx) = oneshot::channel();
        let load = cache.query(&key, |_| async move { rx.await.unwrap() });
        let interrupt = async {
            tokio::task::yield_now().await;
            assert!(cache.cancel(&key));
            tx.send(ok(page(&[1], None))).unwrap();
        };
        let (entry, ()) = tokio::join!(load, interrupt);
        assert_eq!(entry.status, FetchStatus::Idle);
        assert!(entry.pages.is_empty());
        assert!(!cache.cancel(&key));
    }

    impl CacheItem for u32 {
        fn item_id(&self) -> String {
            (self % 10).to_string()
        }
    }

    #[tokio::test]
    async fn rollback_is_exact_without_other_writers() {
        let cache = QueryCache::new();
        cache
            .query(&key(), |_| async { ok(page(&[1, 2, 3], None)) })
            .await;
        let before = cache.get(&key()).unwrap();
        let snapshot = cache.capture(&[KeyPattern::All]);
        cache.update_items(&KeyPattern::All, |item| *item == 2, |item| *item = 12);
        assert_eq!(cache.remove_items(&KeyPattern::All, |item| *item == 3), 1);
        assert_eq!(items(&cache), vec![1, 12]);
        assert_eq!(cache.get(&key()).unwrap().total_count(), Some(99));
        let changes = cache.changes_since(&snapshot);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].len(), 2);
        assert_eq!(cache.rollback(changes), 0);
        assert_eq!(cache.get(&key()).unwrap(), before);
    }

    #[tokio::test]
    async fn rollback_keeps_items_changed_by_other_writes() {
        let cache = QueryCache::new();
        cache
            .query(&key(), |_| async { ok(page(&[1, 2, 3], None)) })
            .await;
        let first = cache.capture(&[KeyPattern::All]);
        cache.update_items(&KeyPattern::All, |item| *item == 1, |item| *item = 11);
        let first = cache.changes_since(&first);
        let second = cache.capture(&[KeyPattern::All]);
        cache.update_items(&KeyPattern::All, |item| *item == 2, |item| *item = 12);
        let second = cache.changes_since(&second);
        assert_eq!(second[0].len(), 1);

        assert_eq!(cache.rollback(first), 0);
        assert_eq!(items(&cache), vec![1, 12, 3]);
    }

    #[tokio::test]
    async fn rollback_resets_when_the_item_moved_on() {
        let cache = QueryCache::new();
        cache
            .query(&key(), |_| async { ok(page(&[1, 2], None)) })
            .await;
        let snapshot = cache.capture(&[KeyPattern::All]);
        cache.update_items(&KeyPattern::All, |item| *item == 1, |item| *item = 11);
        let changes = cache.changes_since(&snapshot);
        cache.update_items(&KeyPattern::All, |item| *item == 11, |item| *item = 21);
        assert_eq!(cache.rollback(changes), 1);
        assert_eq!(cache.status(&key()), FetchStatus::Idle);
        assert!(items(&cache).is_empty());
    }

    #[tokio::test]
    async fn rollback_after_refetch_resets_instead() {
        let cache = QueryCache::new();
        cache
            .query(&key(), |_| async { ok(page(&[1], Some("c2"))) })
            .await;
        let snapshot = cache.capture(&[KeyPattern::All]);
        cache.update_items(&KeyPattern::All, |item| *item == 1, |item| *item = 11);
        let changes = cache.changes_since(&snapshot);
        cache.invalidate(&KeyPattern::All);
        cache
            .query(&key(), |_| async { ok(page(&[1], None)) })
            .await;
        assert_eq!(cache.rollback(changes), 1);
        assert_eq!(cache.status(&key()), FetchStatus::Idle);
    }
}
