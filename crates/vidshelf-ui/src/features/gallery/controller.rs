//! Infinite-scroll controller.
//!
//! # Design
//! - Binds one active query key to the cache and the scroll position store.
//! - The viewport sentinel and the "load more" button share one in-flight slot;
//!   whichever fires first wins and the other is suppressed until it settles.
//! - Switching filters cancels the previous key's fetch so its result is dropped.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use tracing::debug;
use vidshelf_api_models::PaginatedResult;

use crate::core::cache::{CacheEntry, LoadMoreOutcome, PageRequest, QueryCache};
use crate::core::envelope::{ApiError, Envelope};
use crate::core::query_key::QueryKey;
use crate::core::scroll::{ScrollPositionRecord, ScrollPositionStore};
use crate::core::ui::ScrollMode;

/// What asked for the next page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// The sentinel element scrolled into view.
    Sentinel,
    /// The user pressed "load more".
    Manual,
    /// Pages are being reloaded to restore a scroll position.
    Restore,
}

/// Result of a sentinel or button trigger.
#[derive(Clone, Debug, PartialEq)]
pub enum TriggerOutcome {
    /// The cache ran `load_more`.
    Loaded(LoadMoreOutcome),
    /// Another trigger is still in flight.
    Suppressed(Trigger),
    /// The sentinel is inert in manual mode.
    Disabled,
    /// No list is active.
    Inactive,
}

/// Result of re-entering a list.
#[derive(Clone, Debug, PartialEq)]
pub enum RestoreOutcome {
    /// No saved position; start at the top.
    Fresh,
    /// Enough pages are loaded; scroll to `scroll_offset`.
    Restored {
        /// Saved pixel offset.
        scroll_offset: f64,
        /// Pages now loaded.
        pages_loaded: usize,
    },
    /// Fewer pages than saved could be loaded; the offset is not applied.
    Incomplete {
        /// Pages now loaded.
        pages_loaded: usize,
        /// Failure that stopped the reload, if any.
        error: Option<ApiError>,
    },
    /// The first page failed.
    Failed(ApiError),
}

/// Drives paging for one list at a time.
#[derive(Debug)]
pub struct InfiniteScroll<T> {
    cache: Rc<QueryCache<T>>,
    positions: Rc<ScrollPositionStore>,
    mode: Cell<ScrollMode>,
    active: RefCell<Option<QueryKey>>,
    in_flight: Cell<Option<(Trigger, u64)>>,
    tickets: Cell<u64>,
}

impl<T: Clone> InfiniteScroll<T> {
    /// Controller over a cache slice and the shared position store.
    #[must_use]
    pub fn new(cache: Rc<QueryCache<T>>, positions: Rc<ScrollPositionStore>, mode: ScrollMode) -> Self {
        Self {
            cache,
            positions,
            mode: Cell::new(mode),
            active: RefCell::new(None),
            in_flight: Cell::new(None),
            tickets: Cell::new(0),
        }
    }

    /// Current scroll mode.
    #[must_use]
    pub fn mode(&self) -> ScrollMode {
        self.mode.get()
    }

    /// Change the scroll mode.
    pub fn set_mode(&self, mode: ScrollMode) {
        self.mode.set(mode);
    }

    /// Key of the list being shown.
    #[must_use]
    pub fn active_key(&self) -> Option<QueryKey> {
        self.active.borrow().clone()
    }

    /// Cached entry for the active list.
    #[must_use]
    pub fn entry(&self) -> Option<CacheEntry<T>> {
        self.active_key().and_then(|key| self.cache.get(&key))
    }

    /// Trigger currently in flight.
    #[must_use]
    pub fn busy_with(&self) -> Option<Trigger> {
        self.in_flight.get().map(|(trigger, _)| trigger)
    }

    /// Make `key` the active list. Returns `false` when it already was.
    ///
    /// Any fetch in flight for the previous key is cancelled.
    pub fn switch_to(&self, key: QueryKey) -> bool {
        let previous = self.active.replace(Some(key.clone()));
        if previous.as_ref() == Some(&key) {
            return false;
        }
        if let Some(previous) = previous {
            debug!(from = %previous, to = %key, "switching list");
            self.cache.cancel(&previous);
        }
        self.in_flight.set(None);
        true
    }

    /// Load the first page of the active list.
    pub async fn load_first<F, Fut>(&self, fetch: F) -> Option<CacheEntry<T>>
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Envelope<PaginatedResult<T>>>,
    {
        let key = self.active_key()?;
        Some(self.cache.query(&key, fetch).await)
    }

    /// The sentinel became visible.
    pub async fn on_sentinel_visible<F, Fut>(&self, fetch: F) -> TriggerOutcome
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Envelope<PaginatedResult<T>>>,
    {
        if self.mode.get() == ScrollMode::Manual {
            return TriggerOutcome::Disabled;
        }
        self.trigger(Trigger::Sentinel, fetch).await
    }

    /// The "load more" button was pressed.
    pub async fn on_load_more_clicked<F, Fut>(&self, fetch: F) -> TriggerOutcome
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Envelope<PaginatedResult<T>>>,
    {
        self.trigger(Trigger::Manual, fetch).await
    }

    fn begin(&self, trigger: Trigger) -> Result<u64, Trigger> {
        if let Some((busy, _)) = self.in_flight.get() {
            return Err(busy);
        }
        let ticket = self.tickets.get() + 1;
        self.tickets.set(ticket);
        self.in_flight.set(Some((trigger, ticket)));
        Ok(ticket)
    }

    fn finish(&self, ticket: u64) {
        if matches!(self.in_flight.get(), Some((_, current)) if current == ticket) {
            self.in_flight.set(None);
        }
    }

    async fn trigger<F, Fut>(&self, trigger: Trigger, fetch: F) -> TriggerOutcome
    where
        F: FnOnce(PageRequest) -> Fut,
        Fut: Future<Output = Envelope<PaginatedResult<T>>>,
    {
        let Some(key) = self.active_key() else {
            return TriggerOutcome::Inactive;
        };
        let ticket = match self.begin(trigger) {
            Ok(ticket) => ticket,
            Err(busy) => {
                debug!(?trigger, ?busy, "load more suppressed");
                return TriggerOutcome::Suppressed(busy);
            }
        };
        let outcome = self.cache.load_more(&key, fetch).await;
        self.finish(ticket);
        TriggerOutcome::Loaded(outcome)
    }

    /// Record the position of the active list before navigating away.
    pub fn leave(&self, scroll_offset: f64) -> Option<ScrollPositionRecord> {
        let key = self.active_key()?;
        let pages_loaded = self.cache.get(&key).map_or(0, |entry| entry.pages_loaded());
        if pages_loaded == 0 {
            return None;
        }
        Some(self.positions.save(&key, scroll_offset, pages_loaded))
    }

    /// Activate `key`, load its first page, and reload as many pages as were
    /// showing when the user left. The offset is only reported once those
    /// pages exist.
    pub async fn enter<F, Fut>(&self, key: QueryKey, fetch: F) -> RestoreOutcome
    where
        F: Fn(PageRequest) -> Fut,
        Fut: Future<Output = Envelope<PaginatedResult<T>>>,
    {
        self.switch_to(key.clone());
        let first = self.cache.query(&key, &fetch).await;
        if first.pages.is_empty()
            && let Some(error) = first.error
        {
            return RestoreOutcome::Failed(error);
        }
        let Some(record) = self.positions.get(&key) else {
            return RestoreOutcome::Fresh;
        };
        let Ok(ticket) = self.begin(Trigger::Restore) else {
            let pages_loaded = self.cache.get(&key).map_or(0, |entry| entry.pages_loaded());
            return RestoreOutcome::Incomplete {
                pages_loaded,
                error: None,
            };
        };
        let outcome = self.reload_pages(&key, &record, &fetch).await;
        self.finish(ticket);
        outcome
    }

    async fn reload_pages<F, Fut>(
        &self,
        key: &QueryKey,
        record: &ScrollPositionRecord,
        fetch: &F,
    ) -> RestoreOutcome
    where
        F: Fn(PageRequest) -> Fut,
        Fut: Future<Output = Envelope<PaginatedResult<T>>>,
    {
        loop {
            let pages_loaded = self.cache.get(key).map_or(0, |entry| entry.pages_loaded());
            if pages_loaded >= record.pages_loaded {
                debug!(key = %key, pages_loaded, "scroll position restored");
                return RestoreOutcome::Restored {
                    scroll_offset: record.scroll_offset,
                    pages_loaded,
                };
            }
            if self.active_key().as_ref() != Some(key) {
                return RestoreOutcome::Incomplete {
                    pages_loaded,
                    error: None,
                };
            }
            match self.cache.load_more(key, fetch).await {
                LoadMoreOutcome::Appended => {}
                LoadMoreOutcome::Failed(error) => {
                    return RestoreOutcome::Incomplete {
                        pages_loaded,
                        error: Some(error),
                    };
                }
                LoadMoreOutcome::Exhausted
                | LoadMoreOutcome::Busy
                | LoadMoreOutcome::NotLoaded
                | LoadMoreOutcome::Stale => {
                    return RestoreOutcome::Incomplete {
                        pages_loaded,
                        error: None,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query_key::Resource;
    use std::cell::RefCell;
    use tokio::sync::oneshot;

    fn page(value: u32, next: Option<&str>) -> Envelope<PaginatedResult<u32>> {
        Envelope::success(
            200,
            PaginatedResult {
                count: 10,
                next: next.map(str::to_string),
                previous: None,
                results: vec![value],
            },
        )
    }

    fn controller(mode: ScrollMode) -> InfiniteScroll<u32> {
        InfiniteScroll::new(
            Rc::new(QueryCache::new()),
            Rc::new(ScrollPositionStore::new(8)),
            mode,
        )
    }

    fn cursor_page(request: &PageRequest) -> Envelope<PaginatedResult<u32>> {
        let number = u32::try_from(request.page).unwrap_or(u32::MAX);
        let next = format!("p{}", number + 1);
        page(number, (number < 5).then_some(next.as_str()))
    }

    #[tokio::test]
    async fn sentinel_and_button_never_overlap() {
        let scroll = controller(ScrollMode::Auto);
        let key = QueryKey::bare(Resource::Videos);
        scroll.switch_to(key);
        scroll.load_first(|_| async { page(1, Some("p2")) }).await;

        let (tx, rx) = oneshot::channel();
        let sentinel = scroll.on_sentinel_visible(|_| async move { rx.await.unwrap() });
        let button = async {
            tokio::task::yield_now().await;
            let outcome = scroll
                .on_load_more_clicked(|_| async { page(99, None) })
                .await;
            tx.send(page(2, None)).unwrap();
            outcome
        };
        let (sentinel, button) = tokio::join!(sentinel, button);
        assert_eq!(sentinel, TriggerOutcome::Loaded(LoadMoreOutcome::Appended));
        assert_eq!(button, TriggerOutcome::Suppressed(Trigger::Sentinel));
        assert_eq!(scroll.busy_with(), None);
        let items: Vec<u32> = scroll.entry().unwrap().items().copied().collect();
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn manual_mode_ignores_sentinel() {
        let scroll = controller(ScrollMode::Manual);
        scroll.switch_to(QueryKey::bare(Resource::Tags));
        scroll.load_first(|_| async { page(1, Some("p2")) }).await;
        let outcome = scroll.on_sentinel_visible(|_| async { page(2, None) }).await;
        assert_eq!(outcome, TriggerOutcome::Disabled);
        let outcome = scroll.on_load_more_clicked(|_| async { page(2, None) }).await;
        assert_eq!(outcome, TriggerOutcome::Loaded(LoadMoreOutcome::Appended));
    }

    #[tokio::test]
    async fn filter_change_drops_previous_result() {
        let scroll = controller(ScrollMode::Auto);
        let old_key = QueryKey::bare(Resource::Videos);
        let new_key = QueryKey::bare(Resource::Tags);
        scroll.switch_to(old_key.clone());

        let (tx, rx) = oneshot::channel();
        let stale = scroll.load_first(|_| async move { rx.await.unwrap() });
        let change = async {
            tokio::task::yield_now().await;
            assert!(scroll.switch_to(new_key.clone()));
            tx.send(page(1, None)).unwrap();
        };
        let (stale, ()) = tokio::join!(stale, change);
        assert!(stale.unwrap().pages.is_empty());
        assert_eq!(scroll.active_key(), Some(new_key));
        assert!(scroll.cache.get(&old_key).unwrap().pages.is_empty());
    }

    #[tokio::test]
    async fn re_entering_restores_after_pages_exist() {
        let scroll = controller(ScrollMode::Auto);
        let key = QueryKey::bare(Resource::Videos);
        let requests = RefCell::new(Vec::new());
        let fetch = |request: PageRequest| {
            requests.borrow_mut().push(request.page);
            let envelope = cursor_page(&request);
            async move { envelope }
        };

        assert_eq!(scroll.enter(key.clone(), fetch).await, RestoreOutcome::Fresh);
        scroll.on_load_more_clicked(fetch).await;
        scroll.on_load_more_clicked(fetch).await;
        let saved = scroll.leave(640.0).unwrap();
        assert_eq!(saved.pages_loaded, 3);

        scroll.cache.invalidate(&crate::core::query_key::KeyPattern::All);
        scroll.switch_to(QueryKey::bare(Resource::Tags));
        requests.borrow_mut().clear();

        let outcome = scroll.enter(key, fetch).await;
        assert_eq!(
            outcome,
            RestoreOutcome::Restored {
                scroll_offset: 640.0,
                pages_loaded: 3
            }
        );
        assert_eq!(requests.borrow().as_slice(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn restore_stops_short_when_list_shrank() {
        let scroll = controller(ScrollMode::Auto);
        let key = QueryKey::bare(Resource::Videos);
        scroll.switch_to(key.clone());
        scroll.load_first(|_| async { page(1, Some("p2")) }).await;
        scroll.on_load_more_clicked(|_| async { page(2, None) }).await;
        scroll.leave(300.0);
        scroll.cache.invalidate(&crate::core::query_key::KeyPattern::All);

        let outcome = scroll.enter(key, |_| async { page(1, None) }).await;
        assert_eq!(
            outcome,
            RestoreOutcome::Incomplete {
                pages_loaded: 1,
                error: None
            }
        );
    }
}
