//! A paged list bound to the API client.

use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;

use crate::core::cache::CacheEntry;
use crate::core::filters::ApiParamSet;
use crate::core::query_key::{QueryKey, Resource};
use crate::core::scroll::ScrollPositionRecord;
use crate::features::gallery::controller::{InfiniteScroll, RestoreOutcome, TriggerOutcome};
use crate::services::api::ApiClient;

/// Infinite-scroll controller plus the request that feeds it.
#[derive(Debug)]
pub struct ListView<T> {
    scroll: InfiniteScroll<T>,
    api: Rc<ApiClient>,
    request: RefCell<Option<(Resource, ApiParamSet)>>,
}

impl<T: Clone + DeserializeOwned> ListView<T> {
    /// List fetching through `api`.
    #[must_use]
    pub const fn new(scroll: InfiniteScroll<T>, api: Rc<ApiClient>) -> Self {
        Self {
            scroll,
            api,
            request: RefCell::new(None),
        }
    }

    /// Underlying controller.
    #[must_use]
    pub const fn scroll(&self) -> &InfiniteScroll<T> {
        &self.scroll
    }

    /// Cached entry for the list being shown.
    #[must_use]
    pub fn entry(&self) -> Option<CacheEntry<T>> {
        self.scroll.entry()
    }

    fn current(&self) -> Option<(Resource, ApiParamSet)> {
        self.request.borrow().clone()
    }

    /// Show the list for `key`, restoring a saved scroll position if any.
    pub async fn open(&self, key: QueryKey, params: ApiParamSet) -> RestoreOutcome {
        let resource = key.resource();
        self.request.replace(Some((resource, params.clone())));
        let api = &self.api;
        self.scroll
            .enter(key, |request| api.fetch_page(resource, &params, request))
            .await
    }

    /// The sentinel scrolled into view.
    pub async fn on_sentinel_visible(&self) -> TriggerOutcome {
        let Some((resource, params)) = self.current() else {
            return TriggerOutcome::Inactive;
        };
        let api = &self.api;
        self.scroll
            .on_sentinel_visible(|request| api.fetch_page(resource, &params, request))
            .await
    }

    /// The "load more" button was pressed.
    pub async fn on_load_more_clicked(&self) -> TriggerOutcome {
        let Some((resource, params)) = self.current() else {
            return TriggerOutcome::Inactive;
        };
        let api = &self.api;
        self.scroll
            .on_load_more_clicked(|request| api.fetch_page(resource, &params, request))
            .await
    }

    /// Record the scroll offset before navigating away.
    pub fn leave(&self, scroll_offset: f64) -> Option<ScrollPositionRecord> {
        self.scroll.leave(scroll_offset)
    }
}
