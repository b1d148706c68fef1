//! Application wiring: one context owning the session, cache, bus and lists.

pub mod preferences;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, info, warn};
use vidshelf_api_models::{Channel, Video};
use vidshelf_config::ClientConfig;
use vidshelf_events::{Signal, SignalBus, SignalId};

use crate::app::preferences::{KeyValueStorage, load_scroll_mode, persist_scroll_mode};
use crate::core::auth::Session;
use crate::core::debounce::Debouncer;
use crate::core::envelope::ResponseClassifier;
use crate::core::filters::{
    ApiParamSet, FilterState, UrlParamSet, VideoFilters, to_api_params, to_url_params,
};
use crate::core::mutations::MutationEngine;
use crate::core::query_key::QueryKey;
use crate::core::scroll::ScrollPositionStore;
use crate::core::store::GalleryCache;
use crate::core::ui::ScrollMode;
use crate::features::gallery::{GalleryActions, InfiniteScroll, ListView, RestoreOutcome};
use crate::services::api::ApiClient;
use crate::services::transport::Transport;

/// Everything a gallery screen needs, shared by reference.
pub struct GalleryContext {
    config: ClientConfig,
    bus: SignalBus,
    session: Session,
    cache: Rc<GalleryCache>,
    api: Rc<ApiClient>,
    mutations: Rc<MutationEngine>,
    positions: Rc<ScrollPositionStore>,
    storage: Rc<dyn KeyValueStorage>,
    scroll_mode: Cell<ScrollMode>,
    search: RefCell<Debouncer<String>>,
    videos: ListView<Video>,
    channels: ListView<Channel>,
    signal_cursor: Cell<SignalId>,
}

impl std::fmt::Debug for GalleryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryContext")
            .field("api", &self.api)
            .field("scroll_mode", &self.scroll_mode.get())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

fn apply_search(state: &mut FilterState, search: String) -> UrlParamSet {
    debug!(scope = ?state.scope, search = %search, "search settled");
    state.set_search(search);
    to_url_params(state, state.scope)
}

impl GalleryContext {
    /// Wire a context for `config`. The scroll mode is read from `storage`
    /// once, here.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        transport: Rc<dyn Transport>,
        storage: Rc<dyn KeyValueStorage>,
    ) -> Self {
        let bus = SignalBus::new();
        let signal_cursor = Cell::new(bus.last_signal_id().unwrap_or_default());
        let session = Session::from_api_key(config.api_key.as_deref());
        let classifier = ResponseClassifier::new(bus.clone(), session.clone());
        let api = Rc::new(ApiClient::new(
            config.base_url(),
            transport,
            classifier,
            session.clone(),
        ));
        let cache = Rc::new(GalleryCache::new());
        let mutations = Rc::new(MutationEngine::new(Rc::clone(&cache)));
        let positions = Rc::new(ScrollPositionStore::new(config.scroll_store_capacity));
        let scroll_mode = load_scroll_mode(storage.as_ref());
        let search = RefCell::new(Debouncer::new(config.search_debounce_ms));
        let videos = ListView::new(
            InfiniteScroll::new(Rc::clone(&cache.videos), Rc::clone(&positions), scroll_mode),
            Rc::clone(&api),
        );
        let channels = ListView::new(
            InfiniteScroll::new(Rc::clone(&cache.channels), Rc::clone(&positions), scroll_mode),
            Rc::clone(&api),
        );
        info!(base_url = api.base_url(), mode = scroll_mode.as_str(), "gallery context ready");
        Self {
            config,
            bus,
            session,
            cache,
            api,
            mutations,
            positions,
            storage,
            scroll_mode: Cell::new(scroll_mode),
            search,
            videos,
            channels,
            signal_cursor,
        }
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Signal bus shared with the response classifier.
    #[must_use]
    pub const fn bus(&self) -> &SignalBus {
        &self.bus
    }

    /// Current credentials.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Shared query cache.
    #[must_use]
    pub const fn cache(&self) -> &Rc<GalleryCache> {
        &self.cache
    }

    /// REST client.
    #[must_use]
    pub const fn api(&self) -> &Rc<ApiClient> {
        &self.api
    }

    /// Scroll positions shared by both lists.
    #[must_use]
    pub const fn positions(&self) -> &Rc<ScrollPositionStore> {
        &self.positions
    }

    /// Optimistic actions against this context's cache.
    #[must_use]
    pub fn actions(&self) -> GalleryActions {
        GalleryActions::new(Rc::clone(&self.api), Rc::clone(&self.mutations))
    }

    /// Video gallery list.
    #[must_use]
    pub const fn videos(&self) -> &ListView<Video> {
        &self.videos
    }

    /// Channel list (one scope shown at a time).
    #[must_use]
    pub const fn channels(&self) -> &ListView<Channel> {
        &self.channels
    }

    /// Active scroll mode.
    #[must_use]
    pub fn scroll_mode(&self) -> ScrollMode {
        self.scroll_mode.get()
    }

    /// Switch scroll mode for both lists and persist the choice.
    pub fn set_scroll_mode(&self, mode: ScrollMode) {
        self.scroll_mode.set(mode);
        self.videos.scroll().set_mode(mode);
        self.channels.scroll().set_mode(mode);
        persist_scroll_mode(self.storage.as_ref(), mode);
    }

    /// Record a search keystroke typed at `now_ms`.
    ///
    /// The text is held until input has been quiet for the configured
    /// debounce; [`Self::settle_search`] then applies it.
    pub fn edit_search(&self, text: impl Into<String>, now_ms: u64) {
        self.search.borrow_mut().push(text.into(), now_ms);
    }

    /// Milliseconds until the pending search is due, if one is waiting.
    #[must_use]
    pub fn search_due_in(&self, now_ms: u64) -> Option<u64> {
        self.search.borrow().remaining_ms(now_ms)
    }

    /// Apply the pending search to `state` once it is due and return the
    /// URL parameters to push. `None` while input is still settling.
    pub fn settle_search(&self, state: &mut FilterState, now_ms: u64) -> Option<UrlParamSet> {
        let search = self.search.borrow_mut().poll(now_ms)?;
        Some(apply_search(state, search))
    }

    /// Apply the pending search right away, as on Enter.
    pub fn submit_search(&self, state: &mut FilterState) -> Option<UrlParamSet> {
        let search = self.search.borrow_mut().flush()?;
        Some(apply_search(state, search))
    }

    /// Cache key and request parameters for a channel filter.
    #[must_use]
    pub fn channel_params(&self, state: &FilterState) -> (QueryKey, ApiParamSet) {
        let page_size = Some(self.config.page_size);
        let params = to_api_params(state).with_page_size(page_size);
        (QueryKey::for_channels(state, page_size), params)
    }

    /// Cache key and request parameters for a video filter; the configured
    /// page size applies unless the filter carries its own.
    #[must_use]
    pub fn video_params(&self, filters: &VideoFilters) -> (QueryKey, ApiParamSet) {
        let mut filters = filters.clone();
        filters.page_size = filters.page_size.or(Some(self.config.page_size));
        (QueryKey::for_videos(&filters), filters.to_api_params())
    }

    /// Show the video gallery for `filters`.
    pub async fn open_videos(&self, filters: &VideoFilters) -> RestoreOutcome {
        let (key, params) = self.video_params(filters);
        self.videos.open(key, params).await
    }

    /// Show a channel list for `state`.
    pub async fn open_channels(&self, state: &FilterState) -> RestoreOutcome {
        let (key, params) = self.channel_params(state);
        self.channels.open(key, params).await
    }

    /// Apply every signal published since the last pump to the cache.
    /// Returns the signals seen.
    ///
    /// Signals are read from the bus replay ring. If the ring has moved past
    /// the last one applied, the missed signals are unknown and the cache is
    /// cleared.
    pub fn pump_signals(&self) -> Vec<Signal> {
        let seen = self.signal_cursor.get();
        let pending = self.bus.backlog_since(seen);
        let (Some(first), Some(last)) = (pending.first(), pending.last()) else {
            return Vec::new();
        };
        let (first, last) = (first.id, last.id);
        self.signal_cursor.set(last);
        if first > seen + 1 {
            warn!(missed = first - seen - 1, "signal backlog overran; clearing query cache");
            self.cache.clear();
        }
        pending
            .into_iter()
            .map(|envelope| {
                self.cache.handle_signal(&envelope.signal);
                envelope.signal
            })
            .collect()
    }

    /// Drop credentials and every cached list.
    pub fn logout(&self) {
        self.session.clear();
        self.bus.publish(Signal::CacheClear {
            reason: "logout".to_string(),
        });
        self.positions.clear();
        self.pump_signals();
        info!("logged out");
    }
}

/// Apply bus signals to the cache as they arrive, for the lifetime of the page.
#[cfg(target_arch = "wasm32")]
pub fn spawn_signal_listener(context: &GalleryContext) {
    let mut stream = context.bus.subscribe();
    let cache = Rc::clone(&context.cache);
    wasm_bindgen_futures::spawn_local(async move {
        while let Some(envelope) = stream.next().await {
            cache.handle_signal(&envelope.signal);
        }
    });
}
