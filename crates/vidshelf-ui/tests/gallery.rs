//! End-to-end gallery flows against a scripted backend.

use std::rc::Rc;

use serde_json::json;
use tokio::task::yield_now;
use vidshelf_api_models::{QuotaState, Video};
use vidshelf_config::ClientConfig;
use vidshelf_events::{DEFAULT_REPLAY_CAPACITY, Signal};
use vidshelf_test_support::ScriptedTransport;
use vidshelf_test_support::fixtures::{
    TEST_BASE_URL, channel, error_body, next_cursor, page_body, quota_exceeded_body, video,
};
use vidshelf_ui::GalleryContext;
use vidshelf_ui::app::preferences::{KeyValueStorage, MemoryStorage, SCROLL_MODE_KEY};
use vidshelf_ui::core::cache::{FetchStatus, LoadMoreOutcome};
use vidshelf_ui::core::envelope::{ApiError, RawResponse};
use vidshelf_ui::core::filters::{
    FilterState, Scope, TagMode, TagSet, VideoFilters, from_url_params,
};
use vidshelf_ui::core::mutations::MutationError;
use vidshelf_ui::core::ui::ScrollMode;
use vidshelf_ui::features::gallery::{RestoreOutcome, Trigger, TriggerOutcome};
use vidshelf_ui::services::transport::Method;

fn context(transport: &Rc<ScriptedTransport>, storage: Rc<MemoryStorage>) -> GalleryContext {
    let config = ClientConfig {
        api_base_url: TEST_BASE_URL.to_string(),
        api_key: Some("secret".to_string()),
        ..ClientConfig::default()
    };
    GalleryContext::new(config, transport.clone(), storage)
}

fn watched(ctx: &GalleryContext, id: &str) -> Option<bool> {
    ctx.videos()
        .entry()?
        .items()
        .find(|item: &&Video| item.id == id)
        .map(|item| item.is_watched)
}

#[tokio::test]
async fn failed_watch_toggle_shows_then_rolls_back() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    transport.push_json(200, &page_body(&[video("v1", false), video("v2", false)], 2, None));
    assert_eq!(ctx.open_videos(&VideoFilters::default()).await, RestoreOutcome::Fresh);

    let release = transport.push_deferred();
    let actions = ctx.actions();
    let toggle = actions.set_watched("v1", true);
    let observe = async {
        yield_now().await;
        let during = watched(&ctx, "v1");
        release
            .send(RawResponse::json("", 500, &error_body("database unavailable")))
            .unwrap();
        during
    };
    let (result, during) = tokio::join!(toggle, observe);

    assert_eq!(during, Some(true));
    assert!(matches!(
        result,
        Err(MutationError::Api(ApiError::Network {
            status: Some(500),
            ..
        }))
    ));
    assert_eq!(watched(&ctx, "v1"), Some(false));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.url, format!("{TEST_BASE_URL}/api/videos/v1/watched/"));
    assert_eq!(request.header("x-api-key"), Some("secret"));
    assert!(request.body.unwrap().contains("\"is_watched\":true"));
}

#[tokio::test]
async fn failed_toggle_keeps_overlapping_toggle_on_another_video() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    transport.push_json(200, &page_body(&[video("v1", false), video("v2", false)], 2, None));
    assert_eq!(ctx.open_videos(&VideoFilters::default()).await, RestoreOutcome::Fresh);

    let first_answer = transport.push_deferred();
    let second_answer = transport.push_deferred();
    let actions = ctx.actions();
    let first = actions.set_watched("v1", true);
    let second = actions.set_watched("v2", true);
    let answer = async {
        yield_now().await;
        let during = (watched(&ctx, "v1"), watched(&ctx, "v2"));
        first_answer
            .send(RawResponse::json("", 500, &error_body("database unavailable")))
            .unwrap();
        yield_now().await;
        yield_now().await;
        let after_failure = (watched(&ctx, "v1"), watched(&ctx, "v2"));
        second_answer
            .send(RawResponse::json("", 200, &json!({ "status": "ok" })))
            .unwrap();
        (during, after_failure)
    };
    let (first, second, (during, after_failure)) = tokio::join!(first, second, answer);

    assert_eq!(during, (Some(true), Some(true)));
    assert_eq!(after_failure, (Some(false), Some(true)));
    assert!(matches!(first, Err(MutationError::Api(ApiError::Network { .. }))));
    assert!(second.is_ok());
    assert_eq!(watched(&ctx, "v1"), Some(false));
    assert_eq!(watched(&ctx, "v2"), Some(true));
}

#[tokio::test]
async fn quota_exceeded_import_leaves_cache_untouched() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    transport.push_json(200, &page_body(&[channel("UC1", true)], 1, None));
    let subscribed = FilterState::new(Scope::Subscribed);
    ctx.open_channels(&subscribed).await;
    let before = ctx.channels().entry();

    transport.push_json(429, &quota_exceeded_body(10_000, 10_000));
    let envelope = ctx.actions().import_subscriptions(None).await;

    let quota = envelope.quota_exceeded().unwrap();
    assert_eq!((quota.used, quota.daily_limit), (10_000, 10_000));
    assert_eq!(ctx.channels().entry(), before);
    assert_eq!(before.map(|entry| entry.status), Some(FetchStatus::Success));
}

#[tokio::test]
async fn exhausted_quota_snapshot_blocks_import_locally() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    let quota = QuotaState::from_usage(10_000, 10_000);

    let envelope = ctx.actions().import_subscriptions(Some(&quota)).await;

    assert!(envelope.quota_exceeded().is_some());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn unauthorised_response_clears_session_and_signals() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    transport.push_json(401, &error_body("Authentication credentials were not provided."));

    let outcome = ctx.open_videos(&VideoFilters::default()).await;

    assert_eq!(outcome, RestoreOutcome::Failed(ApiError::AuthRequired));
    assert!(!ctx.session().is_authenticated());
    let signals = ctx.pump_signals();
    assert!(
        signals
            .iter()
            .any(|signal| matches!(signal, Signal::AuthRequired { path } if path.starts_with("/api/videos/")))
    );
}

#[tokio::test]
async fn signal_pump_resumes_after_the_last_applied_signal() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    transport.push_json(200, &page_body(&[video("v1", false)], 1, None));
    ctx.open_videos(&VideoFilters::default()).await;

    ctx.bus().publish(Signal::ReauthRequired {
        message: "link expired".to_string(),
    });
    assert_eq!(ctx.pump_signals().len(), 1);
    assert!(ctx.pump_signals().is_empty());
    assert!(!ctx.cache().videos.is_empty());

    for n in 0..=DEFAULT_REPLAY_CAPACITY {
        ctx.bus().publish(Signal::AuthRequired {
            path: format!("/api/videos/?page={n}"),
        });
    }
    let replayed = ctx.pump_signals();
    assert_eq!(replayed.len(), DEFAULT_REPLAY_CAPACITY);
    assert!(ctx.cache().videos.is_empty());
    assert!(ctx.pump_signals().is_empty());
}

#[tokio::test]
async fn logout_clears_every_cached_list() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    transport.push_json(200, &page_body(&[video("v1", false)], 1, None));
    ctx.open_videos(&VideoFilters::default()).await;
    ctx.videos().leave(120.0);
    assert!(!ctx.cache().videos.is_empty());

    ctx.logout();

    assert!(ctx.cache().videos.is_empty());
    assert!(ctx.positions().is_empty());
    assert!(!ctx.session().is_authenticated());
}

#[tokio::test]
async fn sentinel_and_button_never_double_load() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    let cursor = next_cursor("/api/videos/", 2);
    transport.push_json(200, &page_body(&[video("v1", false)], 2, Some(&cursor)));
    ctx.open_videos(&VideoFilters::default()).await;

    let release = transport.push_deferred();
    let sentinel = ctx.videos().on_sentinel_visible();
    let click = async {
        yield_now().await;
        let outcome = ctx.videos().on_load_more_clicked().await;
        release
            .send(RawResponse::json("", 200, &page_body(&[video("v2", false)], 2, None)))
            .unwrap();
        outcome
    };
    let (sentinel, click) = tokio::join!(sentinel, click);

    assert_eq!(click, TriggerOutcome::Suppressed(Trigger::Sentinel));
    assert_eq!(sentinel, TriggerOutcome::Loaded(LoadMoreOutcome::Appended));
    assert_eq!(transport.request_count(), 2);
    assert_eq!(transport.last_request().unwrap().url, cursor);
    let ids: Vec<String> = ctx
        .videos()
        .entry()
        .unwrap()
        .items()
        .map(|item| item.id.clone())
        .collect();
    assert_eq!(ids, ["v1", "v2"]);
}

#[tokio::test]
async fn single_tag_filter_omits_tag_mode() {
    let transport = Rc::new(ScriptedTransport::new());
    let ctx = context(&transport, Rc::new(MemoryStorage::new()));
    transport.push_json(200, &page_body::<Video>(&[], 0, None));
    let filters = VideoFilters {
        selected_tags: TagSet::from_joined("music"),
        tag_mode: TagMode::All,
        ..VideoFilters::default()
    };

    ctx.open_videos(&filters).await;

    let url = transport.last_request().unwrap().url;
    assert!(url.contains("tags=music"), "{url}");
    assert!(url.contains("page_size=24"), "{url}");
    assert!(!url.contains("tag_mode"), "{url}");
}

#[tokio::test]
async fn scroll_mode_is_read_once_and_persisted() {
    let transport = Rc::new(ScriptedTransport::new());
    let storage = Rc::new(MemoryStorage::new());
    storage.set(SCROLL_MODE_KEY, "manual");
    let ctx = context(&transport, Rc::clone(&storage));
    assert_eq!(ctx.scroll_mode(), ScrollMode::Manual);

    transport.push_json(200, &page_body(&[video("v1", false)], 2, Some("/api/videos/?page=2")));
    ctx.open_videos(&VideoFilters::default()).await;
    assert_eq!(ctx.videos().on_sentinel_visible().await, TriggerOutcome::Disabled);

    ctx.set_scroll_mode(ScrollMode::Auto);
    assert_eq!(storage.get(SCROLL_MODE_KEY).as_deref(), Some("auto"));
    assert_eq!(ctx.videos().scroll().mode(), ScrollMode::Auto);
}

#[test]
fn search_reaches_the_url_once_typing_pauses() {
    let transport = Rc::new(ScriptedTransport::new());
    let config = ClientConfig {
        api_base_url: TEST_BASE_URL.to_string(),
        search_debounce_ms: 200,
        ..ClientConfig::default()
    };
    let ctx = GalleryContext::new(config, transport.clone(), Rc::new(MemoryStorage::new()));
    let mut state = FilterState::new(Scope::Available);
    state.set_page(3);

    ctx.edit_search("r", 0);
    ctx.edit_search("ru", 80);
    ctx.edit_search("rust", 150);
    assert_eq!(ctx.settle_search(&mut state, 300), None);
    assert_eq!(ctx.search_due_in(300), Some(50));
    assert_eq!(state.search, "");

    let params = ctx.settle_search(&mut state, 350).unwrap();
    let decoded = from_url_params(&params, Scope::Available);
    assert_eq!(decoded.search, "rust");
    assert_eq!(decoded.page, 1);
    assert_eq!(state.search, "rust");
    assert_eq!(ctx.settle_search(&mut state, 1_000), None);

    ctx.edit_search("rust talks", 1_000);
    let params = ctx.submit_search(&mut state).unwrap();
    assert_eq!(from_url_params(&params, Scope::Available).search, "rust talks");
    assert_eq!(transport.request_count(), 0);
}
