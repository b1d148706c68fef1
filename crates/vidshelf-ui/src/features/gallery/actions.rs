//! User-facing gallery actions: optimistic writes plus the quota-gated import.

use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::Utc;
use tracing::info;
use vidshelf_api_models::{Channel, ImportSummary, QuotaState, StatusPayload, Tag, Video};

use crate::core::envelope::{ApiError, Envelope};
use crate::core::filters::{TagSet, validate_tag_name};
use crate::core::mutations::{MutationEngine, MutationError, MutationKind};
use crate::core::query_key::{KeyPattern, Resource};
use crate::core::store::GalleryCache;
use crate::services::api::ApiClient;

/// Gallery writes bound to one API client and mutation engine.
#[derive(Clone, Debug)]
pub struct GalleryActions {
    api: Rc<ApiClient>,
    engine: Rc<MutationEngine>,
}

const VIDEOS: KeyPattern = KeyPattern::Resource(Resource::Videos);

fn normalize_tags(field: &str, raw: &[String]) -> Result<Vec<String>, MutationError> {
    let mut tags = TagSet::new();
    for tag in raw {
        match validate_tag_name(tag) {
            Ok(name) => {
                tags.insert(name);
            }
            Err(err) => {
                let message = err.to_string();
                let fields = BTreeMap::from([(field.to_string(), vec![message.clone()])]);
                return Err(MutationError::Api(ApiError::Validation { message, fields }));
            }
        }
    }
    Ok(tags.iter().map(str::to_string).collect())
}

impl GalleryActions {
    /// Actions over `api`, writing through `engine`.
    #[must_use]
    pub const fn new(api: Rc<ApiClient>, engine: Rc<MutationEngine>) -> Self {
        Self { api, engine }
    }

    fn cache(&self) -> &GalleryCache {
        self.engine.cache()
    }

    /// Mark a video watched or unwatched.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError`] when the toggle is already in flight or the
    /// request fails; the cached flag is rolled back in the latter case.
    pub async fn set_watched(&self, video_id: &str, is_watched: bool) -> Result<StatusPayload, MutationError> {
        let watched_at = is_watched.then(Utc::now);
        self.engine
            .mutate(
                video_id,
                MutationKind::SetWatched,
                |cache| {
                    cache.videos.update_items(
                        &VIDEOS,
                        |video: &Video| video.id == video_id,
                        |video| {
                            video.is_watched = is_watched;
                            video.watched_at = watched_at;
                        },
                    );
                },
                self.api.set_watched(video_id, is_watched),
            )
            .await
    }

    /// Replace a video's tags.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad tag names without touching the cache,
    /// otherwise see [`Self::set_watched`].
    pub async fn set_video_tags(&self, video_id: &str, tags: &[String]) -> Result<StatusPayload, MutationError> {
        let tags = normalize_tags("tags", tags)?;
        self.engine
            .mutate(
                video_id,
                MutationKind::SetVideoTags,
                |cache| {
                    cache.videos.update_items(
                        &VIDEOS,
                        |video: &Video| video.id == video_id,
                        |video| video.tags.clone_from(&tags),
                    );
                },
                self.api.set_video_tags(video_id, &tags),
            )
            .await
    }

    /// Subscribe to a channel; it leaves the "available" lists immediately.
    ///
    /// # Errors
    ///
    /// See [`Self::set_watched`].
    pub async fn subscribe(&self, channel_id: &str) -> Result<StatusPayload, MutationError> {
        self.engine
            .mutate(
                channel_id,
                MutationKind::Subscribe,
                |cache| {
                    cache.channels.update_items(
                        &KeyPattern::All,
                        |channel: &Channel| channel.id == channel_id,
                        |channel| channel.is_subscribed = true,
                    );
                    cache.channels.remove_items(
                        &KeyPattern::Resource(Resource::AvailableChannels),
                        |channel| channel.id == channel_id,
                    );
                },
                self.api.subscribe(channel_id),
            )
            .await
    }

    /// Unsubscribe from a channel; it leaves the "subscribed" lists immediately.
    ///
    /// # Errors
    ///
    /// See [`Self::set_watched`].
    pub async fn unsubscribe(&self, channel_id: &str) -> Result<StatusPayload, MutationError> {
        self.engine
            .mutate(
                channel_id,
                MutationKind::Unsubscribe,
                |cache| {
                    cache.channels.update_items(
                        &KeyPattern::All,
                        |channel: &Channel| channel.id == channel_id,
                        |channel| channel.is_subscribed = false,
                    );
                    cache.channels.remove_items(
                        &KeyPattern::Resource(Resource::SubscribedChannels),
                        |channel| channel.id == channel_id,
                    );
                },
                self.api.unsubscribe(channel_id),
            )
            .await
    }

    /// Replace a channel's tags.
    ///
    /// # Errors
    ///
    /// See [`Self::set_video_tags`].
    pub async fn set_channel_tags(&self, channel_id: &str, tags: &[String]) -> Result<StatusPayload, MutationError> {
        let tags = normalize_tags("tags", tags)?;
        self.engine
            .mutate(
                channel_id,
                MutationKind::SetChannelTags,
                |cache| {
                    cache.channels.update_items(
                        &KeyPattern::All,
                        |channel: &Channel| channel.id == channel_id,
                        |channel| channel.tags.clone_from(&tags),
                    );
                },
                self.api.set_channel_tags(channel_id, &tags),
            )
            .await
    }

    /// Create a tag. Nothing is applied optimistically since the id is
    /// server-assigned; the tag lists refetch on success.
    ///
    /// # Errors
    ///
    /// See [`Self::set_video_tags`].
    pub async fn create_tag(&self, name: &str, colour: Option<&str>) -> Result<Tag, MutationError> {
        let name = validate_tag_name(name).map_err(|err| {
            let message = err.to_string();
            MutationError::Api(ApiError::Validation {
                fields: BTreeMap::from([("name".to_string(), vec![message.clone()])]),
                message,
            })
        })?;
        let entity = name.to_lowercase();
        self.engine
            .mutate(
                &entity,
                MutationKind::CreateTag,
                |_| {},
                self.api.create_tag(&name, colour),
            )
            .await
    }

    /// Delete a tag and strip it from every cached video and channel.
    ///
    /// The tag's name is looked up in the cached tag lists; when no list holds
    /// it, only the refetch after success removes it from item tags.
    ///
    /// # Errors
    ///
    /// See [`Self::set_watched`].
    pub async fn delete_tag(&self, tag_id: u64) -> Result<StatusPayload, MutationError> {
        let entity = tag_id.to_string();
        let name = self
            .cache()
            .tags
            .find_item(|tag| tag.id == tag_id)
            .map(|tag| tag.name);
        self.engine
            .mutate(
                &entity,
                MutationKind::DeleteTag,
                |cache| {
                    cache
                        .tags
                        .remove_items(&KeyPattern::Resource(Resource::Tags), |tag| tag.id == tag_id);
                    let Some(name) = name.as_deref() else {
                        return;
                    };
                    cache.videos.update_items(
                        &VIDEOS,
                        |video: &Video| video.tags.iter().any(|tag| tag == name),
                        |video| video.tags.retain(|tag| tag != name),
                    );
                    cache.channels.update_items(
                        &KeyPattern::All,
                        |channel: &Channel| channel.tags.iter().any(|tag| tag == name),
                        |channel| channel.tags.retain(|tag| tag != name),
                    );
                },
                self.api.delete_tag(tag_id),
            )
            .await
    }

    /// Current quota snapshot.
    pub async fn fetch_quota(&self) -> Envelope<QuotaState> {
        self.api.fetch_quota().await
    }

    /// Import the user's YouTube subscriptions.
    ///
    /// When a known quota snapshot forbids importing, the call is refused
    /// locally with a quota-exceeded envelope. Success invalidates every
    /// channel and video list; nothing is applied optimistically.
    pub async fn import_subscriptions(&self, quota: Option<&QuotaState>) -> Envelope<ImportSummary> {
        if let Some(quota) = quota.filter(|quota| !quota.can_import()) {
            info!(used = quota.used, limit = quota.daily_limit, "import blocked by quota");
            return Envelope::failure(
                None,
                ApiError::QuotaExceeded {
                    quota: quota.clone(),
                },
            );
        }
        let envelope = self.api.import_subscriptions().await;
        if envelope.is_ok() {
            let refreshed = self.cache().invalidate(&[
                KeyPattern::Resource(Resource::SubscribedChannels),
                KeyPattern::Resource(Resource::AvailableChannels),
                KeyPattern::Resource(Resource::Videos),
            ]);
            info!(refreshed, "subscriptions imported");
        }
        envelope
    }
}
