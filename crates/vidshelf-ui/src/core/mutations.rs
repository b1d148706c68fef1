//! Optimistic mutation engine.
//!
//! # Design
//! - Apply the optimistic change while recording the items it changed, then
//!   issue the request.
//! - Failure puts back only those items, so overlapping writes to other
//!   entities survive. Success invalidates the keys whose membership may have
//!   changed.
//! - A write dropped before the server answers resets what it changed, since
//!   its outcome is unknown.
//! - One mutation per (entity, kind) at a time; a second attempt is rejected
//!   with [`MutationError::InFlight`] rather than queued.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::envelope::{ApiError, Envelope};
use crate::core::query_key::{KeyPattern, Resource};
use crate::core::store::{CacheChanges, GalleryCache};

/// Kinds of write the client performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Toggle a video's watched flag.
    SetWatched,
    /// Replace a video's tags.
    SetVideoTags,
    /// Subscribe to a channel.
    Subscribe,
    /// Unsubscribe from a channel.
    Unsubscribe,
    /// Replace a channel's tags.
    SetChannelTags,
    /// Create a tag.
    CreateTag,
    /// Delete a tag.
    DeleteTag,
}

impl MutationKind {
    /// Label for logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SetWatched => "set_watched",
            Self::SetVideoTags => "set_video_tags",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::SetChannelTags => "set_channel_tags",
            Self::CreateTag => "create_tag",
            Self::DeleteTag => "delete_tag",
        }
    }

    /// Entries the optimistic change writes to (recorded for rollback).
    #[must_use]
    pub fn touches(self) -> Vec<KeyPattern> {
        match self {
            Self::SetWatched | Self::SetVideoTags => vec![KeyPattern::Resource(Resource::Videos)],
            Self::Subscribe | Self::Unsubscribe | Self::SetChannelTags => vec![
                KeyPattern::Resource(Resource::SubscribedChannels),
                KeyPattern::Resource(Resource::AvailableChannels),
            ],
            Self::CreateTag => vec![KeyPattern::Resource(Resource::Tags)],
            Self::DeleteTag => vec![
                KeyPattern::Resource(Resource::Tags),
                KeyPattern::Resource(Resource::Videos),
                KeyPattern::Resource(Resource::SubscribedChannels),
                KeyPattern::Resource(Resource::AvailableChannels),
            ],
        }
    }

    /// Entries to refetch after the server confirms the change.
    #[must_use]
    pub fn invalidates(self) -> Vec<KeyPattern> {
        match self {
            Self::SetWatched => vec![KeyPattern::WithParam {
                resource: Resource::Videos,
                param: "filter",
            }],
            Self::SetVideoTags => vec![
                KeyPattern::Resource(Resource::Tags),
                KeyPattern::WithParam {
                    resource: Resource::Videos,
                    param: "tags",
                },
            ],
            Self::Subscribe | Self::Unsubscribe => vec![
                KeyPattern::Resource(Resource::SubscribedChannels),
                KeyPattern::Resource(Resource::AvailableChannels),
                KeyPattern::Resource(Resource::Videos),
            ],
            Self::SetChannelTags => vec![
                KeyPattern::Resource(Resource::Tags),
                KeyPattern::WithParam {
                    resource: Resource::SubscribedChannels,
                    param: "tags",
                },
                KeyPattern::WithParam {
                    resource: Resource::AvailableChannels,
                    param: "tags",
                },
            ],
            Self::CreateTag => vec![KeyPattern::Resource(Resource::Tags)],
            Self::DeleteTag => vec![
                KeyPattern::Resource(Resource::Tags),
                KeyPattern::WithParam {
                    resource: Resource::Videos,
                    param: "tags",
                },
                KeyPattern::WithParam {
                    resource: Resource::SubscribedChannels,
                    param: "tags",
                },
                KeyPattern::WithParam {
                    resource: Resource::AvailableChannels,
                    param: "tags",
                },
            ],
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a mutation did not complete.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MutationError {
    /// The same mutation for the same entity has not finished yet.
    #[error("{kind} for {entity_id} is already in flight")]
    InFlight {
        /// Entity the mutation targets.
        entity_id: String,
        /// Mutation kind.
        kind: MutationKind,
    },
    /// The request failed; the optimistic change was rolled back.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl MutationError {
    /// API error behind the failure, if the request was issued.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            Self::InFlight { .. } => None,
        }
    }
}

type InFlightKey = (String, MutationKind);

/// Runs optimistic writes against the shared cache.
#[derive(Debug)]
pub struct MutationEngine {
    cache: Rc<GalleryCache>,
    in_flight: RefCell<HashSet<InFlightKey>>,
}

struct InFlightGuard<'a> {
    slots: &'a RefCell<HashSet<InFlightKey>>,
    key: InFlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slots.borrow_mut().remove(&self.key);
    }
}

struct PendingWrite<'a> {
    cache: &'a GalleryCache,
    kind: MutationKind,
    changes: Option<CacheChanges>,
}

impl PendingWrite<'_> {
    fn commit(mut self) -> usize {
        self.changes = None;
        self.cache.invalidate(&self.kind.invalidates())
    }

    fn roll_back(mut self) -> usize {
        self.changes
            .take()
            .map_or(0, |changes| self.cache.rollback(changes))
    }
}

impl Drop for PendingWrite<'_> {
    fn drop(&mut self) {
        let Some(changes) = self.changes.take() else {
            return;
        };
        let reset = self.cache.reset_changed(&changes)
            + self.cache.invalidate(&self.kind.invalidates());
        warn!(
            kind = self.kind.as_str(),
            reset, "mutation dropped before the server answered; refetching"
        );
    }
}

impl MutationEngine {
    /// Engine writing to `cache`.
    #[must_use]
    pub fn new(cache: Rc<GalleryCache>) -> Self {
        Self {
            cache,
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    /// Cache the engine writes to.
    #[must_use]
    pub const fn cache(&self) -> &Rc<GalleryCache> {
        &self.cache
    }

    /// Whether a mutation for the pair is outstanding.
    #[must_use]
    pub fn is_in_flight(&self, entity_id: &str, kind: MutationKind) -> bool {
        self.in_flight
            .borrow()
            .contains(&(entity_id.to_string(), kind))
    }

    fn claim(&self, entity_id: &str, kind: MutationKind) -> Result<InFlightGuard<'_>, MutationError> {
        let key = (entity_id.to_string(), kind);
        if !self.in_flight.borrow_mut().insert(key.clone()) {
            debug!(entity_id, kind = kind.as_str(), "mutation rejected: already in flight");
            return Err(MutationError::InFlight {
                entity_id: entity_id.to_string(),
                kind,
            });
        }
        Ok(InFlightGuard {
            slots: &self.in_flight,
            key,
        })
    }

    /// Apply `optimistic` to the cache, await `request`, then commit or roll back.
    ///
    /// On failure the items the optimistic change touched are put back as
    /// they were; items changed by other writes in the meantime are kept. A
    /// not-found failure additionally invalidates the touched entries since
    /// the entity is gone server-side. If the returned future is dropped
    /// before `request` resolves, every entry the change touched is reset.
    ///
    /// # Errors
    ///
    /// [`MutationError::InFlight`] when the same mutation is outstanding (the
    /// cache is left untouched), or [`MutationError::Api`] with the classified
    /// failure.
    pub async fn mutate<R, A, Fut>(
        &self,
        entity_id: &str,
        kind: MutationKind,
        optimistic: A,
        request: Fut,
    ) -> Result<R, MutationError>
    where
        A: FnOnce(&GalleryCache),
        Fut: Future<Output = Envelope<R>>,
    {
        let _slot = self.claim(entity_id, kind)?;
        let touched = kind.touches();
        let pending = PendingWrite {
            cache: self.cache.as_ref(),
            kind,
            changes: Some(self.cache.apply_tracked(&touched, optimistic)),
        };

        match request.await.into_result() {
            Ok(value) => {
                let refreshed = pending.commit();
                info!(entity_id, kind = kind.as_str(), refreshed, "mutation committed");
                Ok(value)
            }
            Err(error) => {
                let reset = pending.roll_back();
                warn!(entity_id, kind = kind.as_str(), reset, error = %error, "mutation rolled back");
                if matches!(error, ApiError::NotFound { .. }) {
                    self.cache.invalidate(&touched);
                }
                Err(MutationError::Api(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query_key::QueryKey;
    use std::collections::BTreeMap;
    use tokio::sync::oneshot;
    use vidshelf_api_models::{PaginatedResult, StatusPayload, Tag};

    fn tag(id: u64, name: &str) -> Tag {
        Tag {
            id,
            name: name.to_string(),
            colour: None,
            channel_count: 0,
            video_count: 0,
        }
    }

    async fn seeded() -> (MutationEngine, QueryKey) {
        let cache = Rc::new(GalleryCache::new());
        let key = QueryKey::bare(Resource::Tags);
        cache
            .tags
            .query(&key, |_| async {
                Envelope::success(200, PaginatedResult::single(vec![tag(1, "music"), tag(2, "news")]))
            })
            .await;
        (MutationEngine::new(cache), key)
    }

    fn drop_tag(cache: &GalleryCache) {
        cache.tags.remove_items(&KeyPattern::All, |item| item.id == 2);
    }

    #[tokio::test]
    async fn failure_restores_cache_exactly() {
        let (engine, key) = seeded().await;
        let before = engine.cache().tags.get(&key);
        let result: Result<StatusPayload, _> = engine
            .mutate("2", MutationKind::DeleteTag, drop_tag, async {
                Envelope::failure(Some(500), ApiError::Network {
                    status: Some(500),
                    message: "boom".to_string(),
                })
            })
            .await;
        assert!(matches!(result, Err(MutationError::Api(ApiError::Network { .. }))));
        assert_eq!(engine.cache().tags.get(&key), before);
        assert!(!engine.is_in_flight("2", MutationKind::DeleteTag));
    }

    #[tokio::test]
    async fn success_keeps_change_and_invalidates() {
        let (engine, key) = seeded().await;
        let result = engine
            .mutate("2", MutationKind::DeleteTag, drop_tag, async {
                Envelope::success(204, StatusPayload::default())
            })
            .await;
        assert_eq!(result, Ok(StatusPayload::default()));
        let entry = engine.cache().tags.get(&key).unwrap();
        assert_eq!(entry.status, crate::core::cache::FetchStatus::Idle);
    }

    #[tokio::test]
    async fn not_found_rolls_back_then_invalidates() {
        let (engine, key) = seeded().await;
        let result: Result<StatusPayload, _> = engine
            .mutate("2", MutationKind::DeleteTag, drop_tag, async {
                Envelope::failure(Some(404), ApiError::NotFound {
                    message: "gone".to_string(),
                })
            })
            .await;
        assert!(matches!(result, Err(MutationError::Api(ApiError::NotFound { .. }))));
        assert!(engine.cache().tags.get(&key).unwrap().pages.is_empty());
    }

    #[tokio::test]
    async fn second_mutation_for_same_entity_is_rejected() {
        let (engine, key) = seeded().await;
        let (tx, rx) = oneshot::channel::<Envelope<StatusPayload>>();
        let first = engine.mutate("2", MutationKind::DeleteTag, drop_tag, async move {
            rx.await.unwrap()
        });
        let second = async {
            tokio::task::yield_now().await;
            let applied = std::cell::Cell::new(false);
            let outcome: Result<StatusPayload, _> = engine
                .mutate(
                    "2",
                    MutationKind::DeleteTag,
                    |_| applied.set(true),
                    async { Envelope::success(200, StatusPayload::default()) },
                )
                .await;
            assert!(!applied.get());
            tx.send(Envelope::failure(Some(422), ApiError::Validation {
                message: "in use".to_string(),
                fields: BTreeMap::new(),
            }))
            .unwrap();
            outcome
        };
        let (first, second) = tokio::join!(first, second);
        assert!(matches!(second, Err(MutationError::InFlight { .. })));
        assert!(matches!(first, Err(MutationError::Api(ApiError::Validation { .. }))));
        assert_eq!(engine.cache().tags.get(&key).unwrap().items().count(), 2);
    }

    #[tokio::test]
    async fn dropped_mutation_resets_what_it_changed() {
        let (engine, key) = seeded().await;
        let (_answer, rx) = oneshot::channel::<Envelope<StatusPayload>>();
        let mut pending = Box::pin(engine.mutate(
            "2",
            MutationKind::DeleteTag,
            drop_tag,
            async move { rx.await.unwrap() },
        ));
        tokio::select! {
            biased;
            _ = &mut pending => panic!("the request has not been answered"),
            () = std::future::ready(()) => {}
        }
        assert!(engine.is_in_flight("2", MutationKind::DeleteTag));
        assert_eq!(engine.cache().tags.get(&key).unwrap().items().count(), 1);

        drop(pending);
        assert!(!engine.is_in_flight("2", MutationKind::DeleteTag));
        let entry = engine.cache().tags.get(&key).unwrap();
        assert_eq!(entry.status, crate::core::cache::FetchStatus::Idle);
        assert!(entry.pages.is_empty());
    }

    #[test]
    fn watched_toggle_only_invalidates_filtered_lists() {
        let patterns = MutationKind::SetWatched.invalidates();
        let plain = QueryKey::bare(Resource::Videos);
        assert!(patterns.iter().all(|pattern| !pattern.matches(&plain)));
        assert_eq!(MutationKind::Subscribe.to_string(), "subscribe");
    }
}
