//! Typed REST client over a [`Transport`].
//!
//! Every call returns an [`Envelope`]; nothing here fails with `Err` or panics.

use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use vidshelf_api_models::{
    ImportSummary, PaginatedResult, QuotaInfo, QuotaState, StatusPayload, Tag, TagAssignment,
    TagCreate, WatchedUpdate,
};

use crate::core::auth::Session;
use crate::core::cache::PageRequest;
use crate::core::envelope::{ApiError, Body, Envelope, ResponseClassifier};
use crate::core::filters::ApiParamSet;
use crate::core::query_key::Resource;
use crate::services::transport::{ApiRequest, Method, Transport};

/// Quota endpoint.
pub const QUOTA_PATH: &str = "/api/quota/";
/// Subscription import endpoint.
pub const IMPORT_PATH: &str = "/api/import/subscriptions/";

/// REST client bound to one backend.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Rc<dyn Transport>,
    classifier: ResponseClassifier,
    session: Session,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client for `base_url` (trailing slashes are trimmed).
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        transport: Rc<dyn Transport>,
        classifier: ResponseClassifier,
        session: Session,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            classifier,
            session,
        }
    }

    /// Backend base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn resolve_cursor(&self, resource: Resource, cursor: &str) -> String {
        if cursor.starts_with("http://") || cursor.starts_with("https://") {
            cursor.to_string()
        } else if cursor.starts_with('/') {
            self.url(cursor)
        } else {
            format!("{}{}", self.url(resource.path()), cursor)
        }
    }

    async fn send(&self, method: Method, url: String, body: Option<String>) -> Envelope<Body> {
        let mut request = ApiRequest::new(method, url);
        if let Some((name, value)) = self.session.auth_header() {
            request.headers.push((name.to_string(), value));
        }
        if body.is_some() {
            request
                .headers
                .push(("content-type".to_string(), "application/json".to_string()));
        }
        request.body = body;
        let url = request.url.clone();
        match self.transport.send(request).await {
            Ok(raw) => self.classifier.classify(&raw),
            Err(error) => self.classifier.transport_failure(&url, &error),
        }
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Envelope<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let encoded = match body.map(serde_json::to_string).transpose() {
            Ok(encoded) => encoded,
            Err(err) => {
                return Envelope::failure(
                    None,
                    ApiError::validation(format!("request body could not be encoded: {err}")),
                );
            }
        };
        self.send(method, self.url(path), encoded).await.decode()
    }

    /// Fetch one page of a list resource.
    ///
    /// The first page is built from `params`; later pages follow the cursor
    /// verbatim, which already carries the filter.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: Resource,
        params: &ApiParamSet,
        request: PageRequest,
    ) -> Envelope<PaginatedResult<T>> {
        let url = request.cursor.as_deref().map_or_else(
            || format!("{}{}", self.url(resource.path()), params.to_query_suffix()),
            |cursor| self.resolve_cursor(resource, cursor),
        );
        self.send(Method::Get, url, None).await.decode()
    }

    /// `PUT /api/videos/{id}/watched/`
    pub async fn set_watched(&self, video_id: &str, is_watched: bool) -> Envelope<StatusPayload> {
        let path = format!("/api/videos/{}/watched/", urlencoding::encode(video_id));
        self.send_json(Method::Put, &path, Some(&WatchedUpdate { is_watched }))
            .await
    }

    /// `PUT /api/videos/{id}/tags/`
    pub async fn set_video_tags(&self, video_id: &str, tags: &[String]) -> Envelope<StatusPayload> {
        let path = format!("/api/videos/{}/tags/", urlencoding::encode(video_id));
        let body = TagAssignment {
            tags: tags.to_vec(),
        };
        self.send_json(Method::Put, &path, Some(&body)).await
    }

    /// `POST /api/channels/{id}/subscribe/`
    pub async fn subscribe(&self, channel_id: &str) -> Envelope<StatusPayload> {
        let path = format!("/api/channels/{}/subscribe/", urlencoding::encode(channel_id));
        self.send_json::<_, ()>(Method::Post, &path, None).await
    }

    /// `DELETE /api/channels/{id}/subscribe/`
    pub async fn unsubscribe(&self, channel_id: &str) -> Envelope<StatusPayload> {
        let path = format!("/api/channels/{}/subscribe/", urlencoding::encode(channel_id));
        self.send_json::<_, ()>(Method::Delete, &path, None).await
    }

    /// `PUT /api/channels/{id}/tags/`
    pub async fn set_channel_tags(&self, channel_id: &str, tags: &[String]) -> Envelope<StatusPayload> {
        let path = format!("/api/channels/{}/tags/", urlencoding::encode(channel_id));
        let body = TagAssignment {
            tags: tags.to_vec(),
        };
        self.send_json(Method::Put, &path, Some(&body)).await
    }

    /// `POST /api/tags/`
    pub async fn create_tag(&self, name: &str, colour: Option<&str>) -> Envelope<Tag> {
        let body = TagCreate {
            name: name.to_string(),
            colour: colour.map(str::to_string),
        };
        self.send_json(Method::Post, Resource::Tags.path(), Some(&body))
            .await
    }

    /// `DELETE /api/tags/{id}/`
    pub async fn delete_tag(&self, tag_id: u64) -> Envelope<StatusPayload> {
        let path = format!("{}{tag_id}/", Resource::Tags.path());
        self.send_json::<_, ()>(Method::Delete, &path, None).await
    }

    /// `GET /api/quota/`
    ///
    /// Accepts either the full quota snapshot or the compact `used`/`limit` form.
    pub async fn fetch_quota(&self) -> Envelope<QuotaState> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum QuotaDto {
            Full(QuotaState),
            Compact(QuotaInfo),
        }
        self.send_json::<QuotaDto, ()>(Method::Get, QUOTA_PATH, None)
            .await
            .map(|dto| match dto {
                QuotaDto::Full(state) => state,
                QuotaDto::Compact(info) => QuotaState::from(info),
            })
    }

    /// `POST /api/import/subscriptions/`
    pub async fn import_subscriptions(&self) -> Envelope<ImportSummary> {
        self.send_json::<_, ()>(Method::Post, IMPORT_PATH, None).await
    }
}
