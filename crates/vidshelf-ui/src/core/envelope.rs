//! Response envelope: every HTTP outcome becomes a structured value.
//!
//! # Design
//! - Classification never panics and never returns early through `?`; every
//!   status, body shape and transport failure maps to an [`Envelope`].
//! - 401 clears the session and publishes [`Signal::AuthRequired`] before the
//!   envelope reaches the caller.
//! - A `requires_youtube_reauth` flag on an error body publishes
//!   [`Signal::ReauthRequired`] and is surfaced on the envelope.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use vidshelf_api_models::{QuotaInfo, QuotaState};
use vidshelf_events::{Signal, SignalBus};

use crate::core::auth::Session;
use crate::services::transport::TransportError;

const REAUTH_FLAG: &str = "requires_youtube_reauth";
const QUOTA_INFO: &str = "quota_info";

/// Undecoded HTTP response as handed over by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    /// Requested URL, used for diagnostics and auth signals.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, when present.
    pub content_type: Option<String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// JSON response helper.
    #[must_use]
    pub fn json(url: impl Into<String>, status: u16, body: &Value) -> Self {
        Self {
            url: url.into(),
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string().into_bytes(),
        }
    }

    /// Plain text response helper.
    #[must_use]
    pub fn text(url: impl Into<String>, status: u16, body: &str) -> Self {
        Self {
            url: url.into(),
            status,
            content_type: Some("text/plain; charset=utf-8".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Decoded body, typed by content.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// No bytes at all.
    Empty,
    /// JSON document.
    Json(Value),
    /// UTF-8 text that is not JSON.
    Text(String),
    /// Anything else.
    Binary(Vec<u8>),
}

impl Body {
    fn from_raw(raw: &RawResponse) -> Self {
        if raw.body.is_empty() {
            return Self::Empty;
        }
        let content_type = raw
            .content_type
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let declared_json = content_type.contains("json");
        let declared_text = content_type.starts_with("text/");
        if (declared_json || content_type.is_empty())
            && let Ok(value) = serde_json::from_slice::<Value>(&raw.body)
        {
            return Self::Json(value);
        }
        if (declared_json || declared_text || content_type.is_empty())
            && let Ok(text) = String::from_utf8(raw.body.clone())
        {
            return Self::Text(text);
        }
        Self::Binary(raw.body.clone())
    }

    fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Json(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Classified failure carried by an [`Envelope`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ApiError {
    /// The backend answered 401.
    #[error("authentication required")]
    AuthRequired,
    /// The daily YouTube API budget is spent.
    #[error("daily API quota exceeded ({} of {} units used)", .quota.used, .quota.daily_limit)]
    QuotaExceeded {
        /// Quota snapshot from the error body.
        quota: QuotaState,
    },
    /// The request was rejected as invalid.
    #[error("{message}")]
    Validation {
        /// Summary message.
        message: String,
        /// Per-field messages, when the backend sent them.
        fields: BTreeMap<String, Vec<String>>,
    },
    /// The entity no longer exists.
    #[error("{message}")]
    NotFound {
        /// Message from the body.
        message: String,
    },
    /// Any other failure, including transport errors (`status` is `None` then).
    #[error("{message}")]
    Network {
        /// HTTP status, absent for transport failures.
        status: Option<u16>,
        /// Human-readable message.
        message: String,
    },
    /// A success response whose body did not match the expected shape.
    #[error("unexpected response body: {message}")]
    Malformed {
        /// Decoder message.
        message: String,
    },
}

impl ApiError {
    /// Short discriminator for logs and CLI output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Network { .. } => "network",
            Self::Malformed { .. } => "malformed",
        }
    }

    /// Whether retrying the same request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network { status: None, .. } => true,
            Self::Network {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    /// Validation error with a single message and no field detail.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }
}

/// Structured outcome of one API call.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope<T> {
    /// HTTP status, absent when the request never completed.
    pub status: Option<u16>,
    /// Decoded payload on success.
    pub data: Option<T>,
    /// Classified error on failure.
    pub error: Option<ApiError>,
    /// The error body asked for YouTube re-authorisation.
    pub reauth_required: bool,
}

impl<T> Envelope<T> {
    /// Successful envelope.
    #[must_use]
    pub const fn success(status: u16, data: T) -> Self {
        Self {
            status: Some(status),
            data: Some(data),
            error: None,
            reauth_required: false,
        }
    }

    /// Failed envelope.
    #[must_use]
    pub const fn failure(status: Option<u16>, error: ApiError) -> Self {
        Self {
            status,
            data: None,
            error: Some(error),
            reauth_required: false,
        }
    }

    /// Whether the call produced data.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none() && self.data.is_some()
    }

    /// Whether the call failed with 401.
    #[must_use]
    pub const fn auth_required(&self) -> bool {
        matches!(self.error, Some(ApiError::AuthRequired))
    }

    /// Quota snapshot when the call failed on an exhausted budget.
    #[must_use]
    pub const fn quota_exceeded(&self) -> Option<&QuotaState> {
        match &self.error {
            Some(ApiError::QuotaExceeded { quota }) => Some(quota),
            _ => None,
        }
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the classified error, or [`ApiError::Malformed`] when neither
    /// data nor error is present.
    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (Some(data), None) => Ok(data),
            (None, None) => Err(ApiError::Malformed {
                message: "response carried neither data nor error".to_string(),
            }),
        }
    }

    /// Transform the payload, keeping status and error.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            status: self.status,
            data: self.data.map(f),
            error: self.error,
            reauth_required: self.reauth_required,
        }
    }
}

impl Envelope<Body> {
    /// Decode the body into a typed payload.
    ///
    /// An empty success body decodes as `{}` (then `null`) so status-only
    /// endpoints can target structs with defaulted fields or `()`.
    #[must_use]
    pub fn decode<T: DeserializeOwned>(self) -> Envelope<T> {
        let Self {
            status,
            data,
            error,
            reauth_required,
        } = self;
        let data = match (data, error) {
            (_, Some(error)) => {
                return Envelope {
                    status,
                    data: None,
                    error: Some(error),
                    reauth_required,
                };
            }
            (Some(data), None) => data,
            (None, None) => Body::Empty,
        };
        let decoded = match data {
            Body::Json(value) => serde_json::from_value(value).map_err(|err| err.to_string()),
            Body::Empty => serde_json::from_value(Value::Object(Map::new()))
                .or_else(|_| serde_json::from_value(Value::Null))
                .map_err(|err| err.to_string()),
            Body::Text(text) => serde_json::from_value(Value::String(text))
                .map_err(|_| "expected JSON, received text".to_string()),
            Body::Binary(_) => Err("expected JSON, received binary data".to_string()),
        };
        match decoded {
            Ok(value) => Envelope {
                status,
                data: Some(value),
                error: None,
                reauth_required,
            },
            Err(message) => {
                warn!(status = ?status, %message, "failed to decode response body");
                Envelope {
                    status,
                    data: None,
                    error: Some(ApiError::Malformed { message }),
                    reauth_required,
                }
            }
        }
    }
}

/// Turns raw responses into envelopes and fires the auth-related signals.
#[derive(Clone, Debug)]
pub struct ResponseClassifier {
    bus: SignalBus,
    session: Session,
}

impl ResponseClassifier {
    /// Classifier publishing on `bus` and clearing `session` on 401.
    #[must_use]
    pub const fn new(bus: SignalBus, session: Session) -> Self {
        Self { bus, session }
    }

    /// Classify a completed HTTP exchange.
    #[must_use]
    pub fn classify(&self, raw: &RawResponse) -> Envelope<Body> {
        let body = Body::from_raw(raw);
        if raw.is_success() {
            debug!(status = raw.status, url = %raw.url, "request succeeded");
            return Envelope::success(raw.status, body);
        }

        let reauth_required = body
            .as_object()
            .and_then(|map| map.get(REAUTH_FLAG))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let message = error_message(raw.status, &body);
        if reauth_required {
            warn!(url = %raw.url, "backend requested YouTube re-authorisation");
            self.bus.publish(Signal::ReauthRequired {
                message: message.clone(),
            });
        }

        let error = match raw.status {
            401 => {
                warn!(url = %raw.url, "authentication required; clearing session");
                self.session.clear();
                self.bus.publish(Signal::AuthRequired {
                    path: request_path(&raw.url),
                });
                ApiError::AuthRequired
            }
            429 => quota_info(&body).map_or_else(
                || ApiError::Network {
                    status: Some(429),
                    message: message.clone(),
                },
                |quota| ApiError::QuotaExceeded { quota },
            ),
            400 | 422 => ApiError::Validation {
                message,
                fields: field_errors(&body),
            },
            404 => ApiError::NotFound { message },
            status => ApiError::Network {
                status: Some(status),
                message,
            },
        };
        debug!(status = raw.status, kind = error.kind(), url = %raw.url, "request failed");
        let mut envelope = Envelope::failure(Some(raw.status), error);
        envelope.reauth_required = reauth_required;
        envelope
    }

    /// Classify a request that never produced a response.
    #[must_use]
    pub fn transport_failure(&self, url: &str, error: &TransportError) -> Envelope<Body> {
        warn!(%url, error = %error, "transport failure");
        Envelope::failure(
            None,
            ApiError::Network {
                status: None,
                message: error.to_string(),
            },
        )
    }
}

fn error_message(status: u16, body: &Body) -> String {
    let fallback = || format!("request failed with status {status}");
    match body {
        Body::Json(Value::Object(map)) => ["message", "error", "detail"]
            .iter()
            .find_map(|key| map.get(*key).and_then(message_text))
            .or_else(|| {
                field_errors(body)
                    .into_iter()
                    .next()
                    .and_then(|(field, messages)| {
                        messages.first().map(|message| format!("{field}: {message}"))
                    })
            })
            .unwrap_or_else(fallback),
        Body::Json(value) => message_text(value).unwrap_or_else(fallback),
        Body::Text(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => fallback(),
    }
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Object(map) => map.get("message").and_then(message_text),
        Value::Array(items) => items.iter().find_map(message_text),
        _ => None,
    }
}

fn field_errors(body: &Body) -> BTreeMap<String, Vec<String>> {
    let Some(map) = body.as_object() else {
        return BTreeMap::new();
    };
    map.iter()
        .filter(|(key, _)| !matches!(key.as_str(), "message" | "error" | "detail" | REAUTH_FLAG))
        .filter_map(|(key, value)| {
            let messages: Vec<String> = match value {
                Value::Array(items) => items.iter().filter_map(message_text).collect(),
                Value::String(text) => vec![text.clone()],
                _ => Vec::new(),
            };
            (!messages.is_empty()).then(|| (key.clone(), messages))
        })
        .collect()
}

fn quota_info(body: &Body) -> Option<QuotaState> {
    let info = body.as_object()?.get(QUOTA_INFO)?.clone();
    serde_json::from_value::<QuotaInfo>(info).ok().map(QuotaState::from)
}

fn request_path(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .find('/')
        .map_or_else(|| "/".to_string(), |index| without_scheme[index..].to_string())
}
