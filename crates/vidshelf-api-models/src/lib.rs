#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the Vidshelf gallery API.
//!
//! These types mirror the JSON the backend emits for list endpoints, mutation
//! acknowledgements and quota snapshots. The client core and the CLI both
//! decode through them so the wire contract lives in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page of results returned by every list endpoint.
///
/// `results` keeps the server ordering; clients never re-sort it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginatedResult<T> {
    /// Total number of matching items across all pages.
    pub count: u64,
    /// Cursor (absolute or relative URL) for the next page.
    #[serde(default)]
    pub next: Option<String>,
    /// Cursor for the previous page.
    #[serde(default)]
    pub previous: Option<String>,
    /// Items on this page in server order.
    pub results: Vec<T>,
}

impl<T> PaginatedResult<T> {
    /// Single terminal page holding every item.
    #[must_use]
    pub fn single(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }

    /// Whether the server advertised another page.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Video row as listed by `/api/videos/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    /// Stable identifier (the YouTube video id).
    pub id: String,
    /// Video title.
    pub title: String,
    /// Owning channel identifier.
    pub channel_id: String,
    /// Owning channel title when the backend includes it.
    #[serde(default)]
    pub channel_title: Option<String>,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Publication timestamp.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// ISO-8601 duration string as reported by YouTube.
    #[serde(default)]
    pub duration: Option<String>,
    /// Watch flag for the current user.
    #[serde(default)]
    pub is_watched: bool,
    /// When the video was marked watched.
    #[serde(default)]
    pub watched_at: Option<DateTime<Utc>>,
    /// Tag names assigned to the video.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Channel row as listed by the subscribed and available channel endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Stable identifier.
    pub id: String,
    /// Channel title.
    pub title: String,
    /// Channel description.
    #[serde(default)]
    pub description: Option<String>,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Whether the current user is subscribed.
    #[serde(default)]
    pub is_subscribed: bool,
    /// Number of known videos.
    #[serde(default)]
    pub video_count: Option<u64>,
    /// Tag names assigned to the channel.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// User-defined tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Server-assigned identifier.
    pub id: u64,
    /// Unique tag name.
    pub name: String,
    /// Optional display colour (`#rrggbb`).
    #[serde(default)]
    pub colour: Option<String>,
    /// Number of channels carrying the tag.
    #[serde(default)]
    pub channel_count: u64,
    /// Number of videos carrying the tag.
    #[serde(default)]
    pub video_count: u64,
}

/// Small acknowledgement returned by mutation endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusPayload {
    /// Short status word (`ok`, `subscribed`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// Optional human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Body for `PUT /api/videos/{id}/watched/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchedUpdate {
    /// New watch flag.
    pub is_watched: bool,
}

/// Body for tag assignment endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagAssignment {
    /// Complete list of tag names after the assignment.
    pub tags: Vec<String>,
}

/// Body for `POST /api/tags/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCreate {
    /// Tag name.
    pub name: String,
    /// Optional display colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
}

/// Result of a subscription import run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    /// Channels newly subscribed.
    #[serde(default)]
    pub imported: u64,
    /// Channels already present.
    #[serde(default)]
    pub skipped: u64,
    /// Channels seen in the upstream account.
    #[serde(default)]
    pub total: u64,
}

/// Coarse quota pressure bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    /// Under half of the daily budget used.
    Normal,
    /// Between half and 80%.
    Moderate,
    /// Between 80% and 95%.
    High,
    /// 95% or more.
    Critical,
}

impl QuotaStatus {
    /// Bucket a usage percentage.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage < 50.0 {
            Self::Normal
        } else if percentage < 80.0 {
            Self::Moderate
        } else if percentage < 95.0 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

/// Read-only quota snapshot surfaced by `/api/quota/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaState {
    /// Daily unit budget.
    pub daily_limit: u64,
    /// Units consumed today.
    pub used: u64,
    /// Units left today.
    pub remaining: u64,
    /// `used / daily_limit` as a percentage.
    pub percentage_used: f64,
    /// Pressure bucket.
    pub status: QuotaStatus,
}

impl QuotaState {
    /// Build a snapshot from raw usage numbers.
    #[must_use]
    pub fn from_usage(used: u64, daily_limit: u64) -> Self {
        let remaining = daily_limit.saturating_sub(used);
        let percentage_used = if daily_limit == 0 {
            100.0
        } else {
            // Quota numbers stay far below 2^52, so the conversion is exact.
            #[allow(clippy::cast_precision_loss)]
            let ratio = used as f64 / daily_limit as f64;
            ratio * 100.0
        };
        Self {
            daily_limit,
            used,
            remaining,
            percentage_used,
            status: QuotaStatus::from_percentage(percentage_used),
        }
    }

    /// Whether an import may be started under this snapshot.
    #[must_use]
    pub fn can_import(&self) -> bool {
        self.remaining > 0 && self.status != QuotaStatus::Critical
    }
}

/// `quota_info` object carried by a 429 response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaInfo {
    /// Units consumed today.
    pub used: u64,
    /// Daily unit budget.
    pub limit: u64,
    /// Units left, when the backend reports it.
    #[serde(default)]
    pub remaining: Option<u64>,
}

impl From<QuotaInfo> for QuotaState {
    fn from(info: QuotaInfo) -> Self {
        let mut state = Self::from_usage(info.used, info.limit);
        if let Some(remaining) = info.remaining {
            state.remaining = remaining;
        }
        state
    }
}
