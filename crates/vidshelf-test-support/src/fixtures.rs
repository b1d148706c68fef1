//! Model fixtures and canned response bodies.

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use vidshelf_api_models::{Channel, PaginatedResult, Tag, Video};

/// Base URL the fixtures pretend to talk to.
pub const TEST_BASE_URL: &str = "http://vidshelf.test";

/// Video `id` on channel `UC1`.
#[must_use]
pub fn video(id: &str, is_watched: bool) -> Video {
    Video {
        id: id.to_string(),
        title: format!("Video {id}"),
        channel_id: "UC1".to_string(),
        channel_title: Some("Channel UC1".to_string()),
        thumbnail_url: None,
        published_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single(),
        duration: Some("PT4M13S".to_string()),
        is_watched,
        watched_at: None,
        tags: Vec::new(),
    }
}

/// Channel `id` with the given subscription flag.
#[must_use]
pub fn channel(id: &str, is_subscribed: bool) -> Channel {
    Channel {
        id: id.to_string(),
        title: format!("Channel {id}"),
        description: None,
        thumbnail_url: None,
        is_subscribed,
        video_count: Some(3),
        tags: Vec::new(),
    }
}

/// Tag with zero usage counts.
#[must_use]
pub fn tag(id: u64, name: &str) -> Tag {
    Tag {
        id,
        name: name.to_string(),
        colour: None,
        channel_count: 0,
        video_count: 0,
    }
}

/// One page of results with an optional next cursor.
#[must_use]
pub fn page<T>(results: Vec<T>, count: u64, next: Option<&str>) -> PaginatedResult<T> {
    PaginatedResult {
        count,
        next: next.map(str::to_string),
        previous: None,
        results,
    }
}

/// JSON body of a paginated response.
#[must_use]
pub fn page_body<T: serde::Serialize>(results: &[T], count: u64, next: Option<&str>) -> Value {
    json!({
        "count": count,
        "next": next,
        "previous": null,
        "results": results,
    })
}

/// Absolute next-page cursor the backend would emit for `path`.
#[must_use]
pub fn next_cursor(path: &str, page: u32) -> String {
    format!("{TEST_BASE_URL}{path}?page={page}")
}

/// Error body in the backend's `{"error": ...}` shape.
#[must_use]
pub fn error_body(message: &str) -> Value {
    json!({ "error": message })
}

/// 429 body carrying a quota snapshot.
#[must_use]
pub fn quota_exceeded_body(used: u64, limit: u64) -> Value {
    json!({
        "error": "YouTube API quota exceeded",
        "quota_info": { "used": used, "limit": limit, "remaining": limit.saturating_sub(used) },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_body_matches_model_shape() {
        let body = page_body(&[video("a", false)], 1, Some("next"));
        let decoded: PaginatedResult<Video> = serde_json::from_value(body).unwrap();
        assert_eq!(decoded, page(vec![video("a", false)], 1, Some("next")));
    }
}
