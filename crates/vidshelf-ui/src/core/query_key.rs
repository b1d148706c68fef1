//! Canonical cache keys and the patterns used to invalidate them.

use std::fmt;

use crate::core::filters::{ApiParamSet, FilterState, Scope, VideoFilters, to_api_params};

/// Paginated backend collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    /// Video gallery.
    Videos,
    /// Subscribed channels.
    SubscribedChannels,
    /// Channels available for subscription.
    AvailableChannels,
    /// Tag catalogue.
    Tags,
}

impl Resource {
    /// Collection endpoint path.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Videos => "/api/videos/",
            Self::SubscribedChannels => "/api/channels/",
            Self::AvailableChannels => "/api/channels/available/",
            Self::Tags => "/api/tags/",
        }
    }

    /// Short label for logs and key signatures.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::SubscribedChannels => "channels.subscribed",
            Self::AvailableChannels => "channels.available",
            Self::Tags => "tags",
        }
    }

    /// Channel collection for a filter scope.
    #[must_use]
    pub const fn for_scope(scope: Scope) -> Self {
        match scope {
            Scope::Subscribed => Self::SubscribedChannels,
            Scope::Available => Self::AvailableChannels,
        }
    }
}

/// Identity of one cached list: a resource plus its canonical parameters.
///
/// Parameters are sorted by name and tag lists are sorted, so equal filter
/// states always produce equal keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: Resource,
    params: Vec<(String, String)>,
}

impl QueryKey {
    /// Key for a resource and parameter set.
    #[must_use]
    pub fn new(resource: Resource, params: &ApiParamSet) -> Self {
        let mut canonical = params.clone();
        if let Some(tags) = canonical.tags.as_mut() {
            tags.sort();
        }
        let mut pairs: Vec<(String, String)> = canonical
            .to_query_pairs()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        pairs.sort();
        Self {
            resource,
            params: pairs,
        }
    }

    /// Key for a resource with no parameters.
    #[must_use]
    pub fn bare(resource: Resource) -> Self {
        Self::new(resource, &ApiParamSet::default())
    }

    /// Key for a channel list filter.
    #[must_use]
    pub fn for_channels(state: &FilterState, page_size: Option<u32>) -> Self {
        Self::new(
            Resource::for_scope(state.scope),
            &to_api_params(state).with_page_size(page_size),
        )
    }

    /// Key for the video gallery.
    #[must_use]
    pub fn for_videos(filters: &VideoFilters) -> Self {
        Self::new(Resource::Videos, &filters.to_api_params())
    }

    /// Resource the key belongs to.
    #[must_use]
    pub const fn resource(&self) -> Resource {
        self.resource
    }

    /// Value of a parameter, if set.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Stable textual form, used for scroll bookkeeping.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut out = self.resource.as_str().to_string();
        for (index, (name, value)) in self.params.iter().enumerate() {
            out.push(if index == 0 { '?' } else { '&' });
            out.push_str(name);
            out.push('=');
            out.push_str(&urlencoding::encode(value));
        }
        out
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// Selector over cached keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyPattern {
    /// Every key.
    All,
    /// Every key of one resource.
    Resource(Resource),
    /// One exact key.
    Exact(QueryKey),
    /// Keys of a resource that carry the named parameter.
    WithParam {
        /// Resource to match.
        resource: Resource,
        /// Parameter that must be present.
        param: &'static str,
    },
}

impl KeyPattern {
    /// Whether the key is selected.
    #[must_use]
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::All => true,
            Self::Resource(resource) => key.resource == *resource,
            Self::Exact(exact) => key == exact,
            Self::WithParam { resource, param } => {
                key.resource == *resource && key.param(param).is_some()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::{TagMode, WatchFilter};

    #[test]
    fn equal_filters_give_equal_keys_regardless_of_tag_order() {
        let mut left = FilterState::new(Scope::Available);
        left.toggle_tag("b");
        left.toggle_tag("a");
        let mut right = FilterState::new(Scope::Available);
        right.toggle_tag("a");
        right.toggle_tag("b");
        right.set_tag_mode(TagMode::Any);
        assert_eq!(
            QueryKey::for_channels(&left, Some(24)),
            QueryKey::for_channels(&right, Some(24))
        );
        assert_eq!(
            QueryKey::for_channels(&left, Some(24)).signature(),
            "channels.available?page_size=24&tag_mode=any&tags=a%2Cb"
        );
    }

    #[test]
    fn scopes_produce_distinct_keys() {
        let subscribed = QueryKey::for_channels(&FilterState::new(Scope::Subscribed), None);
        let available = QueryKey::for_channels(&FilterState::new(Scope::Available), None);
        assert_ne!(subscribed, available);
        assert_eq!(subscribed.resource().path(), "/api/channels/");
    }

    #[test]
    fn patterns_select_expected_keys() {
        let plain = QueryKey::for_videos(&VideoFilters::default());
        let watched = QueryKey::for_videos(&VideoFilters {
            watch: WatchFilter::Watched,
            ..VideoFilters::default()
        });
        let tags = QueryKey::bare(Resource::Tags);

        let with_filter = KeyPattern::WithParam {
            resource: Resource::Videos,
            param: "filter",
        };
        assert!(with_filter.matches(&watched));
        assert!(!with_filter.matches(&plain));
        assert!(KeyPattern::Resource(Resource::Videos).matches(&plain));
        assert!(!KeyPattern::Resource(Resource::Videos).matches(&tags));
        assert!(KeyPattern::Exact(tags.clone()).matches(&tags));
        assert!(KeyPattern::All.matches(&watched));
        assert_eq!(watched.param("filter"), Some("watched"));
    }
}
