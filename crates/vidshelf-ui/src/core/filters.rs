//! Filter codec: browser URL parameters, in-memory filter state, and API query parameters.
//!
//! # Design
//! - Each channel scope owns a one-letter prefix so both lists can share one URL.
//! - Defaults are never written to the URL; decoding fills them back in.
//! - `tag_mode` only travels when more than one tag is selected.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use indexmap::IndexSet;
use thiserror::Error;

/// Longest tag name accepted by the backend.
pub const MAX_TAG_LENGTH: usize = 50;

const SEARCH: &str = "s";
const TAGS: &str = "ts";
const TAG_MODE: &str = "tm";
const PAGE: &str = "p";

/// How a multi-tag selection is combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TagMode {
    /// Items must carry every selected tag.
    All,
    /// Items carrying at least one selected tag.
    #[default]
    Any,
    /// Items carrying none of the selected tags.
    Except,
}

impl TagMode {
    /// Wire representation shared by URLs and API queries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
            Self::Except => "except",
        }
    }

    /// Parse a wire value, ignoring ASCII case.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "any" => Some(Self::Any),
            "except" => Some(Self::Except),
            _ => None,
        }
    }
}

impl fmt::Display for TagMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel list the filter applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Channels the user is subscribed to.
    #[default]
    Subscribed,
    /// Channels available for subscription.
    Available,
}

impl Scope {
    /// URL key prefix for the scope.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Subscribed => "s",
            Self::Available => "a",
        }
    }

    fn key(self, suffix: &str) -> String {
        format!("{}{suffix}", self.prefix())
    }
}

/// Watched-state filter for the video gallery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WatchFilter {
    /// No watched-state restriction.
    #[default]
    All,
    /// Only watched videos.
    Watched,
    /// Only unwatched videos.
    Unwatched,
}

impl WatchFilter {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Watched => "watched",
            Self::Unwatched => "unwatched",
        }
    }

    /// Parse a wire value, ignoring ASCII case.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "watched" => Some(Self::Watched),
            "unwatched" => Some(Self::Unwatched),
            _ => None,
        }
    }
}

/// Insertion-ordered, duplicate-free set of tag names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet(IndexSet<String>);

impl TagSet {
    /// Empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag; returns `false` when it was already selected.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    /// Remove a tag while keeping the order of the rest.
    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.shift_remove(tag)
    }

    /// Flip a tag's membership; returns whether it is selected afterwards.
    pub fn toggle(&mut self, tag: &str) -> bool {
        if self.remove(tag) {
            false
        } else {
            self.insert(tag)
        }
    }

    /// Whether the tag is selected.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Number of selected tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in selection order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Comma-joined form used on the wire.
    #[must_use]
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }

    /// Split a comma-joined list, dropping empty segments.
    #[must_use]
    pub fn from_joined(raw: &str) -> Self {
        raw.split(',').filter(|tag| !tag.is_empty()).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Search, tag selection and page for one channel list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterState {
    /// Free-text search.
    pub search: String,
    /// Selected tags, in the order the user picked them.
    pub selected_tags: TagSet,
    /// How multiple tags combine.
    pub tag_mode: TagMode,
    /// One-based page number.
    pub page: u32,
    /// List the state belongs to.
    pub scope: Scope,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(Scope::default())
    }
}

impl FilterState {
    /// Default state for a scope.
    #[must_use]
    pub fn new(scope: Scope) -> Self {
        Self {
            search: String::new(),
            selected_tags: TagSet::new(),
            tag_mode: TagMode::Any,
            page: 1,
            scope,
        }
    }

    /// Replace the search text and return to the first page.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    /// Toggle a tag and return to the first page.
    pub fn toggle_tag(&mut self, tag: &str) {
        self.selected_tags.toggle(tag);
        self.page = 1;
    }

    /// Change how tags combine and return to the first page.
    pub const fn set_tag_mode(&mut self, mode: TagMode) {
        self.tag_mode = mode;
        self.page = 1;
    }

    /// Jump to a page; zero is treated as the first page.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Tag mode that actually applies, present only for multi-tag selections.
    #[must_use]
    pub fn effective_tag_mode(&self) -> Option<TagMode> {
        (self.selected_tags.len() > 1).then_some(self.tag_mode)
    }

    /// Copy with `tag_mode` reset when it carries no meaning.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut next = self.clone();
        if next.effective_tag_mode().is_none() {
            next.tag_mode = TagMode::default();
        }
        next
    }
}

/// Ordered key/value view of a URL query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlParamSet(BTreeMap<String, String>);

impl UrlParamSet {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without the leading `?`.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .0
                .insert(decode_component(key), decode_component(value));
        }
        params
    }

    /// Value for a key; empty values read as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Set a key; empty values remove it instead.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    /// Drop a key.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Overlay another set; its keys win.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Whether the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Percent-encoded query string without the leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            if !out.is_empty() {
                out.push('&');
            }
            let _ = write!(
                out,
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            );
        }
        out
    }
}

impl fmt::Display for UrlParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).map_or_else(|_| spaced.clone(), std::borrow::Cow::into_owned)
}

/// Query parameters sent to the backend list endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiParamSet {
    /// Free-text search.
    pub search: Option<String>,
    /// Selected tags.
    pub tags: Option<Vec<String>>,
    /// Tag combination, only for multi-tag selections.
    pub tag_mode: Option<TagMode>,
    /// Watched-state filter (videos only).
    pub filter: Option<WatchFilter>,
    /// One-based page.
    pub page: Option<u32>,
    /// Requested page size.
    pub page_size: Option<u32>,
}

impl ApiParamSet {
    /// Copy with the page dropped, for cursor-driven loading.
    #[must_use]
    pub fn without_page(&self) -> Self {
        Self {
            page: None,
            ..self.clone()
        }
    }

    /// Copy with a page size attached.
    #[must_use]
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Name/value pairs in a stable order.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(tags) = &self.tags {
            pairs.push(("tags", tags.join(",")));
        }
        if let Some(mode) = self.tag_mode {
            pairs.push(("tag_mode", mode.as_str().to_string()));
        }
        if let Some(filter) = self.filter {
            pairs.push(("filter", filter.as_str().to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("page_size", page_size.to_string()));
        }
        pairs
    }

    /// Encoded query string, prefixed with `?` when non-empty.
    #[must_use]
    pub fn to_query_suffix(&self) -> String {
        let pairs = self.to_query_pairs();
        if pairs.is_empty() {
            return String::new();
        }
        let encoded: Vec<String> = pairs
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect();
        format!("?{}", encoded.join("&"))
    }
}

/// Encode a filter state under the scope's prefixed keys.
#[must_use]
pub fn to_url_params(state: &FilterState, scope: Scope) -> UrlParamSet {
    let mut params = UrlParamSet::new();
    params.insert(scope.key(SEARCH), state.search.clone());
    params.insert(scope.key(TAGS), state.selected_tags.joined());
    if let Some(mode) = state.effective_tag_mode() {
        params.insert(scope.key(TAG_MODE), mode.as_str());
    }
    if state.page > 1 {
        params.insert(scope.key(PAGE), state.page.to_string());
    }
    params
}

/// Decode the scope's keys into a filter state. Missing keys become defaults
/// and unparseable pages fall back to the first page.
#[must_use]
pub fn from_url_params(params: &UrlParamSet, scope: Scope) -> FilterState {
    FilterState {
        search: params.get(&scope.key(SEARCH)).unwrap_or_default().to_string(),
        selected_tags: params
            .get(&scope.key(TAGS))
            .map(TagSet::from_joined)
            .unwrap_or_default(),
        tag_mode: params
            .get(&scope.key(TAG_MODE))
            .and_then(TagMode::parse)
            .unwrap_or_default(),
        page: sanitize_page(params.get(&scope.key(PAGE))),
        scope,
    }
}

/// Map a filter state to backend list parameters.
#[must_use]
pub fn to_api_params(state: &FilterState) -> ApiParamSet {
    ApiParamSet {
        search: non_empty(&state.search),
        tags: tag_list(&state.selected_tags),
        tag_mode: state.effective_tag_mode(),
        filter: None,
        page: (state.page > 1).then_some(state.page),
        page_size: None,
    }
}

/// Encode both channel lists into one query string.
#[must_use]
pub fn encode_channel_query(subscribed: &FilterState, available: &FilterState) -> String {
    let mut params = to_url_params(subscribed, Scope::Subscribed);
    params.merge(to_url_params(available, Scope::Available));
    params.to_query_string()
}

/// Decode both channel lists from one query string.
#[must_use]
pub fn decode_channel_query(query: &str) -> (FilterState, FilterState) {
    let params = UrlParamSet::parse(query);
    (
        from_url_params(&params, Scope::Subscribed),
        from_url_params(&params, Scope::Available),
    )
}

/// Video gallery filters. The gallery has a single list, so keys are unprefixed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFilters {
    /// Watched-state restriction.
    pub watch: WatchFilter,
    /// Free-text search.
    pub search: String,
    /// Selected tags.
    pub selected_tags: TagSet,
    /// How multiple tags combine.
    pub tag_mode: TagMode,
    /// One-based page.
    pub page: u32,
    /// Explicit page size, when the user picked one.
    pub page_size: Option<u32>,
}

impl Default for VideoFilters {
    fn default() -> Self {
        Self {
            watch: WatchFilter::All,
            search: String::new(),
            selected_tags: TagSet::new(),
            tag_mode: TagMode::Any,
            page: 1,
            page_size: None,
        }
    }
}

impl VideoFilters {
    fn effective_tag_mode(&self) -> Option<TagMode> {
        (self.selected_tags.len() > 1).then_some(self.tag_mode)
    }

    /// URL parameters with defaults omitted.
    #[must_use]
    pub fn to_url_params(&self) -> UrlParamSet {
        let mut params = UrlParamSet::new();
        if self.watch != WatchFilter::All {
            params.insert("filter", self.watch.as_str());
        }
        params.insert("search", self.search.clone());
        params.insert("tags", self.selected_tags.joined());
        if let Some(mode) = self.effective_tag_mode() {
            params.insert("tag_mode", mode.as_str());
        }
        if self.page > 1 {
            params.insert("page", self.page.to_string());
        }
        if let Some(size) = self.page_size {
            params.insert("page_size", size.to_string());
        }
        params
    }

    /// Decode from URL parameters, tolerating junk values.
    #[must_use]
    pub fn from_url_params(params: &UrlParamSet) -> Self {
        Self {
            watch: params
                .get("filter")
                .and_then(WatchFilter::parse)
                .unwrap_or_default(),
            search: params.get("search").unwrap_or_default().to_string(),
            selected_tags: params
                .get("tags")
                .map(TagSet::from_joined)
                .unwrap_or_default(),
            tag_mode: params
                .get("tag_mode")
                .and_then(TagMode::parse)
                .unwrap_or_default(),
            page: sanitize_page(params.get("page")),
            page_size: params
                .get("page_size")
                .and_then(|raw| raw.trim().parse::<u32>().ok())
                .filter(|size| *size > 0),
        }
    }

    /// Backend list parameters.
    #[must_use]
    pub fn to_api_params(&self) -> ApiParamSet {
        ApiParamSet {
            search: non_empty(&self.search),
            tags: tag_list(&self.selected_tags),
            tag_mode: self.effective_tag_mode(),
            filter: (self.watch != WatchFilter::All).then_some(self.watch),
            page: (self.page > 1).then_some(self.page),
            page_size: self.page_size,
        }
    }
}

/// Tag name rejected before reaching the backend.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Blank after trimming.
    #[error("tag name must not be empty")]
    EmptyTag,
    /// Contains a character or length the wire format cannot carry.
    #[error("invalid tag name '{name}': {reason}")]
    InvalidTag {
        /// Offending tag name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Trim and validate a tag name for creation or assignment.
///
/// # Errors
///
/// Returns [`FilterError`] when the name is blank, contains a comma, or is
/// longer than [`MAX_TAG_LENGTH`] characters.
pub fn validate_tag_name(raw: &str) -> Result<String, FilterError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FilterError::EmptyTag);
    }
    if name.contains(',') {
        return Err(FilterError::InvalidTag {
            name: name.to_string(),
            reason: "commas separate tags",
        });
    }
    if name.chars().count() > MAX_TAG_LENGTH {
        return Err(FilterError::InvalidTag {
            name: name.to_string(),
            reason: "longer than 50 characters",
        });
    }
    Ok(name.to_string())
}

fn sanitize_page(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return 1;
    };
    match raw.trim().parse::<u32>() {
        Ok(page) if page >= 1 => page,
        _ => {
            tracing::debug!(value = raw, "ignoring invalid page parameter");
            1
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn tag_list(tags: &TagSet) -> Option<Vec<String>> {
    (!tags.is_empty()).then(|| tags.iter().map(str::to_string).collect())
}
