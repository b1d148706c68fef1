//! Transport seam between the API client and whatever performs HTTP.
//!
//! The browser build plugs in `gloo-net`, the CLI plugs in `reqwest`, and
//! tests plug in a scripted queue. Implementations report what the server
//! said; classification happens in [`crate::core::envelope`].

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::envelope::RawResponse;

/// HTTP verb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved outbound request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    /// Verb.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Extra headers (auth, content type).
    pub headers: Vec<(String, String)>,
    /// JSON body, already serialised.
    pub body: Option<String>,
}

impl ApiRequest {
    /// Request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The request never produced a response (DNS, refused, aborted, timeout).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    /// Underlying error text.
    pub message: String,
}

impl TransportError {
    /// Wrap an error message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Performs HTTP exchanges for the API client.
#[async_trait(?Send)]
pub trait Transport {
    /// Send a request and return the raw response, whatever its status.
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError>;
}
