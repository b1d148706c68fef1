//! Browser transport built on `gloo-net`.

use async_trait::async_trait;
use gloo_net::http::{Method as HttpMethod, Request};

use crate::core::envelope::RawResponse;
use crate::services::transport::{ApiRequest, Method, Transport, TransportError};

/// `fetch`-backed transport for the wasm build.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTransport;

const fn http_method(method: Method) -> HttpMethod {
    match method {
        Method::Get => HttpMethod::GET,
        Method::Post => HttpMethod::POST,
        Method::Put => HttpMethod::PUT,
        Method::Delete => HttpMethod::DELETE,
    }
}

#[async_trait(?Send)]
impl Transport for BrowserTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let mut builder = Request::new(&request.url).method(http_method(request.method));
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::new(err.to_string()))?;
        let status = response.status();
        let content_type = response.headers().get("content-type");
        let body = response
            .binary()
            .await
            .map_err(|err| TransportError::new(err.to_string()))?;
        Ok(RawResponse {
            url: request.url,
            status,
            content_type,
            body,
        })
    }
}
