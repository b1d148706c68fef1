//! Scripted transport: answers requests from a queue and records them.

use std::cell::RefCell;
use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use vidshelf_ui::core::envelope::RawResponse;
use vidshelf_ui::services::transport::{ApiRequest, Transport, TransportError};

enum Scripted {
    Ready(Result<RawResponse, TransportError>),
    Deferred(oneshot::Receiver<RawResponse>),
}

/// Transport that replays queued responses in order.
///
/// Running out of script is reported as a transport failure so a test sees an
/// unexpected request as an error envelope rather than a hang.
#[derive(Default)]
pub struct ScriptedTransport {
    script: RefCell<VecDeque<Scripted>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("pending", &self.script.borrow().len())
            .field("requests", &self.requests.borrow())
            .finish()
    }
}

impl ScriptedTransport {
    /// Empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push(&self, response: RawResponse) {
        self.script
            .borrow_mut()
            .push_back(Scripted::Ready(Ok(response)));
    }

    /// Queue a JSON response.
    pub fn push_json(&self, status: u16, body: &Value) {
        self.push(RawResponse::json("", status, body));
    }

    /// Queue a bodiless response.
    pub fn push_empty(&self, status: u16) {
        self.push(RawResponse {
            url: String::new(),
            status,
            content_type: None,
            body: Vec::new(),
        });
    }

    /// Queue a connection-level failure.
    pub fn push_failure(&self, message: &str) {
        self.script
            .borrow_mut()
            .push_back(Scripted::Ready(Err(TransportError::new(message))));
    }

    /// Queue a response the test releases later through the returned sender.
    pub fn push_deferred(&self) -> oneshot::Sender<RawResponse> {
        let (tx, rx) = oneshot::channel();
        self.script.borrow_mut().push_back(Scripted::Deferred(rx));
        tx
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    /// Most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.borrow().last().cloned()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.borrow().len()
    }
}

#[async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let url = request.url.clone();
        let next = self.script.borrow_mut().pop_front();
        let described = format!("{} {url}", request.method);
        self.requests.borrow_mut().push(request);
        let response = match next {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Deferred(rx)) => rx
                .await
                .map_err(|_| TransportError::new(format!("deferred response dropped for {described}"))),
            None => Err(TransportError::new(format!("no scripted response for {described}"))),
        }?;
        Ok(RawResponse { url, ..response })
    }
}
