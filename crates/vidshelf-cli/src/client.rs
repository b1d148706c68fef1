//! HTTP transport, error types and the command context for the CLI.

use std::fmt::{self, Display, Formatter};
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use vidshelf_config::ClientConfig;
use vidshelf_ui::GalleryContext;
use vidshelf_ui::app::preferences::{MemoryStorage, persist_scroll_mode};
use vidshelf_ui::core::envelope::{ApiError, RawResponse};
use vidshelf_ui::core::mutations::MutationError;
use vidshelf_ui::core::ui::ScrollMode;
use vidshelf_ui::services::transport::{ApiRequest, Method, Transport, TransportError};

use crate::cli::OutputFormat;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type; each variant maps to its own exit code.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    AuthRequired(String),
    QuotaExceeded { used: u64, limit: u64 },
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::AuthRequired(_) => 4,
            Self::QuotaExceeded { .. } => 5,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::AuthRequired(path) => {
                format!("authentication required for {path} (pass --api-key or set VIDSHELF_API_KEY)")
            }
            Self::QuotaExceeded { used, limit } => {
                format!("YouTube API quota exhausted ({used}/{limit} units used today)")
            }
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ApiError> for CliError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::AuthRequired => Self::AuthRequired("the API".to_string()),
            ApiError::QuotaExceeded { quota } => Self::QuotaExceeded {
                used: quota.used,
                limit: quota.daily_limit,
            },
            ApiError::Validation { message, fields } => {
                let details: Vec<String> = fields
                    .iter()
                    .map(|(field, errors)| format!("{field}: {}", errors.join("; ")))
                    .collect();
                if details.is_empty() {
                    Self::Validation(message)
                } else {
                    Self::Validation(format!("{message} ({})", details.join(", ")))
                }
            }
            other => Self::Failure(anyhow!(other)),
        }
    }
}

impl From<MutationError> for CliError {
    fn from(error: MutationError) -> Self {
        match error {
            MutationError::Api(error) => error.into(),
            in_flight @ MutationError::InFlight { .. } => Self::Failure(anyhow!(in_flight)),
        }
    }
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Clone, Debug)]
pub(crate) struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client with the request timeout and a per-invocation request id.
    pub(crate) fn new(timeout_secs: u64, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

const fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(http_method(request.method), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::new(format!("request to {} failed: {err}", request.url)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::new(format!("failed to read response body: {err}")))?;
        Ok(RawResponse {
            url: request.url,
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Application context passed to command handlers.
#[derive(Debug)]
pub(crate) struct AppContext {
    pub(crate) gallery: GalleryContext,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Wire the gallery core over `transport`. Paging is always manual: the
    /// CLI asks for each extra page explicitly.
    pub(crate) fn new(config: ClientConfig, transport: Rc<dyn Transport>, output: OutputFormat) -> Self {
        let storage = Rc::new(MemoryStorage::new());
        persist_scroll_mode(storage.as_ref(), ScrollMode::Manual);
        Self {
            gallery: GalleryContext::new(config, transport, storage),
            output,
        }
    }

    /// Fail early with a readable message when no credentials are configured.
    pub(crate) fn require_credentials(&self) -> CliResult<()> {
        if self.gallery.session().is_authenticated() {
            Ok(())
        } else {
            Err(CliError::validation(
                "API key is required (pass --api-key or set VIDSHELF_API_KEY)",
            ))
        }
    }
}
