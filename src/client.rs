//! API Client Module
//!
//! Every backend call goes through [`ApiClient`]: the current credential is
//! attached on the way out, and failures are classified on the way back.
//! An authentication failure tears the session down and asks the UI to
//! return to the login entry point.

use std::sync::Arc;

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{SessionError, SessionStore};
use crate::config::ClientConfig;
use crate::events::{EventBus, Notice};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please log in again";
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "Authentication failed";
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in first";
pub const SESSION_SAVE_FAILED_MESSAGE: &str = "Could not save the session";

/// A single backend call, built per request
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Unencoded path segments, appended to the base URL
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    teardown_on_unauthorized: bool,
}

impl OutboundRequest {
    /// Start a request on a fixed route such as `/api/vehicles/`.
    /// A trailing slash is kept.
    pub fn new(method: Method, route: &str) -> Self {
        Self {
            method,
            segments: match route.trim_start_matches('/') {
                "" => Vec::new(),
                route => route.split('/').map(str::to_string).collect(),
            },
            query: Vec::new(),
            body: None,
            teardown_on_unauthorized: true,
        }
    }

    pub fn get(route: &str) -> Self {
        Self::new(Method::GET, route)
    }

    pub fn post(route: &str) -> Self {
        Self::new(Method::POST, route)
    }

    pub fn put(route: &str) -> Self {
        Self::new(Method::PUT, route)
    }

    pub fn delete(route: &str) -> Self {
        Self::new(Method::DELETE, route)
    }

    /// Append one path segment. Reserved characters such as `/` and `?`
    /// are percent-encoded, so the value can never change the route.
    pub fn segment(mut self, value: impl ToString) -> Self {
        self.segments.push(value.to_string());
        self
    }

    /// Path for logging, unencoded
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is given
    pub fn param_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Client(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// A 401 on this request is reported but does not end the session.
    /// Used for the login call itself, where 401 means bad credentials.
    pub fn without_session_teardown(mut self) -> Self {
        self.teardown_on_unauthorized = false;
        self
    }
}

/// Failure classes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unauthorized,
    RequestFailed,
}

/// Authenticated client for the telemetry backend
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
    session: Arc<SessionStore>,
    events: EventBus,
    login_path: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        config: &ClientConfig,
        session: Arc<SessionStore>,
        events: EventBus,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| ApiError::Client(format!("Invalid API URL {}: {}", config.api_base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Client(format!("Invalid API URL {}", config.api_base_url)));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            session,
            events,
            login_path: config.login_path.clone(),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Send a request and decode the JSON response body
    pub async fn send<T: DeserializeOwned>(&self, request: OutboundRequest) -> Result<T, ApiError> {
        let response = self.dispatch(&request).await?;

        match response.json::<T>().await {
            Ok(data) => Ok(data),
            Err(e) => Err(self.report(&request, None, ApiError::Decode(e.to_string()), None)),
        }
    }

    /// Send a request whose body is wrapped in a `{code, message, data}` envelope
    pub async fn send_enveloped<T: DeserializeOwned>(
        &self,
        request: OutboundRequest,
    ) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.send(request.clone()).await?;

        if !(200..300).contains(&envelope.code) {
            let error = ApiError::RequestFailed {
                status: u16::try_from(envelope.code).ok(),
                message: envelope.message.clone(),
            };
            return Err(self.report(&request, None, error, Some(&envelope.message)));
        }

        Ok(envelope.data)
    }

    /// Send a request and ignore the response body
    pub async fn execute(&self, request: OutboundRequest) -> Result<(), ApiError> {
        self.dispatch(&request).await.map(|_| ())
    }

    /// Send a request and return the raw response bytes
    pub async fn download(&self, request: OutboundRequest) -> Result<Vec<u8>, ApiError> {
        let response = self.dispatch(&request).await?;

        match response.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => {
                let error = ApiError::RequestFailed {
                    status: None,
                    message: e.to_string(),
                };
                Err(self.report(&request, None, error, None))
            }
        }
    }

    /// Surface a failure to persist the session after a successful call
    pub(crate) fn report_session_error(&self, error: SessionError) -> ApiError {
        warn!("Failed to save session: {}", error);
        self.events.notice(Notice::error(SESSION_SAVE_FAILED_MESSAGE));
        ApiError::Client(error.to_string())
    }

    /// Attach the credential, if any, and return the one attached. Never fails.
    fn prepare(&self, request: &OutboundRequest) -> (reqwest::RequestBuilder, Option<String>) {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(&request.segments);
        }

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let attached = self.session.access_token();
        if let Some(token) = &attached {
            builder = builder.bearer_auth(token);
        }
        (builder, attached)
    }

    async fn dispatch(&self, request: &OutboundRequest) -> Result<reqwest::Response, ApiError> {
        debug!("{} {}", request.method, request.path());

        let (builder, attached) = self.prepare(request);
        let attached = attached.as_deref();

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = ApiError::RequestFailed {
                    status: None,
                    message: e.to_string(),
                };
                return Err(self.report(request, attached, error, None));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .and_then(render_detail);

        let error = if status == StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized {
                message: detail.clone().unwrap_or_else(|| status.to_string()),
            }
        } else {
            ApiError::RequestFailed {
                status: Some(status.as_u16()),
                message: detail.clone().unwrap_or_else(|| format!("Status: {}", status)),
            }
        };

        Err(self.report(request, attached, error, detail.as_deref()))
    }

    /// Apply the side effects of a failure, then hand the error back.
    ///
    /// `attached` is the credential the request carried.
    fn report(
        &self,
        request: &OutboundRequest,
        attached: Option<&str>,
        error: ApiError,
        detail: Option<&str>,
    ) -> ApiError {
        warn!("{} {} failed: {}", request.method, request.path(), error);

        match error.kind() {
            FailureKind::Unauthorized if request.teardown_on_unauthorized => match attached {
                Some(token) if self.session.expire(token) => {
                    self.events.notice(Notice::error(SESSION_EXPIRED_MESSAGE));
                    self.events.navigate_to_login(&self.login_path);
                }
                // Expired, logged out or replaced since this request was sent
                Some(_) => debug!("Ignoring rejection of a credential that is no longer current"),
                None => {
                    let message = detail.unwrap_or(LOGIN_REQUIRED_MESSAGE);
                    self.events.notice(Notice::error(message));
                }
            },
            FailureKind::Unauthorized => {
                let message = detail.unwrap_or(AUTHENTICATION_FAILED_MESSAGE);
                self.events.notice(Notice::error(message));
            }
            FailureKind::RequestFailed => {
                let message = detail.unwrap_or(REQUEST_FAILED_MESSAGE);
                self.events.notice(Notice::error(message));
            }
        }

        error
    }
}

/// Body envelope used by the monitor endpoints
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

fn render_detail(detail: serde_json::Value) -> Option<String> {
    match detail {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Request failed: {message}")]
    RequestFailed { status: Option<u16>, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    /// The request never left this process
    #[error("Client error: {0}")]
    Client(String),
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Unauthorized { .. } => FailureKind::Unauthorized,
            _ => FailureKind::RequestFailed,
        }
    }

    /// HTTP status, when the backend answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            ApiError::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}
