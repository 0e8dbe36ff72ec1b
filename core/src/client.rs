//! Stateless HTTP request builder and response parser for the labrinth API.
//!
//! # Design
//! `LabrinthClient` holds only its base URL and the identity headers it
//! stamps on every request. Each operation is split into a `build_*` method
//! that produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The caller executes the actual HTTP round-trip, keeping
//! the core deterministic and free of I/O dependencies.
//!
//! The per-endpoint operations live in `projects.rs`; this module holds the
//! plumbing they share.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, ErrorBody};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const API_BASE_URL: &str = "https://api.modrinth.com/v2";

const DEFAULT_USER_AGENT: &str = concat!("labrinth-rs/", env!("CARGO_PKG_VERSION"));

/// Synchronous, stateless client for the labrinth v2 API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct LabrinthClient {
    base_url: String,
    user_agent: String,
    token: Option<String>,
}

impl Default for LabrinthClient {
    fn default() -> Self {
        Self::new(API_BASE_URL)
    }
}

impl LabrinthClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            token: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Personal access token sent verbatim in the `authorization` header.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Parse a response whose success carries no payload (204 and friends).
    pub fn parse_empty(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_response(&response)
    }

    pub(crate) fn request(&self, method: HttpMethod, path: &str, query: &Query) -> HttpRequest {
        let mut headers = vec![("user-agent".to_string(), self.user_agent.clone())];
        if let Some(token) = &self.token {
            headers.push(("authorization".to_string(), token.clone()));
        }
        let request = HttpRequest {
            method,
            path: format!("{}{path}{}", self.base_url, query.encode()),
            headers,
            body: None,
        };
        tracing::debug!(method = method.as_str(), path = %request.path, "built request");
        request
    }

    pub(crate) fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query,
        body: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        let mut request = self.request(method, path, query);
        request
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));
        request.body = Some(body);
        Ok(request)
    }

    pub(crate) fn upload_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Query,
        content_type: &str,
        data: Vec<u8>,
    ) -> HttpRequest {
        let mut request = self.request(method, path, query);
        request
            .headers
            .push(("content-type".to_string(), content_type.to_string()));
        request.body = Some(data);
        request
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
///
/// Any 2xx is success. 4xx bodies are decoded as the API's error object;
/// 5xx bodies are ignored.
pub(crate) fn check_response(response: &HttpResponse) -> Result<(), ApiError> {
    let status = response.status;
    tracing::debug!(status, "parsing response");
    match status {
        200..=299 => Ok(()),
        404 => Err(ApiError::NotFound),
        400..=499 => {
            let body = serde_json::from_str::<ErrorBody>(&response.body).unwrap_or_else(|e| {
                tracing::warn!(status, "undecodable error body: {e}");
                ErrorBody::default()
            });
            Err(ApiError::Api {
                status,
                error: body.error,
                description: body.description,
            })
        }
        500..=u16::MAX => Err(ApiError::Server { status }),
        _ => Err(ApiError::Http {
            status,
            body: response.body.clone(),
        }),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_response(&response)?;
    serde_json::from_str(&response.body).map_err(ApiError::Deserialization)
}

/// Ordered query-string parameters. Values are percent-encoded on output.
#[derive(Debug, Default)]
pub(crate) struct Query {
    pairs: Vec<(&'static str, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &'static str, value: impl ToString) -> &mut Self {
        self.pairs.push((key, value.to_string()));
        self
    }

    pub fn push_opt<V: ToString>(&mut self, key: &'static str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// `?k=v&...`, or the empty string when there are no pairs.
    pub fn encode(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let joined = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{joined}")
    }
}

/// Percent-encode one path segment such as a project id or slug.
pub(crate) fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}
