//! Error types for the labrinth API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the project does not exist" from other failures. Other 4xx responses
//! carry the API's `{"error", "description"}` body when it decodes. 5xx
//! bodies are not read.

use serde::Deserialize;
use thiserror::Error;

use crate::types::ProjectStatus;

/// Errors returned by `LabrinthClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    /// A 4xx response other than 404.
    #[error("HTTP {status}: {description}")]
    Api {
        status: u16,
        error: String,
        description: String,
    },

    #[error("HTTP {status}: internal server error")]
    Server { status: u16 },

    /// A status outside 2xx/4xx/5xx.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("unsupported image file extension: {0}")]
    UnsupportedImage(String),

    #[error("project status {0:?} is not requestable")]
    StatusNotRequestable(ProjectStatus),
}

/// Error body the API returns alongside 4xx statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub description: String,
}
