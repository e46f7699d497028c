//! Error Taxonomy
//!
//! Every failure the harvesting pipeline and the federated search engine can surface
//! to a caller. Recoverable conditions (a malformed content unit, a failed query attempt)
//! are logged where they happen and only reach the caller when no fallback is left.

use crate::harvest::types::RepositoryType;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No crawler is wired for the requested repository type.
    #[error("Unsupported repository type: {0}")]
    UnsupportedRepositoryType(RepositoryType),

    #[error("Invalid crawl target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Network or I/O failure talking to a repository, a shard or the index backend.
    #[error("Transport failure for {target}: {message}")]
    Transport { target: String, message: String },

    /// The backend answered, but not with a success status.
    #[error("Backend at {target} answered with status {status}")]
    Backend { target: String, status: u16 },

    #[error("Malformed content at {uri}: {message}")]
    MalformedContent { uri: String, message: String },

    #[error("Consumer '{consumer}' failed on record {record_id}: {message}")]
    Consumer {
        consumer: String,
        record_id: String,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse backend response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn transport<E: std::fmt::Display>(target: impl Into<String>, e: E) -> Self {
        Self::Transport {
            target: target.into(),
            message: e.to_string(),
        }
    }

    pub fn malformed<E: std::fmt::Display>(uri: impl Into<String>, e: E) -> Self {
        Self::MalformedContent {
            uri: uri.into(),
            message: e.to_string(),
        }
    }

    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    /// Caller mistakes are 4xx, upstream failures 502, everything else 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UnsupportedRepositoryType(_)
            | Error::InvalidTarget { .. }
            | Error::InvalidRequest(_)
            | Error::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            Error::Transport { .. } | Error::Backend { .. } | Error::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::MalformedContent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Consumer { .. } | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
