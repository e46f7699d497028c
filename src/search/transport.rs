//! Index Backend Transport
//!
//! The engine talks to the backend (and the monitor to individual shards) through
//! the `Transport` trait, one form-encoded POST per attempt. `ReqwestTransport` is
//! the production implementation; tests script their own.

use super::query::BackendRequest;
use super::types::ResultType;
use crate::error::{Error, Result};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_DATASETS_READ_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_FILES_READ_TIMEOUT_MS: u64 = 100_000;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues `request` and returns the response body. `read_timeout` bounds the
    /// whole exchange; `None` leaves it to the transport.
    async fn post(&self, request: &BackendRequest, read_timeout: Option<Duration>)
    -> Result<String>;
}

/// Timeouts applied to backend requests. A zero duration means "transport default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    pub connection: Duration,
    pub datasets_read: Duration,
    pub files_read: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::from_millis(
            DEFAULT_CONNECTION_TIMEOUT_MS,
            DEFAULT_DATASETS_READ_TIMEOUT_MS,
            DEFAULT_FILES_READ_TIMEOUT_MS,
        )
    }
}

impl TimeoutPolicy {
    pub fn from_millis(connection: u64, datasets_read: u64, files_read: u64) -> Self {
        Self {
            connection: Duration::from_millis(connection),
            datasets_read: Duration::from_millis(datasets_read),
            files_read: Duration::from_millis(files_read),
        }
    }

    pub fn connection_timeout(&self) -> Option<Duration> {
        non_zero(self.connection)
    }

    pub fn read_timeout(&self, result_type: ResultType) -> Option<Duration> {
        match result_type {
            ResultType::File => non_zero(self.files_read),
            ResultType::Dataset => non_zero(self.datasets_read),
        }
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(connection_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = connection_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build http client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(
        &self,
        request: &BackendRequest,
        read_timeout: Option<Duration>,
    ) -> Result<String> {
        let mut call = self
            .http_client
            .post(request.url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(request.query.clone());
        if let Some(timeout) = read_timeout {
            call = call.timeout(timeout);
        }

        let response = call
            .send()
            .await
            .map_err(|e| Error::transport(request.url.as_str(), e))?;

        if !response.status().is_success() {
            return Err(Error::Backend {
                target: request.url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| Error::transport(request.url.as_str(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_timeout_follows_result_type() {
        let policy = TimeoutPolicy::from_millis(500, 2_000, 30_000);
        assert_eq!(
            policy.read_timeout(ResultType::Dataset),
            Some(Duration::from_millis(2_000))
        );
        assert_eq!(
            policy.read_timeout(ResultType::File),
            Some(Duration::from_millis(30_000))
        );
        assert_eq!(policy.connection_timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_default_timeouts() {
        let policy = TimeoutPolicy::default();
        assert_eq!(policy.connection_timeout(), Some(Duration::from_secs(1)));
        assert_eq!(
            policy.read_timeout(ResultType::Dataset),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            policy.read_timeout(ResultType::File),
            Some(Duration::from_secs(100))
        );
    }

    #[test]
    fn test_zero_means_transport_default() {
        let policy = TimeoutPolicy::from_millis(0, 0, 5);
        assert_eq!(policy.connection_timeout(), None);
        assert_eq!(policy.read_timeout(ResultType::Dataset), None);
        assert_eq!(
            policy.read_timeout(ResultType::File),
            Some(Duration::from_millis(5))
        );
    }
}
