//! Repository Content Sources
//!
//! A crawler reads raw content through a `ContentSource`. A URI either names a
//! document (handed to the extractor) or a collection (whose child URIs are
//! enumerated). Local directories and files are read through the filesystem,
//! network repositories over HTTP.

use crate::error::{Error, Result};

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Document(String),
    Collection(Vec<Url>),
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn read(&self, uri: &Url) -> Result<Content>;
}

/// Reads `file://` URIs. Directories are collections of their non-hidden entries,
/// listed in name order so crawls are reproducible.
#[derive(Debug, Clone, Default)]
pub struct FileSource;

#[async_trait]
impl ContentSource for FileSource {
    async fn read(&self, uri: &Url) -> Result<Content> {
        let path = uri.to_file_path().map_err(|_| Error::InvalidTarget {
            target: uri.to_string(),
            reason: "not a local file URI".to_string(),
        })?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Error::transport(uri.as_str(), e))?;

        if !metadata.is_dir() {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::transport(uri.as_str(), e))?;
            return Ok(Content::Document(text));
        }

        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| Error::transport(uri.as_str(), e))?;
        let mut children = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::transport(uri.as_str(), e))?
        {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            children.push(entry.path());
        }
        children.sort();

        let children = children
            .into_iter()
            .filter_map(|child| Url::from_file_path(child).ok())
            .collect();
        Ok(Content::Collection(children))
    }
}

/// Fetches `http(s)://` URIs. Remote repositories expose their structure through
/// content (paging tokens, catalog references), so every response is a document.
#[derive(Debug, Clone)]
pub struct HttpSource {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn read(&self, uri: &Url) -> Result<Content> {
        let response = self
            .http_client
            .get(uri.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::transport(uri.as_str(), e))?;

        if !response.status().is_success() {
            return Err(Error::Backend {
                target: uri.to_string(),
                status: response.status().as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(uri.as_str(), e))?;
        Ok(Content::Document(text))
    }
}

/// Routes each URI to the filesystem or HTTP source by scheme.
#[derive(Debug, Clone, Default)]
pub struct UriSource {
    files: FileSource,
    http: HttpSource,
}

impl UriSource {
    pub fn new(http_timeout: Duration) -> Self {
        Self {
            files: FileSource,
            http: HttpSource::new(http_timeout),
        }
    }
}

#[async_trait]
impl ContentSource for UriSource {
    async fn read(&self, uri: &Url) -> Result<Content> {
        match uri.scheme() {
            "file" => self.files.read(uri).await,
            "http" | "https" => self.http.read(uri).await,
            other => Err(Error::InvalidTarget {
                target: uri.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}
