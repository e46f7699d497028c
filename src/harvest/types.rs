//! Harvesting Data Types
//!
//! Repository tags, crawl targets and the summary a crawl hands back to its caller.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Identifies which crawler and extractor pair applies to a repository.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Synthetic records, no remote repository involved.
    Generator,
    /// OAI-PMH style repository (`ListRecords` responses, resumption tokens).
    Oai,
    /// Catalog style repository (JSON catalogs referencing child catalogs).
    Catalog,
}

impl RepositoryType {
    pub const ALL: [RepositoryType; 3] = [
        RepositoryType::Generator,
        RepositoryType::Oai,
        RepositoryType::Catalog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryType::Generator => "generator",
            RepositoryType::Oai => "oai",
            RepositoryType::Catalog => "catalog",
        }
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepositoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RepositoryType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidRequest(format!("unknown repository type '{}'", s)))
    }
}

/// The unit of work handed to a crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub uri: Url,
    pub recursive: bool,
}

impl CrawlTarget {
    pub fn new(uri: Url, recursive: bool) -> Self {
        Self { uri, recursive }
    }

    /// Accepts absolute URIs (`file://`, `http://`, ...) as well as plain
    /// filesystem paths, which are made absolute against the working directory.
    pub fn parse(target: &str, recursive: bool) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidTarget {
            target: target.to_string(),
            reason,
        };

        if target.trim().is_empty() {
            return Err(invalid("empty target".to_string()));
        }

        let uri = match Url::parse(target) {
            Ok(uri) if uri.scheme().len() > 1 => uri,
            // single-letter schemes are Windows drive letters, not URIs
            _ => {
                let path = std::path::absolute(target).map_err(|e| invalid(e.to_string()))?;
                Url::from_file_path(&path)
                    .map_err(|_| invalid("not an absolute path".to_string()))?
            }
        };

        Ok(Self { uri, recursive })
    }
}

/// A content unit that was skipped rather than aborting the crawl.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedUnit {
    pub uri: String,
    pub reason: String,
}

/// What one crawl invocation delivered to its subscribers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestReport {
    /// Content units fetched and handed to the extractor.
    pub documents: usize,
    /// Live records delivered to the add path.
    pub harvested: usize,
    /// Tombstones delivered to the delete path.
    pub deleted: usize,
    pub skipped: Vec<SkippedUnit>,
}

impl HarvestReport {
    pub fn skip(&mut self, uri: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedUnit {
            uri: uri.into(),
            reason: reason.into(),
        });
    }
}
