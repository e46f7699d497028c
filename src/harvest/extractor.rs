//! Format-specific Record Extractors
//!
//! Turns one unit of raw repository content into records, plus the structural hints
//! the crawler needs to keep walking: a next page (resumption token) and references
//! to child collections.
//!
//! Markup is scanned with regular expressions for the handful of elements the
//! extraction contract needs; the repositories' full schemas are not modelled.

use super::types::RepositoryType;
use crate::error::{Error, Result};
use crate::record::Record;

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use url::Url;

static OAI_RECORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<record\b[^>]*>(.*?)</record>").expect("valid regex"));
static OAI_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<header\b([^>]*)>(.*?)</header>").expect("valid regex")
});
static OAI_DELETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"status\s*=\s*["']deleted["']"#).expect("valid regex"));
static OAI_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<identifier>\s*(.*?)\s*</identifier>").expect("valid regex")
});
static OAI_DATESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<datestamp>\s*(.*?)\s*</datestamp>").expect("valid regex")
});
static OAI_METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<metadata\b[^>]*>(.*)</metadata>").expect("valid regex"));
static OAI_RESUMPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<resumptionToken\b[^>]*>([^<]*)</resumptionToken>").expect("valid regex")
});
static OAI_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<error\b[^>]*code\s*=\s*["']([^"']+)["'][^>]*>([^<]*)</error>"#)
        .expect("valid regex")
});
static LEAF_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<((?:[\w.-]+:)?[\w.-]+)(?:\s[^>]*)?>([^<]+)</((?:[\w.-]+:)?[\w.-]+)>")
        .expect("valid regex")
});

/// What one content unit yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Live records and tombstones, in document order.
    pub records: Vec<Record>,
    /// Continuation of a paged listing; always followed.
    pub next_page: Option<Url>,
    /// Child collections; followed only by recursive crawls.
    pub references: Vec<Url>,
    /// Individual items that could not be turned into records.
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    Oai,
    Catalog,
}

impl Extractor {
    /// The extractor paired with a repository type; the generator has no raw
    /// content to extract from.
    pub fn for_repository(kind: RepositoryType) -> Option<Self> {
        match kind {
            RepositoryType::Generator => None,
            RepositoryType::Oai => Some(Extractor::Oai),
            RepositoryType::Catalog => Some(Extractor::Catalog),
        }
    }

    /// Fails only when the unit as a whole is unusable; bad items inside an
    /// otherwise valid unit are reported in `Extraction::rejected`.
    pub fn extract(&self, uri: &Url, content: &str) -> Result<Extraction> {
        match self {
            Extractor::Oai => extract_oai(uri, content),
            Extractor::Catalog => extract_catalog(uri, content),
        }
    }
}

fn extract_oai(uri: &Url, content: &str) -> Result<Extraction> {
    if let Some(cap) = OAI_ERROR.captures(content) {
        let code = &cap[1];
        if code == "noRecordsMatch" {
            return Ok(Extraction::default());
        }
        return Err(Error::malformed(
            uri.as_str(),
            format!("repository error {}: {}", code, cap[2].trim()),
        ));
    }

    if !content.contains("<ListRecords") && !content.contains("<GetRecord") {
        return Err(Error::malformed(
            uri.as_str(),
            "not an OAI-PMH ListRecords/GetRecord response",
        ));
    }

    let mut extraction = Extraction::default();

    for (position, cap) in OAI_RECORD.captures_iter(content).enumerate() {
        let body = &cap[1];

        let Some(header) = OAI_HEADER.captures(body) else {
            extraction
                .rejected
                .push(format!("record #{} has no header", position + 1));
            continue;
        };
        let identifier = OAI_IDENTIFIER
            .captures(&header[2])
            .map(|id| unescape(&id[1]))
            .filter(|id| !id.is_empty());
        let Some(identifier) = identifier else {
            extraction
                .rejected
                .push(format!("record #{} has no identifier", position + 1));
            continue;
        };

        if OAI_DELETED.is_match(&header[1]) {
            tracing::debug!("OAI record {} is marked deleted", identifier);
            extraction.records.push(Record::deletion(identifier));
            continue;
        }

        let mut record = Record::new(identifier);
        if let Some(stamp) = OAI_DATESTAMP.captures(&header[2]) {
            record.add_field("datestamp", unescape(&stamp[1]));
        }
        if let Some(metadata) = OAI_METADATA.captures(body) {
            for leaf in LEAF_ELEMENT.captures_iter(&metadata[1]) {
                if leaf[1] != leaf[3] {
                    continue;
                }
                let value = unescape(&leaf[2]);
                if value.is_empty() {
                    continue;
                }
                record.add_field(local_name(&leaf[1]), value);
            }
        }
        extraction.records.push(record);
    }

    if let Some(cap) = OAI_RESUMPTION.captures(content) {
        let token = cap[1].trim();
        if !token.is_empty() {
            if matches!(uri.scheme(), "http" | "https") {
                let mut next = uri.clone();
                next.query_pairs_mut()
                    .clear()
                    .append_pair("verb", "ListRecords")
                    .append_pair("resumptionToken", token);
                extraction.next_page = Some(next);
            } else {
                tracing::debug!("Ignoring resumption token in local document {}", uri);
            }
        }
    }

    Ok(extraction)
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    datasets: Vec<CatalogDataset>,
    #[serde(default)]
    catalogs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogDataset {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    fields: serde_json::Map<String, serde_json::Value>,
}

fn extract_catalog(uri: &Url, content: &str) -> Result<Extraction> {
    let catalog: CatalogDocument =
        serde_json::from_str(content).map_err(|e| Error::malformed(uri.as_str(), e))?;

    let mut extraction = Extraction::default();

    for (position, dataset) in catalog.datasets.into_iter().enumerate() {
        let Some(id) = dataset.id.filter(|id| !id.trim().is_empty()) else {
            extraction
                .rejected
                .push(format!("dataset #{} has no id", position + 1));
            continue;
        };

        if dataset.deleted {
            extraction.records.push(Record::deletion(id));
            continue;
        }

        let mut record = Record::new(id);
        for (name, value) in dataset.fields {
            for value in json_values(value) {
                record.add_field(name.clone(), value);
            }
        }
        extraction.records.push(record);
    }

    for reference in catalog.catalogs {
        match uri.join(&reference) {
            Ok(child) => extraction.references.push(child),
            Err(e) => extraction
                .rejected
                .push(format!("catalog reference '{}': {}", reference, e)),
        }
    }

    Ok(extraction)
}

fn json_values(value: serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::String(s) => vec![s],
        serde_json::Value::Array(items) => items.into_iter().flat_map(json_values).collect(),
        other => vec![other.to_string()],
    }
}

fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map(|(_, local)| local)
        .unwrap_or(qualified)
}

fn unescape(text: &str) -> String {
    text.trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
