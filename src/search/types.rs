use crate::error::{Error, Result};
use crate::record::Record;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Wire format requested from the index backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnFormat {
    /// Structured markup; also the only format usable for shard diagnostics.
    #[default]
    Xml,
    Json,
}

impl ReturnFormat {
    /// Value of the backend's `wt` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnFormat::Xml => "xml",
            ReturnFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ReturnFormat::Xml => "application/xml",
            ReturnFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ReturnFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReturnFormat {
    type Err = Error;

    /// Accepts `xml`/`json` as well as their mime types.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" | "application/xml" | "text/xml" => Ok(ReturnFormat::Xml),
            "json" | "application/json" => Ok(ReturnFormat::Json),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Granularity of the requested results. File-level queries are slower and get a
/// longer read timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    Dataset,
    File,
}

impl ResultType {
    /// Value of the `type` field the records of this granularity carry.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Dataset => "Dataset",
            ResultType::File => "File",
        }
    }
}

impl FromStr for ResultType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dataset" => Ok(ResultType::Dataset),
            "file" => Ok(ResultType::File),
            _ => Err(Error::InvalidRequest(format!("unknown result type '{}'", s))),
        }
    }
}

pub const DEFAULT_LIMIT: usize = 10;

/// Field distinguishing dataset-level from file-level records.
pub const TYPE_FIELD: &str = "type";

/// One search request.
///
/// Built once per request. The recovery path never mutates it; it derives variants
/// with `with_distributed` / `with_format` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInput {
    /// Free-text query; `None` matches everything.
    pub text: Option<String>,
    /// Field name to accepted values. Values of one field are OR-ed, fields AND-ed.
    pub constraints: BTreeMap<String, Vec<String>>,
    pub facets: Vec<String>,
    pub distributed: bool,
    pub format: ReturnFormat,
    pub offset: usize,
    pub limit: usize,
    pub result_type: ResultType,
}

impl Default for SearchInput {
    fn default() -> Self {
        Self {
            text: None,
            constraints: BTreeMap::new(),
            facets: Vec::new(),
            distributed: true,
            format: ReturnFormat::default(),
            offset: 0,
            limit: DEFAULT_LIMIT,
            result_type: ResultType::default(),
        }
    }
}

impl SearchInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_constraint(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_constraint(name, value);
        self
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.constraints
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    pub fn with_facet(mut self, facet: impl Into<String>) -> Self {
        self.facets.push(facet.into());
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn with_distributed(mut self, distributed: bool) -> Self {
        self.distributed = distributed;
        self
    }

    pub fn with_format(mut self, format: ReturnFormat) -> Self {
        self.format = format;
        self
    }

    pub fn constraint(&self, name: &str) -> Option<&[String]> {
        self.constraints.get(name).map(Vec::as_slice)
    }

    /// The granularity actually queried. An explicit `type` constraint overrides
    /// `result_type`; any file-level value makes the whole request file-level.
    pub fn effective_result_type(&self) -> ResultType {
        let Some(values) = self.constraint(TYPE_FIELD) else {
            return self.result_type;
        };
        let parsed: Vec<ResultType> = values.iter().filter_map(|v| v.parse().ok()).collect();
        if parsed.contains(&ResultType::File) {
            ResultType::File
        } else {
            parsed.first().copied().unwrap_or(self.result_type)
        }
    }
}

/// Parsed backend response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutput {
    /// Total number of matches, not just the ones on this page.
    pub count: u64,
    pub offset: u64,
    pub records: Vec<Record>,
    /// Facet name to `(value, count)` pairs in backend order.
    pub facets: BTreeMap<String, Vec<(String, u64)>>,
}

impl SearchOutput {
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(Record::id).collect()
    }
}

/// The three phases of the recovery sequence, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attempt {
    /// Distributed over the current shard set.
    Distributed,
    /// Distributed over the shard set left after pruning.
    Pruned,
    /// Local index only.
    LocalOnly,
}

impl Attempt {
    pub const SEQUENCE: [Attempt; 3] = [Attempt::Distributed, Attempt::Pruned, Attempt::LocalOnly];

    pub fn next(self) -> Option<Attempt> {
        match self {
            Attempt::Distributed => Some(Attempt::Pruned),
            Attempt::Pruned => Some(Attempt::LocalOnly),
            Attempt::LocalOnly => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub attempt: Attempt,
    pub elapsed_ms: u64,
    /// `None` when the attempt succeeded.
    pub error: Option<String>,
}

/// The error of the final attempt together with every attempt made.
#[derive(Debug)]
pub struct TracedFailure {
    pub error: Error,
    pub attempts: Vec<AttemptOutcome>,
}

/// A raw backend response together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedResponse {
    pub body: String,
    pub attempts: Vec<AttemptOutcome>,
}
