//! Backend Query Construction
//!
//! Translates a `SearchInput` into the form-encoded request the index backend's
//! `select` endpoint expects: `q`, one `fq` per constrained field plus one for the
//! result type, facet fields, paging, `wt`, and, for distributed requests, the
//! comma-separated `shards` list.

use super::types::{SearchInput, TYPE_FIELD};
use crate::error::{Error, Result};

use std::collections::BTreeSet;
use url::Url;
use url::form_urlencoded;

/// A request ready for the transport: the endpoint plus a form-encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub url: Url,
    pub query: String,
}

impl BackendRequest {
    /// Every value of parameter `name`, in request order.
    pub fn params(&self, name: &str) -> Vec<String> {
        form_urlencoded::parse(self.query.as_bytes())
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .collect()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.params(name).into_iter().next()
    }

    /// Shards named by the request; empty for local-only requests.
    pub fn shards(&self) -> Vec<String> {
        self.param("shards")
            .map(|list| list.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    select_url: Url,
}

impl QueryBuilder {
    pub fn new(backend_url: &str) -> Result<Self> {
        let base = Url::parse(&format!("{}/", backend_url.trim_end_matches('/')))
            .map_err(|e| Error::Config(format!("invalid backend url '{}': {}", backend_url, e)))?;
        let select_url = base
            .join("select")
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { select_url })
    }

    pub fn select_url(&self) -> &Url {
        &self.select_url
    }

    pub fn build(&self, input: &SearchInput, shards: &BTreeSet<String>) -> BackendRequest {
        BackendRequest {
            url: self.select_url.clone(),
            query: build_query_string(input, shards),
        }
    }
}

/// The form-encoded parameters for `input`. Shards are only listed when the
/// request is distributed.
pub fn build_query_string(input: &SearchInput, shards: &BTreeSet<String>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());

    let text = input
        .text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or("*:*");
    query.append_pair("q", text);

    for (field, values) in &input.constraints {
        if let Some(filter) = filter_query(field, values) {
            query.append_pair("fq", &filter);
        }
    }
    if !input.constraints.contains_key(TYPE_FIELD) {
        let filter = format!("{}:\"{}\"", TYPE_FIELD, input.effective_result_type().as_str());
        query.append_pair("fq", &filter);
    }

    if !input.facets.is_empty() {
        query.append_pair("facet", "true");
        query.append_pair("facet.mincount", "1");
        query.append_pair("facet.sort", "lex");
        for facet in &input.facets {
            query.append_pair("facet.field", facet);
        }
    }

    query.append_pair("start", &input.offset.to_string());
    query.append_pair("rows", &input.limit.to_string());
    query.append_pair("wt", input.format.as_str());

    if input.distributed && !shards.is_empty() {
        let list: Vec<&str> = shards.iter().map(String::as_str).collect();
        query.append_pair("shards", &list.join(","));
    }
    query.append_pair("distrib", if input.distributed { "true" } else { "false" });

    query.finish()
}

/// `field:"v"` for one value, `field:("a" OR "b")` for several.
fn filter_query(field: &str, values: &[String]) -> Option<String> {
    let quoted: Vec<String> = values
        .iter()
        .filter(|value| !value.is_empty())
        .map(|value| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();

    match quoted.len() {
        0 => None,
        1 => Some(format!("{}:{}", field, quoted[0])),
        _ => Some(format!("{}:({})", field, quoted.join(" OR "))),
    }
}
