use super::engine::FederatedSearchEngine;
use super::parser;
use super::types::{AttemptOutcome, ResultType, ReturnFormat, SearchInput, SearchOutput};
use crate::error::{Error, Result};

use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: String,
    pub output: Option<SearchOutput>,
    pub attempts: Vec<AttemptOutcome>,
    pub error: Option<String>,
}

impl SearchResponse {
    fn failed(error: &Error, attempts: Vec<AttemptOutcome>) -> (StatusCode, Json<Self>) {
        (
            error.status_code(),
            Json(Self {
                status: "failed".to_string(),
                output: None,
                attempts,
                error: Some(error.to_string()),
            }),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ShardsResponse {
    pub registry_enabled: bool,
    pub shards: Vec<String>,
}

/// Builds a `SearchInput` from query parameters.
///
/// `q`, `offset`, `limit`, `format`, `distrib`, `type` and `facets` (comma separated)
/// are reserved; every other parameter is a field constraint and may repeat.
pub fn search_input(params: &[(String, String)]) -> Result<SearchInput> {
    let mut input = SearchInput::new();

    for (name, value) in params {
        match name.as_str() {
            "q" | "query" => input.text = Some(value.clone()),
            "offset" => input.offset = number(name, value)?,
            "limit" => input.limit = number(name, value)?,
            "format" => input.format = value.parse::<ReturnFormat>()?,
            "distrib" => input.distributed = flag(name, value)?,
            "type" => input.result_type = value.parse::<ResultType>()?,
            "facets" => input.facets.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|facet| !facet.is_empty())
                    .map(str::to_string),
            ),
            _ => input.add_constraint(name.clone(), value.clone()),
        }
    }

    Ok(input)
}

fn flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidRequest(format!(
            "'{}' is not a valid {}, expected true or false",
            value, name
        ))),
    }
}

fn number(name: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| Error::InvalidRequest(format!("'{}' is not a valid {}", value, name)))
}

pub async fn handle_search(
    Extension(engine): Extension<Arc<FederatedSearchEngine>>,
    Query(params): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<SearchResponse>) {
    let input = match search_input(&params) {
        Ok(input) => input,
        Err(e) => return SearchResponse::failed(&e, Vec::new()),
    };

    let traced = match engine.query_traced(&input).await {
        Ok(traced) => traced,
        Err(failure) => {
            tracing::error!("Search failed after all attempts: {}", failure.error);
            return SearchResponse::failed(&failure.error, failure.attempts);
        }
    };

    match parser::parse(&traced.body, input.format) {
        Ok(output) => (
            StatusCode::OK,
            Json(SearchResponse {
                status: "ok".to_string(),
                output: Some(output),
                attempts: traced.attempts,
                error: None,
            }),
        ),
        Err(e) => SearchResponse::failed(&e, traced.attempts),
    }
}

pub async fn handle_shards(
    Extension(engine): Extension<Arc<FederatedSearchEngine>>,
) -> Json<ShardsResponse> {
    let (registry_enabled, shards): (bool, Vec<String>) = match engine.registry() {
        Some(registry) => (true, registry.get_shards().await.iter().cloned().collect()),
        None => (false, Vec::new()),
    };

    Json(ShardsResponse {
        registry_enabled,
        shards,
    })
}
