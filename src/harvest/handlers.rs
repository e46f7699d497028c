use super::dispatcher::HarvestDispatcher;
use super::types::{HarvestReport, RepositoryType};
use crate::error::Error;

use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct HarvestRequest {
    pub uri: String,
    #[serde(default)]
    pub recursive: bool,
    pub repository_type: RepositoryType,
}

#[derive(Debug, Serialize)]
pub struct HarvestResponse {
    pub status: String,
    pub report: Option<HarvestReport>,
    pub error: Option<String>,
}

impl HarvestResponse {
    pub fn completed(report: HarvestReport) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                status: "completed".to_string(),
                report: Some(report),
                error: None,
            }),
        )
    }

    pub fn failed(error: &Error) -> (StatusCode, Json<Self>) {
        (
            error.status_code(),
            Json(Self {
                status: "failed".to_string(),
                report: None,
                error: Some(error.to_string()),
            }),
        )
    }
}

pub async fn handle_harvest(
    Extension(dispatcher): Extension<Arc<HarvestDispatcher>>,
    Json(req): Json<HarvestRequest>,
) -> (StatusCode, Json<HarvestResponse>) {
    match dispatcher
        .harvest(&req.uri, req.recursive, req.repository_type)
        .await
    {
        Ok(report) => HarvestResponse::completed(report),
        Err(e) => {
            tracing::error!("Harvest of {} failed: {}", req.uri, e);
            HarvestResponse::failed(&e)
        }
    }
}
