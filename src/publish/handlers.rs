use super::service::PublishingService;
use crate::harvest::handlers::{HarvestRequest, HarvestResponse};

use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UnpublishIdsRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UnpublishIdsResponse {
    pub status: String,
    pub requested: usize,
    pub error: Option<String>,
}

pub async fn handle_publish(
    Extension(service): Extension<Arc<PublishingService>>,
    Json(req): Json<HarvestRequest>,
) -> (StatusCode, Json<HarvestResponse>) {
    match service
        .publish(&req.uri, req.recursive, req.repository_type)
        .await
    {
        Ok(report) => HarvestResponse::completed(report),
        Err(e) => {
            tracing::error!("Publishing {} failed: {}", req.uri, e);
            HarvestResponse::failed(&e)
        }
    }
}

pub async fn handle_unpublish(
    Extension(service): Extension<Arc<PublishingService>>,
    Json(req): Json<HarvestRequest>,
) -> (StatusCode, Json<HarvestResponse>) {
    match service
        .unpublish(&req.uri, req.recursive, req.repository_type)
        .await
    {
        Ok(report) => HarvestResponse::completed(report),
        Err(e) => {
            tracing::error!("Unpublishing {} failed: {}", req.uri, e);
            HarvestResponse::failed(&e)
        }
    }
}

pub async fn handle_unpublish_ids(
    Extension(service): Extension<Arc<PublishingService>>,
    Json(req): Json<UnpublishIdsRequest>,
) -> (StatusCode, Json<UnpublishIdsResponse>) {
    let requested = req.ids.len();
    match service.unpublish_ids(&req.ids).await {
        Ok(()) => (
            StatusCode::OK,
            Json(UnpublishIdsResponse {
                status: "completed".to_string(),
                requested,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Unpublishing {} id(s) failed: {}", requested, e);
            (
                e.status_code(),
                Json(UnpublishIdsResponse {
                    status: "failed".to_string(),
                    requested,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
