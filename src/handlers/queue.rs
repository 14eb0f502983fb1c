use crate::error::AppError;
use crate::services::QueueService;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct JoinQueueRequest {
    pub customer_id: Uuid,
}

pub async fn join(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<JoinQueueRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = QueueService::new(state.db.clone())
        .join(branch_id, body.customer_id)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn call_next(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = QueueService::new(state.db.clone()).call_next(branch_id).await?;
    Ok(Json(entry))
}

pub async fn position(
    State(state): State<AppState>,
    Path(queue_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let position = QueueService::new(state.db.clone()).position(&queue_code).await?;
    Ok(Json(position))
}

pub async fn mark_served(
    State(state): State<AppState>,
    Path(queue_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = QueueService::new(state.db.clone()).mark_served(&queue_code).await?;
    Ok(Json(entry))
}

pub async fn leave(
    State(state): State<AppState>,
    Path(queue_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = QueueService::new(state.db.clone()).leave(&queue_code).await?;
    Ok(Json(entry))
}
