use crate::error::AppError;
use crate::services::PointsService;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct EarnRequest {
    pub amount: i64,
    pub source_type: String,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct RedeemRequest {
    pub amount: i64,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct AdjustRequest {
    pub amount: i64,
    pub notes: Option<String>,
}

pub async fn ledger(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ledger = PointsService::new(state.db.clone()).ledger(user_id).await?;
    Ok(Json(ledger))
}

pub async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let entries = PointsService::new(state.db.clone())
        .history(user_id, params.limit)
        .await?;
    Ok(Json(entries))
}

pub async fn earn(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<EarnRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = PointsService::new(state.db.clone())
        .earn(user_id, body.amount, &body.source_type, body.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn redeem(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RedeemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = PointsService::new(state.db.clone())
        .redeem(user_id, body.amount, body.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn adjust(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AdjustRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = PointsService::new(state.db.clone())
        .adjust(user_id, body.amount, body.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn tier_progress(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let progress = PointsService::new(state.db.clone())
        .tier_progress(user_id)
        .await?;
    Ok(Json(progress))
}

pub async fn list_tiers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tiers = PointsService::new(state.db.clone()).tiers().await?;
    Ok(Json(tiers))
}
