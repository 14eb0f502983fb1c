use crate::error::AppError;
use crate::services::WalletService;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SpendRequest {
    pub amount: i64,
    pub description: Option<String>,
}

pub async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let wallet = WalletService::new(state.db.clone()).get_wallet(user_id).await?;
    Ok(Json(wallet))
}

pub async fn ensure_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let wallet = WalletService::new(state.db.clone()).ensure_wallet(user_id).await?;
    Ok(Json(wallet))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let transactions = WalletService::new(state.db.clone())
        .list_transactions(user_id, params.limit)
        .await?;
    Ok(Json(transactions))
}

pub async fn list_pending_topups(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let pending = WalletService::new(state.db.clone())
        .list_pending_topups(user_id)
        .await?;
    Ok(Json(pending))
}

pub async fn spend(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SpendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let balances = WalletService::new(state.db.clone())
        .debit(user_id, body.amount, body.description)
        .await?;
    Ok(Json(balances))
}

pub async fn refund(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SpendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let balances = WalletService::new(state.db.clone())
        .refund(user_id, body.amount, body.description)
        .await?;
    Ok(Json(balances))
}
