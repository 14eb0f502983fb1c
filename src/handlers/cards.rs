use crate::error::AppError;
use crate::services::CardService;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct PurchaseCardRequest {
    pub tier: String,
}

#[derive(Deserialize)]
pub struct AwardXpRequest {
    pub xp: i64,
}

#[derive(Deserialize)]
pub struct BirthdayFreebieRequest {
    pub birthday_month: u32,
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let card = CardService::new(state.db.clone()).get_active_card(user_id).await?;
    Ok(Json(card))
}

pub async fn purchase(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<PurchaseCardRequest>,
) -> Result<impl IntoResponse, AppError> {
    let card = CardService::new(state.db.clone())
        .purchase_card(user_id, &body.tier)
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn renew(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let card = CardService::new(state.db.clone()).renew_card(user_id).await?;
    Ok(Json(card))
}

pub async fn award_xp(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<AwardXpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let card = CardService::new(state.db.clone())
        .award_xp(user_id, body.xp)
        .await?;
    Ok(Json(card))
}

pub async fn birthday_freebie(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<BirthdayFreebieRequest>,
) -> Result<impl IntoResponse, AppError> {
    let voucher = CardService::new(state.db.clone())
        .issue_birthday_freebie(user_id, body.birthday_month)
        .await?;
    Ok((StatusCode::CREATED, Json(voucher)))
}
