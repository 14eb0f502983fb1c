use crate::error::AppError;
use crate::services::VoucherService;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateVoucherRequest {
    pub value: i64,
    pub max_uses: i32,
    pub expires_at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct VoucherActionRequest {
    pub code: String,
    pub user_id: Uuid,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateVoucherRequest>,
) -> Result<impl IntoResponse, AppError> {
    let voucher = VoucherService::new(state.db.clone())
        .create_voucher(
            body.value,
            body.max_uses,
            body.expires_at,
            body.user_id,
            body.code,
            body.description,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(voucher)))
}

pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<VoucherActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let voucher = VoucherService::new(state.db.clone())
        .validate(&body.code, body.user_id)
        .await?;
    Ok(Json(voucher))
}

pub async fn redeem(
    State(state): State<AppState>,
    Json(body): Json<VoucherActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let voucher = VoucherService::new(state.db.clone())
        .redeem(&body.code, body.user_id)
        .await?;
    Ok(Json(voucher))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let vouchers = VoucherService::new(state.db.clone())
        .list_for_user(user_id)
        .await?;
    Ok(Json(vouchers))
}
