use crate::error::AppError;
use crate::services::TopupService;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct InitiateTopupRequest {
    pub amount: i64,
    pub ewallet_type: String,
}

fn topup_service(state: &AppState) -> TopupService {
    TopupService::new(
        state.db.clone(),
        state.gateway.clone(),
        state.config.app_base_url.clone(),
    )
}

pub async fn initiate(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<InitiateTopupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let initiated = topup_service(&state)
        .initiate(user_id, body.amount, &body.ewallet_type)
        .await?;
    Ok((StatusCode::CREATED, Json(initiated)))
}

/// Client poll after the checkout redirect. Funnels into the same idempotent
/// reconcile the webhook and the background sweep use.
pub async fn check(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = topup_service(&state).reconcile(&source_id).await?;
    Ok(Json(json!({ "source_id": source_id, "outcome": outcome })))
}
