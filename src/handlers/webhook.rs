use crate::error::AppError;
use crate::services::TopupService;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-gateway-signature";

#[derive(Deserialize)]
pub struct GatewayEvent {
    pub source_id: String,
    #[allow(dead_code)]
    pub status: Option<String>,
}

/// Gateway webhook. The signature is HMAC-SHA256 over the raw body, hex
/// encoded, so the body is taken as bytes and authenticated before any
/// decoding or JSON parsing happens.
pub async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Authentication("missing webhook signature".to_string()))?;

    verify_signature(&state.config.gateway_webhook_secret, &body, signature)?;

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("invalid webhook payload: {}", e)))?;

    tracing::info!(source_id = %event.source_id, "gateway webhook received");

    let outcome = TopupService::new(
        state.db.clone(),
        state.gateway.clone(),
        state.config.app_base_url.clone(),
    )
    .reconcile(&event.source_id)
    .await?;

    Ok(Json(json!({ "source_id": event.source_id, "outcome": outcome })))
}

fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> Result<(), AppError> {
    let expected = hex::decode(signature_hex)
        .map_err(|_| AppError::Authentication("malformed webhook signature".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("webhook secret is empty".to_string()))?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| AppError::Authentication("webhook signature mismatch".to_string()))
}
