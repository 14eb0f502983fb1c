use crate::error::AppError;
use crate::services::BookingService;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub barber_id: Option<Uuid>,
    pub booking_date: NaiveDate,
    pub booking_time: NaiveTime,
    pub voucher_code: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct PaymentStatusRequest {
    pub payment_status: String,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = BookingService::new(state.db.clone())
        .create_booking(
            body.customer_id,
            body.service_id,
            body.barber_id,
            body.booking_date,
            body.booking_time,
            body.voucher_code,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn get_by_code(
    State(state): State<AppState>,
    Path(booking_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = BookingService::new(state.db.clone())
        .get_by_code(&booking_code)
        .await?;
    Ok(Json(booking))
}

pub async fn list_for_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let bookings = BookingService::new(state.db.clone())
        .list_for_customer(customer_id, params.limit)
        .await?;
    Ok(Json(bookings))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = BookingService::new(state.db.clone())
        .update_status(id, &body.status)
        .await?;
    Ok(Json(booking))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = BookingService::new(state.db.clone())
        .update_payment_status(id, &body.payment_status)
        .await?;
    Ok(Json(booking))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let booking = BookingService::new(state.db.clone()).cancel(id).await?;
    Ok(Json(booking))
}
