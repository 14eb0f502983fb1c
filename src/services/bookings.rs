use crate::db::models::Booking;
use crate::db::queries;
use crate::domain::booking::{BookingStatus, PaymentStatus};
use crate::error::AppError;
use crate::services::generate_code;
use crate::validation::BOOKING_CODE_LEN;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

const MAX_LIST_PAGE: i64 = 50;

pub struct BookingService {
    pool: PgPool,
}

impl BookingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a booking after checking the slot inside the same transaction.
    /// The partial unique index on (barber, date, time) is the backstop if two
    /// creations race past the check.
    pub async fn create_booking(
        &self,
        customer_id: Uuid,
        service_id: Uuid,
        barber_id: Option<Uuid>,
        date: NaiveDate,
        time: NaiveTime,
        voucher_code: Option<String>,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(barber_id) = barber_id {
            if queries::find_slot_conflict(&mut tx, barber_id, date, time)
                .await?
                .is_some()
            {
                return Err(AppError::Conflict("slot unavailable".to_string()));
            }
        }

        let booking = Booking::new(
            customer_id,
            service_id,
            barber_id,
            date,
            time,
            voucher_code,
            generate_code(BOOKING_CODE_LEN),
        );

        let booking = match queries::insert_booking(&mut tx, &booking).await {
            Ok(booking) => booking,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Conflict("slot unavailable".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        tracing::info!(
            booking_code = %booking.booking_code,
            customer_id = %customer_id,
            "booking created"
        );

        Ok(booking)
    }

    pub async fn get_by_code(&self, booking_code: &str) -> Result<Booking, AppError> {
        queries::get_booking_by_code(&self.pool, booking_code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", booking_code)))
    }

    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Booking>, AppError> {
        let limit = limit.unwrap_or(20).clamp(1, MAX_LIST_PAGE);
        Ok(queries::list_bookings_by_customer(&self.pool, customer_id, limit).await?)
    }

    /// Advances the appointment status; invalid transitions are conflicts, not
    /// silent overwrites.
    pub async fn update_status(&self, id: Uuid, new_status: &str) -> Result<Booking, AppError> {
        let next = BookingStatus::parse(new_status).ok_or_else(|| {
            AppError::Validation(format!("status: unknown value {}", new_status))
        })?;

        let mut tx = self.pool.begin().await?;

        let booking = queries::get_booking_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

        let current = BookingStatus::parse(&booking.status)
            .ok_or_else(|| AppError::Internal(format!("unknown booking status {}", booking.status)))?;

        if !current.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "cannot move booking from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }

        queries::update_booking_status(&mut tx, id, next.as_str()).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Payment status advances independently of the appointment status. The
    /// partial → unpaid edge is the "pay at shop" fallback.
    pub async fn update_payment_status(
        &self,
        id: Uuid,
        new_status: &str,
    ) -> Result<Booking, AppError> {
        let next = PaymentStatus::parse(new_status).ok_or_else(|| {
            AppError::Validation(format!("payment_status: unknown value {}", new_status))
        })?;

        let mut tx = self.pool.begin().await?;

        let booking = queries::get_booking_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

        let current = PaymentStatus::parse(&booking.payment_status).ok_or_else(|| {
            AppError::Internal(format!("unknown payment status {}", booking.payment_status))
        })?;

        if !current.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "cannot move payment from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }

        queries::update_booking_payment_status(&mut tx, id, next.as_str()).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Booking, AppError> {
        self.update_status(id, BookingStatus::Cancelled.as_str()).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Booking, AppError> {
        queries::get_booking(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }
}
