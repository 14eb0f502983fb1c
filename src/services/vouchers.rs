use crate::db::models::Voucher;
use crate::db::queries;
use crate::error::AppError;
use crate::services::generate_code;
use crate::validation::{
    sanitize_string, validate_max_len, validate_positive_amount, validate_voucher_code,
    DESCRIPTION_MAX_LEN,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct VoucherService {
    pool: PgPool,
}

impl VoucherService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a voucher with a random code, or a caller-supplied one (staff
    /// campaigns use fixed codes like SAVE100).
    pub async fn create_voucher(
        &self,
        value: i64,
        max_uses: i32,
        expires_at: DateTime<Utc>,
        user_id: Option<Uuid>,
        code: Option<String>,
        description: Option<String>,
    ) -> Result<Voucher, AppError> {
        validate_positive_amount("value", value)
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if max_uses <= 0 {
            return Err(AppError::Validation(
                "max_uses: must be greater than zero".to_string(),
            ));
        }
        if expires_at <= Utc::now() {
            return Err(AppError::Validation(
                "expires_at: must be in the future".to_string(),
            ));
        }
        if let Some(description) = &description {
            validate_max_len("description", description, DESCRIPTION_MAX_LEN)
                .map_err(|e| AppError::Validation(e.to_string()))?;
        }

        let code = match code {
            Some(code) => {
                let code = sanitize_string(&code).to_uppercase();
                validate_voucher_code(&code).map_err(|e| AppError::Validation(e.to_string()))?;

                if queries::get_voucher_by_code(&self.pool, &code).await?.is_some() {
                    return Err(AppError::Conflict(format!(
                        "voucher code {} already exists",
                        code
                    )));
                }
                code
            }
            None => generate_code(8),
        };

        let voucher = Voucher::new(code, value, max_uses, expires_at, user_id, description);

        let mut tx = self.pool.begin().await?;
        let voucher = queries::insert_voucher(&mut tx, &voucher).await?;
        tx.commit().await?;

        tracing::info!(code = %voucher.code, value, "voucher created");
        Ok(voucher)
    }

    /// Checks a code without consuming it. Returns the voucher so the caller
    /// can show the discount value.
    pub async fn validate(&self, code: &str, user_id: Uuid) -> Result<Voucher, AppError> {
        let code = sanitize_string(code).to_uppercase();
        validate_voucher_code(&code).map_err(|e| AppError::Validation(e.to_string()))?;

        let voucher = queries::get_voucher_by_code(&self.pool, &code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Voucher {} not found", code)))?;

        check_redeemable(&voucher, user_id)?;
        Ok(voucher)
    }

    /// Re-validates and then redeems with a conditional update. The SQL-side
    /// compare-and-swap closes the window between the check and the increment.
    pub async fn redeem(&self, code: &str, user_id: Uuid) -> Result<Voucher, AppError> {
        let voucher = self.validate(code, user_id).await?;

        match queries::redeem_voucher_cas(&self.pool, &voucher.code).await? {
            Some(redeemed) => {
                tracing::info!(code = %redeemed.code, user_id = %user_id, used = redeemed.used_count, "voucher redeemed");
                Ok(redeemed)
            }
            None => {
                // Lost the race: re-read for a precise error.
                let current = queries::get_voucher_by_code(&self.pool, &voucher.code)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Voucher {} not found", code)))?;
                check_redeemable(&current, user_id)?;
                Err(AppError::Conflict(
                    "voucher was redeemed concurrently".to_string(),
                ))
            }
        }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Voucher>, AppError> {
        Ok(queries::list_vouchers_for_user(&self.pool, user_id).await?)
    }
}

fn check_redeemable(voucher: &Voucher, user_id: Uuid) -> Result<(), AppError> {
    if let Some(owner) = voucher.user_id {
        if owner != user_id {
            return Err(AppError::Conflict(
                "voucher is not eligible for this user".to_string(),
            ));
        }
    }

    if voucher.redeemed {
        return Err(AppError::Conflict(
            "voucher has already been redeemed".to_string(),
        ));
    }

    if voucher.used_count >= voucher.max_uses {
        return Err(AppError::Conflict(
            "voucher usage limit reached".to_string(),
        ));
    }

    if voucher.expires_at <= Utc::now() {
        return Err(AppError::Conflict("voucher has expired".to_string()));
    }

    Ok(())
}
