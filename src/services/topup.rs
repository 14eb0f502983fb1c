use crate::db::models::WalletTransaction;
use crate::db::queries;
use crate::domain::topup::{
    bonus_for_amount, parse_bonus_tiers, BonusTier, TopupStatus, DEFAULT_MIN_TOPUP,
};
use crate::error::AppError;
use crate::gateway::{GatewayClient, GatewayError};
use crate::services::cards::award_topup_xp_in_tx;
use crate::services::wallet::credit_in_tx;
use crate::validation::{validate_ewallet_type, validate_min_amount};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct InitiatedTopup {
    pub source_id: String,
    pub checkout_url: Option<String>,
    pub amount: i64,
}

/// Result of reconciling one pending topup against the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Wallet credited in this call.
    Credited,
    /// A previous webhook or poll already credited this source.
    AlreadyCompleted,
    /// Gateway has not confirmed yet; try again later.
    StillPending,
    Failed,
    Expired,
}

pub struct TopupService {
    pool: PgPool,
    gateway: GatewayClient,
    app_base_url: String,
}

impl TopupService {
    pub fn new(pool: PgPool, gateway: GatewayClient, app_base_url: String) -> Self {
        Self {
            pool,
            gateway,
            app_base_url,
        }
    }

    async fn min_topup_amount(&self) -> Result<i64, AppError> {
        Ok(queries::get_wallet_config(&self.pool)
            .await?
            .map(|config| config.min_topup_amount)
            .unwrap_or(DEFAULT_MIN_TOPUP))
    }

    async fn bonus_tiers(&self) -> Result<Vec<BonusTier>, AppError> {
        Ok(queries::get_wallet_config(&self.pool)
            .await?
            .map(|config| parse_bonus_tiers(&config.bonus_tiers))
            .unwrap_or_default())
    }

    /// Opens a gateway checkout session and records the pending transaction
    /// keyed by the returned source id.
    pub async fn initiate(
        &self,
        user_id: Uuid,
        amount: i64,
        ewallet_type: &str,
    ) -> Result<InitiatedTopup, AppError> {
        validate_ewallet_type(ewallet_type).map_err(|e| AppError::Validation(e.to_string()))?;

        let minimum = self.min_topup_amount().await?;
        validate_min_amount("amount", amount, minimum)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let description = format!("Wallet Top-up {} centavos", amount);
        let success_url = format!("{}/customer/wallet?topup=success", self.app_base_url);
        let failed_url = format!("{}/customer/wallet?topup=failure", self.app_base_url);

        let source = self
            .gateway
            .create_source(amount, ewallet_type, &description, &success_url, &failed_url)
            .await
            .map_err(map_gateway_error)?;

        let mut tx = self.pool.begin().await?;
        let record = WalletTransaction::pending_topup(
            user_id,
            amount,
            source.id.clone(),
            Some(description),
        );
        queries::insert_wallet_transaction(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, source_id = %source.id, amount, "topup initiated");

        Ok(InitiatedTopup {
            source_id: source.id,
            checkout_url: source.checkout_url,
            amount,
        })
    }

    /// Idempotent reconcile keyed by `source_id`. Webhook, client poll and the
    /// background sweep all funnel through here; the row lock serializes them
    /// and terminal rows short-circuit without touching the gateway.
    pub async fn reconcile(&self, source_id: &str) -> Result<ReconcileOutcome, AppError> {
        let bonus_tiers = self.bonus_tiers().await?;

        let mut tx = self.pool.begin().await?;

        let record = queries::get_transaction_by_source_for_update(&mut tx, source_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Top-up {} not found", source_id)))?;

        // Commit on error too: the only write before a gateway failure is the
        // attempt counter, which must survive the rollback path.
        match reconcile_locked(&mut tx, &self.gateway, &record, &bonus_tiers).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                tx.commit().await?;
                Err(e)
            }
        }
    }
}

/// Reconciles a row already locked by the caller's transaction. Split out so
/// the background sweep can batch several rows under one transaction.
pub(crate) async fn reconcile_locked(
    tx: &mut SqlxTransaction<'_, Postgres>,
    gateway: &GatewayClient,
    record: &WalletTransaction,
    bonus_tiers: &[BonusTier],
) -> Result<ReconcileOutcome, AppError> {
    let status = TopupStatus::parse(&record.status)
        .ok_or_else(|| AppError::Internal(format!("unknown topup status {}", record.status)))?;

    if status.is_terminal() {
        return Ok(match status {
            TopupStatus::Completed => ReconcileOutcome::AlreadyCompleted,
            TopupStatus::Failed => ReconcileOutcome::Failed,
            _ => ReconcileOutcome::Expired,
        });
    }

    let source_id = record
        .source_id
        .as_deref()
        .ok_or_else(|| AppError::Internal("pending topup without source_id".to_string()))?;

    let source = match gateway.get_source(source_id).await {
        Ok(source) => source,
        Err(e) => {
            // Count the attempt so a dead source eventually stops being swept.
            queries::bump_reconcile_attempts(tx, record.id).await?;
            return Err(map_gateway_error(e));
        }
    };

    match source.status.as_str() {
        "chargeable" => {
            let description = record
                .description
                .clone()
                .unwrap_or_else(|| format!("Wallet Top-up {} centavos", record.amount));

            let payment = gateway
                .create_payment(source_id, record.amount, &description)
                .await
                .map_err(map_gateway_error)?;

            let bonus = bonus_for_amount(bonus_tiers, record.amount);

            credit_in_tx(tx, record.user_id, record.amount, bonus).await?;
            queries::set_transaction_outcome(
                tx,
                record.id,
                TopupStatus::Completed.as_str(),
                bonus,
                Some(&payment.id),
            )
            .await?;

            // Top-ups feed membership card XP 1:1 with pesos paid.
            award_topup_xp_in_tx(tx, record.user_id, record.amount / 100).await?;

            tracing::info!(
                source_id = %source_id,
                user_id = %record.user_id,
                amount = record.amount,
                bonus,
                "topup credited"
            );

            Ok(ReconcileOutcome::Credited)
        }
        "pending" => {
            queries::bump_reconcile_attempts(tx, record.id).await?;
            Ok(ReconcileOutcome::StillPending)
        }
        "expired" | "cancelled" => {
            queries::set_transaction_outcome(
                tx,
                record.id,
                TopupStatus::Expired.as_str(),
                0,
                None,
            )
            .await?;
            tracing::warn!(source_id = %source_id, "topup source expired at gateway");
            Ok(ReconcileOutcome::Expired)
        }
        "failed" => {
            queries::set_transaction_outcome(
                tx,
                record.id,
                TopupStatus::Failed.as_str(),
                0,
                None,
            )
            .await?;
            tracing::warn!(source_id = %source_id, "topup source failed at gateway");
            Ok(ReconcileOutcome::Failed)
        }
        other => {
            queries::bump_reconcile_attempts(tx, record.id).await?;
            tracing::warn!(source_id = %source_id, status = other, "unrecognized gateway source status");
            Ok(ReconcileOutcome::StillPending)
        }
    }
}

fn map_gateway_error(e: GatewayError) -> AppError {
    match e {
        GatewayError::SourceNotFound(id) => AppError::NotFound(format!("Source {} not found", id)),
        other => AppError::ExternalService(other.to_string()),
    }
}
