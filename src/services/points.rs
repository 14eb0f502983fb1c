use crate::db::models::{PointsEntry, Tier};
use crate::db::queries;
use crate::domain::tier::{apply_multiplier, compute_progress, pick_tier, TierProgress};
use crate::error::AppError;
use crate::validation::validate_positive_amount;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

const MAX_HISTORY_PAGE: i64 = 50;

pub const ALLOWED_EARN_SOURCES: &[&str] = &[
    "payment",
    "wallet_payment",
    "top_up_bonus",
    "manual_adjustment",
];

#[derive(Debug, Serialize)]
pub struct PointsLedger {
    pub current_balance: i64,
    pub lifetime_earned: i64,
}

#[derive(Debug, Serialize)]
pub struct EarnResult {
    pub entry: PointsEntry,
    pub awarded: i64,
    pub lifetime_earned: i64,
    pub promoted_to: Option<String>,
}

pub struct PointsService {
    pool: PgPool,
}

impl PointsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Balances are always derived from the entries, never stored counters, so
    /// the ledger stays the single audit trail.
    pub async fn ledger(&self, user_id: Uuid) -> Result<PointsLedger, AppError> {
        let current_balance = queries::points_balance(&self.pool, user_id).await?;
        let lifetime_earned = queries::lifetime_earned(&self.pool, user_id).await?;

        Ok(PointsLedger {
            current_balance,
            lifetime_earned,
        })
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<PointsEntry>, AppError> {
        let limit = limit.unwrap_or(20).clamp(1, MAX_HISTORY_PAGE);
        Ok(queries::list_points_entries(&self.pool, user_id, limit).await?)
    }

    pub async fn tiers(&self) -> Result<Vec<Tier>, AppError> {
        Ok(queries::list_tiers(&self.pool).await?)
    }

    pub async fn tier_progress(&self, user_id: Uuid) -> Result<TierProgress, AppError> {
        let lifetime = queries::lifetime_earned(&self.pool, user_id).await?;
        let tiers = queries::list_tiers(&self.pool).await?;
        Ok(compute_progress(&tiers, lifetime))
    }

    /// Posts a positive earn entry, scaled by the tier multiplier the user held
    /// going into the earn. Promotion is checked afterwards and only ever moves
    /// the recorded tier up.
    pub async fn earn(
        &self,
        user_id: Uuid,
        base_amount: i64,
        source_type: &str,
        notes: Option<String>,
    ) -> Result<EarnResult, AppError> {
        validate_positive_amount("amount", base_amount)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if !ALLOWED_EARN_SOURCES.contains(&source_type) {
            return Err(AppError::Validation(format!(
                "source_type must be one of: {}",
                ALLOWED_EARN_SOURCES.join(", ")
            )));
        }

        let tiers = queries::list_tiers(&self.pool).await?;
        let lifetime_before = queries::lifetime_earned(&self.pool, user_id).await?;

        let multiplier_bps = pick_tier(&tiers, lifetime_before)
            .map(|tier| tier.multiplier_bps)
            .unwrap_or(crate::domain::tier::MULTIPLIER_BASE_BPS);
        let awarded = apply_multiplier(base_amount, multiplier_bps);

        let lifetime_after = lifetime_before + awarded;

        let recorded_tier = queries::get_user_tier(&self.pool, user_id).await?;
        let new_tier = pick_tier(&tiers, lifetime_after).cloned();

        let promoted_to = match (&recorded_tier, &new_tier) {
            (Some(old), Some(new)) if new.display_order > old.display_order => {
                Some(new.name.clone())
            }
            (None, Some(new)) => Some(new.name.clone()),
            _ => None,
        };

        let notes = match (&promoted_to, notes) {
            (Some(tier_name), Some(notes)) => Some(format!("{} [promoted:{}]", notes, tier_name)),
            (Some(tier_name), None) => Some(format!("[promoted:{}]", tier_name)),
            (None, notes) => notes,
        };

        let mut tx = self.pool.begin().await?;

        let entry = PointsEntry::new(user_id, awarded, "earn", source_type, notes);
        let entry = queries::insert_points_entry(&mut tx, &entry).await?;

        if let (Some(tier_name), Some(new_tier)) = (&promoted_to, &new_tier) {
            queries::upsert_user_tier(&mut tx, user_id, new_tier.id).await?;
            tracing::info!(user_id = %user_id, tier = %tier_name, "user promoted");
        }

        tx.commit().await?;

        Ok(EarnResult {
            entry,
            awarded,
            lifetime_earned: lifetime_after,
            promoted_to,
        })
    }

    /// Posts a negative redeem entry. The advisory lock serializes concurrent
    /// redeems for one user, so the balance check and the insert see the same
    /// sum and the derived balance can never go negative.
    pub async fn redeem(
        &self,
        user_id: Uuid,
        amount: i64,
        notes: Option<String>,
    ) -> Result<PointsEntry, AppError> {
        validate_positive_amount("amount", amount)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        queries::lock_user_points(&mut tx, user_id).await?;

        let balance = queries::points_balance_in_tx(&mut tx, user_id).await?;
        if balance < amount {
            return Err(AppError::Conflict(format!(
                "insufficient points: balance {} is less than {}",
                balance, amount
            )));
        }

        let entry = PointsEntry::new(user_id, -amount, "redeem", "redemption", notes);
        let entry = queries::insert_points_entry(&mut tx, &entry).await?;
        tx.commit().await?;

        Ok(entry)
    }

    /// Staff adjustment: signed amount, positive counts toward lifetime.
    pub async fn adjust(
        &self,
        user_id: Uuid,
        amount: i64,
        notes: Option<String>,
    ) -> Result<PointsEntry, AppError> {
        if amount == 0 {
            return Err(AppError::Validation(
                "amount: must not be zero".to_string(),
            ));
        }

        let entry_type = if amount > 0 { "earn" } else { "adjustment" };

        let mut tx = self.pool.begin().await?;
        queries::lock_user_points(&mut tx, user_id).await?;

        if amount < 0 {
            let balance = queries::points_balance_in_tx(&mut tx, user_id).await?;
            if balance + amount < 0 {
                return Err(AppError::Conflict(format!(
                    "insufficient points: balance {} cannot absorb {}",
                    balance, amount
                )));
            }
        }

        let entry = PointsEntry::new(user_id, amount, entry_type, "manual_adjustment", notes);
        let entry = queries::insert_points_entry(&mut tx, &entry).await?;

        if amount > 0 {
            let tiers = queries::list_tiers(&self.pool).await?;
            let lifetime = queries::lifetime_earned(&self.pool, user_id).await? + amount;
            let recorded = queries::get_user_tier(&self.pool, user_id).await?;
            if let Some(new_tier) = pick_tier(&tiers, lifetime) {
                let should_promote = recorded
                    .map(|old| new_tier.display_order > old.display_order)
                    .unwrap_or(true);
                if should_promote {
                    queries::upsert_user_tier(&mut tx, user_id, new_tier.id).await?;
                }
            }
        }

        tx.commit().await?;
        Ok(entry)
    }
}
