use crate::db::models::{Wallet, WalletTransaction};
use crate::db::queries;
use crate::error::AppError;
use crate::validation::validate_positive_amount;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

const MAX_HISTORY_PAGE: i64 = 50;

#[derive(Debug, Serialize)]
pub struct WalletBalances {
    pub balance: i64,
    pub bonus_balance: i64,
    pub spendable: i64,
}

pub struct WalletService {
    pool: PgPool,
}

impl WalletService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_wallet(&self, user_id: Uuid) -> Result<Wallet, AppError> {
        queries::get_wallet(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet for user {} not found", user_id)))
    }

    /// Creates the wallet if it does not exist yet. Safe to call repeatedly.
    pub async fn ensure_wallet(&self, user_id: Uuid) -> Result<Wallet, AppError> {
        Ok(queries::ensure_wallet(&self.pool, user_id).await?)
    }

    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        let limit = limit.unwrap_or(20).clamp(1, MAX_HISTORY_PAGE);
        Ok(queries::list_wallet_transactions(&self.pool, user_id, limit).await?)
    }

    pub async fn list_pending_topups(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        Ok(queries::list_pending_topups(&self.pool, user_id).await?)
    }

    /// Spends from the wallet: main balance first, then bonus balance. Fails
    /// closed on insufficient funds without touching either balance.
    pub async fn debit(
        &self,
        user_id: Uuid,
        amount: i64,
        description: Option<String>,
    ) -> Result<WalletBalances, AppError> {
        validate_positive_amount("amount", amount)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let wallet = queries::get_wallet_for_update(&mut tx, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet for user {} not found", user_id)))?;

        let spendable = wallet.balance + wallet.bonus_balance;
        if spendable < amount {
            return Err(AppError::Conflict(format!(
                "insufficient funds: spendable {} is less than {}",
                spendable, amount
            )));
        }

        let from_main = amount.min(wallet.balance);
        let from_bonus = amount - from_main;
        let new_balance = wallet.balance - from_main;
        let new_bonus = wallet.bonus_balance - from_bonus;

        queries::update_wallet_balances(&mut tx, wallet.id, new_balance, new_bonus).await?;

        let record = WalletTransaction::completed(user_id, "payment", -amount, description);
        queries::insert_wallet_transaction(&mut tx, &record).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            amount,
            "wallet debited ({} main, {} bonus)",
            from_main,
            from_bonus
        );

        Ok(WalletBalances {
            balance: new_balance,
            bonus_balance: new_bonus,
            spendable: new_balance + new_bonus,
        })
    }

    pub async fn refund(
        &self,
        user_id: Uuid,
        amount: i64,
        description: Option<String>,
    ) -> Result<WalletBalances, AppError> {
        validate_positive_amount("amount", amount)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        let balances = credit_in_tx(&mut tx, user_id, amount, 0).await?;

        let record = WalletTransaction::completed(user_id, "refund", amount, description);
        queries::insert_wallet_transaction(&mut tx, &record).await?;

        tx.commit().await?;
        Ok(balances)
    }
}

/// Credits main and bonus balances inside an already-open transaction. Used by
/// the top-up reconcile path so the credit and the status flip commit together.
pub async fn credit_in_tx(
    tx: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
    bonus: i64,
) -> Result<WalletBalances, AppError> {
    let wallet = match queries::get_wallet_for_update(tx, user_id).await? {
        Some(wallet) => wallet,
        None => {
            // First credit for a user who never opened their wallet screen.
            let wallet = Wallet::new(user_id);
            sqlx::query(
                r#"
                INSERT INTO wallets (id, user_id, balance, bonus_balance, created_at, updated_at)
                VALUES ($1, $2, 0, 0, $3, $4)
                ON CONFLICT (user_id) DO NOTHING
                "#,
            )
            .bind(wallet.id)
            .bind(user_id)
            .bind(wallet.created_at)
            .bind(wallet.updated_at)
            .execute(&mut **tx)
            .await?;

            queries::get_wallet_for_update(tx, user_id)
                .await?
                .ok_or_else(|| AppError::Internal("wallet insert not visible".to_string()))?
        }
    };

    let new_balance = wallet.balance + amount;
    let new_bonus = wallet.bonus_balance + bonus;
    queries::update_wallet_balances(tx, wallet.id, new_balance, new_bonus).await?;

    Ok(WalletBalances {
        balance: new_balance,
        bonus_balance: new_bonus,
        spendable: new_balance + new_bonus,
    })
}
