use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One wallet per user. Balances are integer centavos and never go negative;
/// the CHECK constraints back up what the service layer enforces.
#[derive(Debug, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,
    pub bonus_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: 0,
            bonus_balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Append-style wallet history record. After insert only `status`,
/// `gateway_payment_id` and `reconcile_attempts` ever change.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tx_type: String,
    pub amount: i64,
    pub bonus_amount: i64,
    pub status: String,
    pub source_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub description: Option<String>,
    pub reconcile_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn pending_topup(
        user_id: Uuid,
        amount: i64,
        source_id: String,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            tx_type: "topup".to_string(),
            amount,
            bonus_amount: 0,
            status: "pending".to_string(),
            source_id: Some(source_id),
            gateway_payment_id: None,
            description,
            reconcile_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn completed(user_id: Uuid, tx_type: &str, amount: i64, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            tx_type: tx_type.to_string(),
            amount,
            bonus_amount: 0,
            status: "completed".to_string(),
            source_id: None,
            gateway_payment_id: None,
            description,
            reconcile_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize)]
pub struct WalletConfig {
    pub id: Uuid,
    pub min_topup_amount: i64,
    pub bonus_tiers: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Immutable points ledger entry. Balances are always derived by summation.
#[derive(Debug, FromRow, Serialize, Deserialize, ToSchema)]
pub struct PointsEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub entry_type: String,
    pub source_type: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PointsEntry {
    pub fn new(
        user_id: Uuid,
        amount: i64,
        entry_type: &str,
        source_type: &str,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            entry_type: entry_type.to_string(),
            source_type: source_type.to_string(),
            notes,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Tier {
    pub id: Uuid,
    pub name: String,
    pub threshold: i64,
    pub display_order: i32,
    pub multiplier_bps: i64,
}

#[derive(Debug, FromRow, Serialize, Deserialize)]
pub struct UserTier {
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub promoted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct MembershipCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier_name: String,
    pub multiplier_bps: i64,
    pub card_xp: i64,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub grace_period_ends_at: DateTime<Utc>,
    pub birthday_freebie_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Voucher {
    pub id: Uuid,
    pub code: String,
    pub value: i64,
    pub max_uses: i32,
    pub used_count: i32,
    pub redeemed: bool,
    pub user_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    pub fn new(
        code: String,
        value: i64,
        max_uses: i32,
        expires_at: DateTime<Utc>,
        user_id: Option<Uuid>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code,
            value,
            max_uses,
            used_count: 0,
            redeemed: false,
            user_id,
            expires_at,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub barber_id: Option<Uuid>,
    pub booking_date: NaiveDate,
    pub booking_time: NaiveTime,
    pub status: String,
    pub payment_status: String,
    pub voucher_code: Option<String>,
    pub booking_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        customer_id: Uuid,
        service_id: Uuid,
        barber_id: Option<Uuid>,
        booking_date: NaiveDate,
        booking_time: NaiveTime,
        voucher_code: Option<String>,
        booking_code: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            service_id,
            barber_id,
            booking_date,
            booking_time,
            status: "booked".to_string(),
            payment_status: "unpaid".to_string(),
            voucher_code,
            booking_code,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct QueueEntry {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub customer_id: Uuid,
    pub queue_code: String,
    pub position: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
