use serde::{Deserialize, Serialize};

/// Minimum top-up when no wallet_config row exists (₱100).
pub const DEFAULT_MIN_TOPUP: i64 = 10000;

/// Reconcile attempts before a pending topup is left for webhook/manual
/// resolution (~5 minutes at the sweep interval).
pub const MAX_RECONCILE_ATTEMPTS: i32 = 30;

/// Pending topups older than this are expired outright; the gateway's own
/// checkout session has long since lapsed.
pub const PENDING_TOPUP_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopupStatus {
    Pending,
    Completed,
    Failed,
    Expired,
}

impl TopupStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TopupStatus::Pending),
            "completed" => Some(TopupStatus::Completed),
            "failed" => Some(TopupStatus::Failed),
            "expired" => Some(TopupStatus::Expired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopupStatus::Pending => "pending",
            TopupStatus::Completed => "completed",
            TopupStatus::Failed => "failed",
            TopupStatus::Expired => "expired",
        }
    }

    /// Terminal states never transition again; reconciling one is a no-op.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TopupStatus::Pending)
    }
}

/// One row of the configurable top-up bonus table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BonusTier {
    pub min_amount: i64,
    pub bonus: i64,
}

/// Parses the `wallet_config.bonus_tiers` JSON column. Malformed config is
/// treated as no bonus rather than failing a credit.
pub fn parse_bonus_tiers(value: &serde_json::Value) -> Vec<BonusTier> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

/// The highest `min_amount` not exceeding the paid amount wins.
/// No tiers configured means no bonus.
pub fn bonus_for_amount(tiers: &[BonusTier], amount: i64) -> i64 {
    tiers
        .iter()
        .filter(|tier| tier.min_amount <= amount)
        .max_by_key(|tier| tier.min_amount)
        .map(|tier| tier.bonus)
        .unwrap_or(0)
}
