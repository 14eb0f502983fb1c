//! Membership card tiers and lifecycle rules. Cards are a purchasable product
//! separate from the points-ledger tier; card expiry is the only downgrade path
//! anywhere in the loyalty model.

pub const CARD_VALIDITY_DAYS: i64 = 365;
pub const CARD_GRACE_PERIOD_DAYS: i64 = 30;

/// XP accrues 1:1 with pesos paid into the wallet (whole pesos).
pub const GOLD_XP_THRESHOLD: i64 = 5000;
pub const PLATINUM_XP_THRESHOLD: i64 = 15000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CardTier {
    Silver,
    Gold,
    Platinum,
}

impl CardTier {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Silver" => Some(CardTier::Silver),
            "Gold" => Some(CardTier::Gold),
            "Platinum" => Some(CardTier::Platinum),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardTier::Silver => "Silver",
            CardTier::Gold => "Gold",
            CardTier::Platinum => "Platinum",
        }
    }

    pub fn multiplier_bps(&self) -> i64 {
        match self {
            CardTier::Silver => 10500,
            CardTier::Gold => 11000,
            CardTier::Platinum => 11500,
        }
    }
}

/// Highest card tier the accumulated XP entitles the holder to. Used only for
/// upgrades; a card already above this never moves down.
pub fn tier_for_xp(xp: i64) -> CardTier {
    if xp >= PLATINUM_XP_THRESHOLD {
        CardTier::Platinum
    } else if xp >= GOLD_XP_THRESHOLD {
        CardTier::Gold
    } else {
        CardTier::Silver
    }
}

/// Resulting tier after an XP award: upgrades only.
pub fn upgraded_tier(current: CardTier, new_xp: i64) -> CardTier {
    current.max(tier_for_xp(new_xp))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    Active,
    GracePeriod,
    Expired,
}

impl CardStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CardStatus::Active),
            "grace_period" => Some(CardStatus::GracePeriod),
            "expired" => Some(CardStatus::Expired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::GracePeriod => "grace_period",
            CardStatus::Expired => "expired",
        }
    }
}
