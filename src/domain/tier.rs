use crate::db::models::Tier;
use serde::Serialize;

/// Multiplier base: 10000 bps = 1.00x.
pub const MULTIPLIER_BASE_BPS: i64 = 10000;

#[derive(Debug, Serialize)]
pub struct TierProgress {
    pub current_tier: Option<Tier>,
    pub next_tier: Option<Tier>,
    pub lifetime_points: i64,
    pub points_to_next_tier: i64,
    pub progress_percent: i64,
    pub is_max_tier: bool,
}

/// Current tier is the highest threshold not exceeding lifetime points; tiers
/// must come in ascending display order (as `list_tiers` returns them).
pub fn pick_tier(tiers: &[Tier], lifetime_points: i64) -> Option<&Tier> {
    tiers
        .iter()
        .filter(|tier| lifetime_points >= tier.threshold)
        .last()
        .or(tiers.first())
}

pub fn compute_progress(tiers: &[Tier], lifetime_points: i64) -> TierProgress {
    if tiers.is_empty() {
        return TierProgress {
            current_tier: None,
            next_tier: None,
            lifetime_points,
            points_to_next_tier: 0,
            progress_percent: 0,
            is_max_tier: false,
        };
    }

    let mut current_idx = 0;
    for (i, tier) in tiers.iter().enumerate() {
        if lifetime_points >= tier.threshold {
            current_idx = i;
        }
    }

    let current = &tiers[current_idx];
    let next = tiers.get(current_idx + 1);

    match next {
        None => TierProgress {
            current_tier: Some(current.clone()),
            next_tier: None,
            lifetime_points,
            points_to_next_tier: 0,
            progress_percent: 100,
            is_max_tier: true,
        },
        Some(next) => {
            let tier_range = next.threshold - current.threshold;
            let points_in_tier = lifetime_points - current.threshold;
            let percent = if tier_range > 0 {
                (points_in_tier * 100 / tier_range).clamp(0, 100)
            } else {
                100
            };

            TierProgress {
                current_tier: Some(current.clone()),
                next_tier: Some(next.clone()),
                lifetime_points,
                points_to_next_tier: next.threshold - lifetime_points,
                progress_percent: percent,
                is_max_tier: false,
            }
        }
    }
}

/// Scales a base points amount by a tier multiplier, rounding half up.
pub fn apply_multiplier(amount: i64, multiplier_bps: i64) -> i64 {
    (amount * multiplier_bps + MULTIPLIER_BASE_BPS / 2) / MULTIPLIER_BASE_BPS
}
