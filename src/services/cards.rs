use crate::db::models::{MembershipCard, Voucher};
use crate::db::queries;
use crate::domain::card::{
    upgraded_tier, CardStatus, CardTier, CARD_GRACE_PERIOD_DAYS, CARD_VALIDITY_DAYS,
    GOLD_XP_THRESHOLD, PLATINUM_XP_THRESHOLD,
};
use crate::error::AppError;
use crate::services::generate_code;
use chrono::{Datelike, Duration as ChronoDuration, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

/// Fixed value of the birthday freebie voucher (₱500).
const BIRTHDAY_FREEBIE_VALUE: i64 = 50000;
const BIRTHDAY_FREEBIE_VALID_DAYS: i64 = 60;
const MAINTENANCE_BATCH_SIZE: i64 = 50;

#[derive(Debug, Serialize)]
pub struct CardView {
    #[serde(flatten)]
    pub card: MembershipCard,
    pub next_tier: Option<String>,
    pub xp_to_next_tier: i64,
    pub xp_progress_percent: i64,
}

pub struct CardService {
    pool: PgPool,
}

impl CardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_active_card(&self, user_id: Uuid) -> Result<CardView, AppError> {
        let card = queries::get_live_card(&self.pool, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No active membership card for user {}", user_id))
            })?;

        Ok(card_view(card))
    }

    /// Sells a new card. One live card per user; the partial unique index backs
    /// up the in-transaction check.
    pub async fn purchase_card(&self, user_id: Uuid, tier: &str) -> Result<CardView, AppError> {
        let tier = CardTier::parse(tier).ok_or_else(|| {
            AppError::Validation("tier: must be one of Silver, Gold, Platinum".to_string())
        })?;

        let mut tx = self.pool.begin().await?;

        let existing =
            queries::get_card_for_update(&mut tx, user_id, &["active", "grace_period"]).await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "user already has a live membership card".to_string(),
            ));
        }

        let now = Utc::now();
        let expires_at = now + ChronoDuration::days(CARD_VALIDITY_DAYS);
        let card = MembershipCard {
            id: Uuid::new_v4(),
            user_id,
            tier_name: tier.as_str().to_string(),
            multiplier_bps: tier.multiplier_bps(),
            card_xp: 0,
            status: CardStatus::Active.as_str().to_string(),
            expires_at,
            grace_period_ends_at: expires_at + ChronoDuration::days(CARD_GRACE_PERIOD_DAYS),
            birthday_freebie_year: None,
            created_at: now,
            updated_at: now,
        };

        let card = queries::insert_card(&mut tx, &card).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, tier = tier.as_str(), "membership card purchased");

        Ok(card_view(card))
    }

    /// Renewal during grace keeps the earned tier and XP. Renewal after the
    /// grace window expired the card, so tier and XP reset to the base.
    pub async fn renew_card(&self, user_id: Uuid) -> Result<CardView, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut card = queries::get_card_for_update(&mut tx, user_id, &["grace_period", "expired"])
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No renewable membership card for user {}", user_id))
            })?;

        let was_expired = card.status == CardStatus::Expired.as_str();

        let now = Utc::now();
        let expires_at = now + ChronoDuration::days(CARD_VALIDITY_DAYS);
        card.status = CardStatus::Active.as_str().to_string();
        card.expires_at = expires_at;
        card.grace_period_ends_at = expires_at + ChronoDuration::days(CARD_GRACE_PERIOD_DAYS);

        if was_expired {
            card.tier_name = CardTier::Silver.as_str().to_string();
            card.multiplier_bps = CardTier::Silver.multiplier_bps();
            card.card_xp = 0;
        }

        queries::update_card(&mut tx, &card).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, reset = was_expired, "membership card renewed");

        Ok(card_view(card))
    }

    pub async fn award_xp(&self, user_id: Uuid, xp: i64) -> Result<CardView, AppError> {
        if xp <= 0 {
            return Err(AppError::Validation("xp: must be greater than zero".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let card = award_xp_locked(&mut tx, user_id, xp).await?.ok_or_else(|| {
            AppError::NotFound(format!("No active membership card for user {}", user_id))
        })?;

        tx.commit().await?;
        Ok(card_view(card))
    }

    /// Moves due cards through active → grace_period → expired. Run on an
    /// interval by the maintenance task.
    pub async fn expire_due_cards(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let due = queries::lock_cards_due_for_transition(&mut tx, now, MAINTENANCE_BATCH_SIZE)
            .await?;

        let mut transitioned = 0u64;
        for mut card in due {
            match CardStatus::parse(&card.status) {
                Some(CardStatus::Active) => {
                    card.status = CardStatus::GracePeriod.as_str().to_string();
                }
                Some(CardStatus::GracePeriod) => {
                    card.status = CardStatus::Expired.as_str().to_string();
                    card.tier_name = CardTier::Silver.as_str().to_string();
                    card.multiplier_bps = CardTier::Silver.multiplier_bps();
                    card.card_xp = 0;
                }
                _ => continue,
            }

            queries::update_card(&mut tx, &card).await?;
            tracing::info!(card_id = %card.id, status = %card.status, "card lifecycle transition");
            transitioned += 1;
        }

        tx.commit().await?;
        Ok(transitioned)
    }

    /// One voucher per calendar year, issued during the cardholder's birthday
    /// month. The caller supplies the birthday month; user profiles live with
    /// the identity provider.
    pub async fn issue_birthday_freebie(
        &self,
        user_id: Uuid,
        birthday_month: u32,
    ) -> Result<Voucher, AppError> {
        if !(1..=12).contains(&birthday_month) {
            return Err(AppError::Validation(
                "birthday_month: must be between 1 and 12".to_string(),
            ));
        }

        let now = Utc::now();
        if now.month() != birthday_month {
            return Err(AppError::Conflict(
                "birthday freebie is only available during the birthday month".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let mut card = queries::get_card_for_update(&mut tx, user_id, &["active", "grace_period"])
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No active membership card for user {}", user_id))
            })?;

        let current_year = now.year();
        if card.birthday_freebie_year == Some(current_year) {
            return Err(AppError::Conflict(
                "birthday freebie already issued this year".to_string(),
            ));
        }

        let voucher = Voucher::new(
            generate_code(8),
            BIRTHDAY_FREEBIE_VALUE,
            1,
            now + ChronoDuration::days(BIRTHDAY_FREEBIE_VALID_DAYS),
            Some(user_id),
            Some("Birthday freebie".to_string()),
        );
        let voucher = queries::insert_voucher(&mut tx, &voucher).await?;

        card.birthday_freebie_year = Some(current_year);
        queries::update_card(&mut tx, &card).await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, code = %voucher.code, "birthday freebie issued");
        Ok(voucher)
    }
}

fn card_view(card: MembershipCard) -> CardView {
    let (next_tier, next_threshold) = match CardTier::parse(&card.tier_name) {
        Some(CardTier::Silver) => (Some(CardTier::Gold), GOLD_XP_THRESHOLD),
        Some(CardTier::Gold) => (Some(CardTier::Platinum), PLATINUM_XP_THRESHOLD),
        _ => (None, 0),
    };

    match next_tier {
        Some(next) => CardView {
            xp_to_next_tier: (next_threshold - card.card_xp).max(0),
            xp_progress_percent: if next_threshold > 0 {
                (card.card_xp * 100 / next_threshold).clamp(0, 100)
            } else {
                100
            },
            next_tier: Some(next.as_str().to_string()),
            card,
        },
        None => CardView {
            next_tier: None,
            xp_to_next_tier: 0,
            xp_progress_percent: 100,
            card,
        },
    }
}

async fn award_xp_locked(
    tx: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
    xp: i64,
) -> Result<Option<MembershipCard>, AppError> {
    let Some(mut card) =
        queries::get_card_for_update(tx, user_id, &["active", "grace_period"]).await?
    else {
        return Ok(None);
    };

    card.card_xp += xp;

    if let Some(current) = CardTier::parse(&card.tier_name) {
        let upgraded = upgraded_tier(current, card.card_xp);
        if upgraded != current {
            card.tier_name = upgraded.as_str().to_string();
            card.multiplier_bps = upgraded.multiplier_bps();
            tracing::info!(user_id = %user_id, tier = upgraded.as_str(), "card tier upgraded");
        }
    }

    queries::update_card(tx, &card).await?;
    Ok(Some(card))
}

/// Hook for the top-up reconcile path: cardholders earn XP on every credited
/// top-up; users without a live card are a silent no-op.
pub(crate) async fn award_topup_xp_in_tx(
    tx: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
    xp: i64,
) -> Result<(), AppError> {
    if xp <= 0 {
        return Ok(());
    }

    award_xp_locked(tx, user_id, xp).await?;
    Ok(())
}

/// Periodic card maintenance loop, spawned at startup.
pub async fn run_card_maintenance(pool: PgPool) {
    use tokio::time::{sleep, Duration};

    const MAINTENANCE_INTERVAL_SECS: u64 = 3600;

    tracing::info!("Card maintenance task started");
    let service = CardService::new(pool);

    loop {
        match service.expire_due_cards().await {
            Ok(0) => {}
            Ok(n) => tracing::info!("Card maintenance transitioned {} card(s)", n),
            Err(e) => tracing::error!("Card maintenance error: {}", e),
        }

        sleep(Duration::from_secs(MAINTENANCE_INTERVAL_SECS)).await;
    }
}
