use crate::db::queries;
use crate::domain::topup::{MAX_RECONCILE_ATTEMPTS, PENDING_TOPUP_TTL_HOURS};
use crate::gateway::GatewayClient;
use crate::services::topup::reconcile_locked;
use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

const SWEEP_INTERVAL_SECS: u64 = 10;
const SWEEP_BATCH_SIZE: i64 = 10;

/// Background reconciler for pending top-ups. Replaces client-side polling as
/// the primary resolution path; the poll endpoint remains for the moment right
/// after the browser returns from the gateway redirect.
pub async fn run_reconciler(pool: PgPool, gateway: GatewayClient) {
    info!("Top-up reconciler started");

    loop {
        if let Err(e) = sweep_once(&pool, &gateway).await {
            error!("Reconciler sweep error: {}", e);
        }

        sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
    }
}

pub async fn sweep_once(pool: &PgPool, gateway: &GatewayClient) -> anyhow::Result<u64> {
    // Sessions past the gateway TTL can never complete; close them out first.
    let cutoff = Utc::now() - ChronoDuration::hours(PENDING_TOPUP_TTL_HOURS);
    let expired = queries::expire_pending_topups_before(pool, cutoff).await?;
    if expired > 0 {
        info!("Expired {} stale pending topup(s)", expired);
    }

    let bonus_tiers = queries::get_wallet_config(pool)
        .await?
        .map(|config| crate::domain::topup::parse_bonus_tiers(&config.bonus_tiers))
        .unwrap_or_default();

    let mut tx = pool.begin().await?;

    // SKIP LOCKED keeps the sweep out of the way of in-flight webhook or poll
    // reconciles holding the same rows. Rows past the attempt bound are left
    // pending for webhook or manual resolution.
    let pending =
        queries::lock_pending_topups_for_sweep(&mut tx, MAX_RECONCILE_ATTEMPTS, SWEEP_BATCH_SIZE)
            .await?;

    if pending.is_empty() {
        tx.commit().await?;
        return Ok(expired);
    }

    debug!("Reconciling {} pending topup(s)", pending.len());

    let mut processed = 0u64;
    for record in &pending {
        match reconcile_locked(&mut tx, gateway, record, &bonus_tiers).await {
            Ok(outcome) => {
                debug!(source_id = ?record.source_id, ?outcome, "sweep reconciled topup");
                processed += 1;
            }
            Err(e) => {
                error!(source_id = ?record.source_id, "sweep reconcile failed: {}", e);
            }
        }
    }

    tx.commit().await?;
    Ok(expired + processed)
}
