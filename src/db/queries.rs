use crate::db::models::{
    Booking, MembershipCard, PointsEntry, QueueEntry, Tier, Voucher, Wallet, WalletConfig,
    WalletTransaction,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Result, Transaction as SqlxTransaction};
use uuid::Uuid;

// --- Wallet Queries ---

pub async fn get_wallet(pool: &PgPool, user_id: Uuid) -> Result<Option<Wallet>> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Idempotent wallet creation. The unique index on `user_id` makes a lost race
/// harmless: the conflicting insert is skipped and the existing row re-read.
pub async fn ensure_wallet(pool: &PgPool, user_id: Uuid) -> Result<Wallet> {
    let wallet = Wallet::new(user_id);

    sqlx::query(
        r#"
        INSERT INTO wallets (id, user_id, balance, bonus_balance, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(wallet.id)
    .bind(wallet.user_id)
    .bind(wallet.balance)
    .bind(wallet.bonus_balance)
    .bind(wallet.created_at)
    .bind(wallet.updated_at)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn get_wallet_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Option<Wallet>> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn update_wallet_balances(
    executor: &mut SqlxTransaction<'_, Postgres>,
    wallet_id: Uuid,
    balance: i64,
    bonus_balance: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE wallets SET balance = $1, bonus_balance = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(balance)
    .bind(bonus_balance)
    .bind(wallet_id)
    .execute(&mut **executor)
    .await?;

    Ok(())
}

// --- Wallet Transaction Queries ---

pub async fn insert_wallet_transaction(
    executor: &mut SqlxTransaction<'_, Postgres>,
    tx: &WalletTransaction,
) -> Result<WalletTransaction> {
    sqlx::query_as::<_, WalletTransaction>(
        r#"
        INSERT INTO wallet_transactions (
            id, user_id, tx_type, amount, bonus_amount, status, source_id,
            gateway_payment_id, description, reconcile_attempts, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(tx.id)
    .bind(tx.user_id)
    .bind(&tx.tx_type)
    .bind(tx.amount)
    .bind(tx.bonus_amount)
    .bind(&tx.status)
    .bind(&tx.source_id)
    .bind(&tx.gateway_payment_id)
    .bind(&tx.description)
    .bind(tx.reconcile_attempts)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .fetch_one(&mut **executor)
    .await
}

pub async fn list_wallet_transactions(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<WalletTransaction>> {
    sqlx::query_as::<_, WalletTransaction>(
        "SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn list_pending_topups(pool: &PgPool, user_id: Uuid) -> Result<Vec<WalletTransaction>> {
    sqlx::query_as::<_, WalletTransaction>(
        r#"
        SELECT * FROM wallet_transactions
        WHERE user_id = $1 AND tx_type = 'topup' AND status = 'pending'
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Locks the transaction row for the duration of a reconcile so a webhook and a
/// client poll racing on the same source serialize on the row lock.
pub async fn get_transaction_by_source_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    source_id: &str,
) -> Result<Option<WalletTransaction>> {
    sqlx::query_as::<_, WalletTransaction>(
        "SELECT * FROM wallet_transactions WHERE source_id = $1 FOR UPDATE",
    )
    .bind(source_id)
    .fetch_optional(&mut **executor)
    .await
}

pub async fn set_transaction_outcome(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    status: &str,
    bonus_amount: i64,
    gateway_payment_id: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE wallet_transactions
        SET status = $1, bonus_amount = $2, gateway_payment_id = COALESCE($3, gateway_payment_id),
            updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(status)
    .bind(bonus_amount)
    .bind(gateway_payment_id)
    .bind(id)
    .execute(&mut **executor)
    .await?;

    Ok(())
}

pub async fn bump_reconcile_attempts(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<()> {
    sqlx::query(
        "UPDATE wallet_transactions SET reconcile_attempts = reconcile_attempts + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(&mut **executor)
    .await?;

    Ok(())
}

/// Pending topups eligible for a background sweep. SKIP LOCKED keeps concurrent
/// sweep workers and in-flight poll reconciles out of each other's way.
pub async fn lock_pending_topups_for_sweep(
    executor: &mut SqlxTransaction<'_, Postgres>,
    max_attempts: i32,
    limit: i64,
) -> Result<Vec<WalletTransaction>> {
    sqlx::query_as::<_, WalletTransaction>(
        r#"
        SELECT * FROM wallet_transactions
        WHERE tx_type = 'topup' AND status = 'pending' AND reconcile_attempts < $1
        ORDER BY created_at ASC
        LIMIT $2
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(max_attempts)
    .bind(limit)
    .fetch_all(&mut **executor)
    .await
}

pub async fn expire_pending_topups_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE wallet_transactions
        SET status = 'expired', updated_at = NOW()
        WHERE tx_type = 'topup' AND status = 'pending' AND created_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn get_wallet_config(pool: &PgPool) -> Result<Option<WalletConfig>> {
    sqlx::query_as::<_, WalletConfig>(
        "SELECT * FROM wallet_config ORDER BY updated_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

// --- Points Queries ---

pub async fn insert_points_entry(
    executor: &mut SqlxTransaction<'_, Postgres>,
    entry: &PointsEntry,
) -> Result<PointsEntry> {
    sqlx::query_as::<_, PointsEntry>(
        r#"
        INSERT INTO points_entries (id, user_id, amount, entry_type, source_type, notes, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(entry.id)
    .bind(entry.user_id)
    .bind(entry.amount)
    .bind(&entry.entry_type)
    .bind(&entry.source_type)
    .bind(&entry.notes)
    .bind(entry.created_at)
    .fetch_one(&mut **executor)
    .await
}

pub async fn points_balance(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let (balance,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0) FROM points_entries WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(balance)
}

/// Transaction-scoped advisory lock serializing concurrent writers against one
/// user's points ledger. Released automatically at commit or rollback.
pub async fn lock_user_points(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(user_id.to_string())
        .execute(&mut **executor)
        .await?;

    Ok(())
}

/// Balance re-read under the advisory lock, so the sum cannot move between the
/// check and the negative insert.
pub async fn points_balance_in_tx(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<i64> {
    let (balance,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0) FROM points_entries WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&mut **executor)
    .await?;

    Ok(balance)
}

pub async fn lifetime_earned(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let (earned,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(amount), 0) FROM points_entries
        WHERE user_id = $1 AND entry_type = 'earn' AND amount > 0
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(earned)
}

pub async fn list_points_entries(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<PointsEntry>> {
    sqlx::query_as::<_, PointsEntry>(
        "SELECT * FROM points_entries WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn list_tiers(pool: &PgPool) -> Result<Vec<Tier>> {
    sqlx::query_as::<_, Tier>("SELECT * FROM tiers ORDER BY display_order ASC")
        .fetch_all(pool)
        .await
}

pub async fn get_user_tier(pool: &PgPool, user_id: Uuid) -> Result<Option<Tier>> {
    sqlx::query_as::<_, Tier>(
        r#"
        SELECT t.* FROM tiers t
        JOIN user_tiers ut ON ut.tier_id = t.id
        WHERE ut.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Promotion-only upsert: the WHERE clause keeps the recorded tier from moving
/// down when two earns race and the later commit computed from a stale sum.
pub async fn upsert_user_tier(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
    tier_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_tiers (user_id, tier_id, promoted_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (user_id) DO UPDATE SET tier_id = EXCLUDED.tier_id, promoted_at = NOW()
        WHERE (SELECT display_order FROM tiers WHERE id = user_tiers.tier_id)
            < (SELECT display_order FROM tiers WHERE id = EXCLUDED.tier_id)
        "#,
    )
    .bind(user_id)
    .bind(tier_id)
    .execute(&mut **executor)
    .await?;

    Ok(())
}

// --- Membership Card Queries ---

pub async fn get_live_card(pool: &PgPool, user_id: Uuid) -> Result<Option<MembershipCard>> {
    sqlx::query_as::<_, MembershipCard>(
        r#"
        SELECT * FROM membership_cards
        WHERE user_id = $1 AND status IN ('active', 'grace_period')
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_card_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
    statuses: &[&str],
) -> Result<Option<MembershipCard>> {
    let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
    sqlx::query_as::<_, MembershipCard>(
        r#"
        SELECT * FROM membership_cards
        WHERE user_id = $1 AND status = ANY($2)
        ORDER BY updated_at DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(&statuses)
    .fetch_optional(&mut **executor)
    .await
}

pub async fn insert_card(
    executor: &mut SqlxTransaction<'_, Postgres>,
    card: &MembershipCard,
) -> Result<MembershipCard> {
    sqlx::query_as::<_, MembershipCard>(
        r#"
        INSERT INTO membership_cards (
            id, user_id, tier_name, multiplier_bps, card_xp, status,
            expires_at, grace_period_ends_at, birthday_freebie_year, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(card.id)
    .bind(card.user_id)
    .bind(&card.tier_name)
    .bind(card.multiplier_bps)
    .bind(card.card_xp)
    .bind(&card.status)
    .bind(card.expires_at)
    .bind(card.grace_period_ends_at)
    .bind(card.birthday_freebie_year)
    .bind(card.created_at)
    .bind(card.updated_at)
    .fetch_one(&mut **executor)
    .await
}

pub async fn update_card(
    executor: &mut SqlxTransaction<'_, Postgres>,
    card: &MembershipCard,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE membership_cards
        SET tier_name = $1, multiplier_bps = $2, card_xp = $3, status = $4,
            expires_at = $5, grace_period_ends_at = $6, birthday_freebie_year = $7,
            updated_at = NOW()
        WHERE id = $8
        "#,
    )
    .bind(&card.tier_name)
    .bind(card.multiplier_bps)
    .bind(card.card_xp)
    .bind(&card.status)
    .bind(card.expires_at)
    .bind(card.grace_period_ends_at)
    .bind(card.birthday_freebie_year)
    .bind(card.id)
    .execute(&mut **executor)
    .await?;

    Ok(())
}

/// Cards due for a lifecycle transition, locked for the maintenance sweep.
pub async fn lock_cards_due_for_transition(
    executor: &mut SqlxTransaction<'_, Postgres>,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<MembershipCard>> {
    sqlx::query_as::<_, MembershipCard>(
        r#"
        SELECT * FROM membership_cards
        WHERE (status = 'active' AND expires_at <= $1)
           OR (status = 'grace_period' AND grace_period_ends_at <= $1)
        ORDER BY updated_at ASC
        LIMIT $2
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(&mut **executor)
    .await
}

// --- Voucher Queries ---

pub async fn insert_voucher(
    executor: &mut SqlxTransaction<'_, Postgres>,
    voucher: &Voucher,
) -> Result<Voucher> {
    sqlx::query_as::<_, Voucher>(
        r#"
        INSERT INTO vouchers (
            id, code, value, max_uses, used_count, redeemed, user_id,
            expires_at, description, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(voucher.id)
    .bind(&voucher.code)
    .bind(voucher.value)
    .bind(voucher.max_uses)
    .bind(voucher.used_count)
    .bind(voucher.redeemed)
    .bind(voucher.user_id)
    .bind(voucher.expires_at)
    .bind(&voucher.description)
    .bind(voucher.created_at)
    .bind(voucher.updated_at)
    .fetch_one(&mut **executor)
    .await
}

pub async fn get_voucher_by_code(pool: &PgPool, code: &str) -> Result<Option<Voucher>> {
    sqlx::query_as::<_, Voucher>("SELECT * FROM vouchers WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub async fn list_vouchers_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Voucher>> {
    sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Conditional redeem: the WHERE clause is the compare-and-swap that closes the
/// validate/redeem window. Zero rows back means someone else consumed the code.
pub async fn redeem_voucher_cas(pool: &PgPool, code: &str) -> Result<Option<Voucher>> {
    sqlx::query_as::<_, Voucher>(
        r#"
        UPDATE vouchers
        SET used_count = used_count + 1,
            redeemed = (used_count + 1 >= max_uses),
            updated_at = NOW()
        WHERE code = $1 AND NOT redeemed AND used_count < max_uses AND expires_at > NOW()
        RETURNING *
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

// --- Booking Queries ---

pub async fn insert_booking(
    executor: &mut SqlxTransaction<'_, Postgres>,
    booking: &Booking,
) -> Result<Booking> {
    sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            id, customer_id, service_id, barber_id, booking_date, booking_time,
            status, payment_status, voucher_code, booking_code, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(booking.id)
    .bind(booking.customer_id)
    .bind(booking.service_id)
    .bind(booking.barber_id)
    .bind(booking.booking_date)
    .bind(booking.booking_time)
    .bind(&booking.status)
    .bind(&booking.payment_status)
    .bind(&booking.voucher_code)
    .bind(&booking.booking_code)
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .fetch_one(&mut **executor)
    .await
}

pub async fn find_slot_conflict(
    executor: &mut SqlxTransaction<'_, Postgres>,
    barber_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM bookings
        WHERE barber_id = $1 AND booking_date = $2 AND booking_time = $3
          AND status <> 'cancelled'
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(barber_id)
    .bind(date)
    .bind(time)
    .fetch_optional(&mut **executor)
    .await?;

    Ok(row.map(|(id,)| id))
}

pub async fn get_booking(pool: &PgPool, id: Uuid) -> Result<Option<Booking>> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_booking_by_code(pool: &PgPool, booking_code: &str) -> Result<Option<Booking>> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_code = $1")
        .bind(booking_code)
        .fetch_optional(pool)
        .await
}

pub async fn get_booking_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Booking>> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn list_bookings_by_customer(
    pool: &PgPool,
    customer_id: Uuid,
    limit: i64,
) -> Result<Vec<Booking>> {
    sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE customer_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(customer_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn update_booking_status(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    status: &str,
) -> Result<()> {
    sqlx::query("UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut **executor)
        .await?;

    Ok(())
}

pub async fn update_booking_payment_status(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    payment_status: &str,
) -> Result<()> {
    sqlx::query("UPDATE bookings SET payment_status = $1, updated_at = NOW() WHERE id = $2")
        .bind(payment_status)
        .bind(id)
        .execute(&mut **executor)
        .await?;

    Ok(())
}

// --- Queue Queries ---

/// Position assignment happens inside the insert so two concurrent joins cannot
/// read the same MAX before either writes.
pub async fn insert_queue_entry(
    executor: &mut SqlxTransaction<'_, Postgres>,
    branch_id: Uuid,
    customer_id: Uuid,
    queue_code: &str,
) -> Result<QueueEntry> {
    sqlx::query_as::<_, QueueEntry>(
        r#"
        INSERT INTO queue_entries (id, branch_id, customer_id, queue_code, position, status, created_at, updated_at)
        SELECT $1, $2, $3, $4, COALESCE(MAX(position), 0) + 1, 'waiting', NOW(), NOW()
        FROM queue_entries WHERE branch_id = $2
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(branch_id)
    .bind(customer_id)
    .bind(queue_code)
    .fetch_one(&mut **executor)
    .await
}

pub async fn next_waiting_entry_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    branch_id: Uuid,
) -> Result<Option<QueueEntry>> {
    sqlx::query_as::<_, QueueEntry>(
        r#"
        SELECT * FROM queue_entries
        WHERE branch_id = $1 AND status = 'waiting'
        ORDER BY position ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(branch_id)
    .fetch_optional(&mut **executor)
    .await
}

pub async fn get_queue_entry_by_code(pool: &PgPool, queue_code: &str) -> Result<Option<QueueEntry>> {
    sqlx::query_as::<_, QueueEntry>("SELECT * FROM queue_entries WHERE queue_code = $1")
        .bind(queue_code)
        .fetch_optional(pool)
        .await
}

pub async fn get_queue_entry_by_code_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    queue_code: &str,
) -> Result<Option<QueueEntry>> {
    sqlx::query_as::<_, QueueEntry>(
        "SELECT * FROM queue_entries WHERE queue_code = $1 FOR UPDATE",
    )
    .bind(queue_code)
    .fetch_optional(&mut **executor)
    .await
}

pub async fn set_queue_entry_status(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    status: &str,
) -> Result<()> {
    sqlx::query("UPDATE queue_entries SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(&mut **executor)
        .await?;

    Ok(())
}

pub async fn count_waiting_ahead(pool: &PgPool, branch_id: Uuid, position: i32) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM queue_entries
        WHERE branch_id = $1 AND status = 'waiting' AND position < $2
        "#,
    )
    .bind(branch_id)
    .bind(position)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
