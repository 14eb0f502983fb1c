mod common;

use common::setup_test_app;
use sqlx::PgPool;
use trimbook_core::gateway::GatewayClient;
use trimbook_core::services::reconciler::sweep_once;
use uuid::Uuid;

async fn seed_pending_topup(
    pool: &PgPool,
    user_id: Uuid,
    source_id: &str,
    amount: i64,
    attempts: i32,
    age_hours: i64,
) {
    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (
            id, user_id, tx_type, amount, bonus_amount, status, source_id,
            gateway_payment_id, description, reconcile_attempts, created_at, updated_at
        ) VALUES (
            gen_random_uuid(), $1, 'topup', $2, 0, 'pending', $3,
            NULL, NULL, $4, NOW() - make_interval(hours => $5), NOW()
        )
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(source_id)
    .bind(attempts)
    .bind(age_hours)
    .execute(pool)
    .await
    .unwrap();
}

async fn topup_state(pool: &PgPool, source_id: &str) -> (String, i32) {
    sqlx::query_as(
        "SELECT status, reconcile_attempts FROM wallet_transactions WHERE source_id = $1",
    )
    .bind(source_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn sweep_expires_stale_rows_and_credits_chargeable_ones() {
    let mut server = mockito::Server::new_async().await;
    let (_base_url, pool, _container) = setup_test_app(&server.url()).await;
    let gateway = GatewayClient::new(server.url(), "sk_test_123");

    let user_id = Uuid::new_v4();

    // Older than the 24h gateway session TTL: expired without a gateway call.
    seed_pending_topup(&pool, user_id, "src_stale", 50000, 0, 25).await;
    // Fresh and chargeable: swept and credited.
    seed_pending_topup(&pool, user_id, "src_fresh", 30000, 0, 1).await;

    let _get_source = server
        .mock("GET", "/sources/src_fresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"src_fresh","attributes":{"status":"chargeable","redirect":null}}}"#,
        )
        .create_async()
        .await;
    let _create_payment = server
        .mock("POST", "/payments")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"pay_fresh","attributes":{"status":"paid","redirect":null}}}"#,
        )
        .create_async()
        .await;

    let processed = sweep_once(&pool, &gateway).await.unwrap();
    assert_eq!(processed, 2);

    let (status, _) = topup_state(&pool, "src_stale").await;
    assert_eq!(status, "expired");

    let (status, _) = topup_state(&pool, "src_fresh").await;
    assert_eq!(status, "completed");

    let (balance,): (i64,) =
        sqlx::query_as("SELECT balance FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(balance, 30000);
}

#[tokio::test]
async fn sweep_skips_rows_past_the_attempt_bound() {
    let server = mockito::Server::new_async().await;
    let (_base_url, pool, _container) = setup_test_app(&server.url()).await;
    let gateway = GatewayClient::new(server.url(), "sk_test_123");

    let user_id = Uuid::new_v4();

    // At the attempt bound: left pending for webhook or manual resolution. No
    // gateway mock is registered, so a sweep that touched it would error and
    // bump the counter.
    seed_pending_topup(&pool, user_id, "src_bound", 40000, 30, 1).await;

    let processed = sweep_once(&pool, &gateway).await.unwrap();
    assert_eq!(processed, 0);

    let (status, attempts) = topup_state(&pool, "src_bound").await;
    assert_eq!(status, "pending");
    assert_eq!(attempts, 30);
}

#[tokio::test]
async fn sweep_still_pending_bumps_the_attempt_counter() {
    let mut server = mockito::Server::new_async().await;
    let (_base_url, pool, _container) = setup_test_app(&server.url()).await;
    let gateway = GatewayClient::new(server.url(), "sk_test_123");

    seed_pending_topup(&pool, Uuid::new_v4(), "src_waiting", 20000, 4, 1).await;

    let _get_source = server
        .mock("GET", "/sources/src_waiting")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"src_waiting","attributes":{"status":"pending","redirect":null}}}"#,
        )
        .create_async()
        .await;

    sweep_once(&pool, &gateway).await.unwrap();

    let (status, attempts) = topup_state(&pool, "src_waiting").await;
    assert_eq!(status, "pending");
    assert_eq!(attempts, 5);
}
