mod common;

use common::setup_test_app;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn earn_applies_the_tier_multiplier() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    // Fresh user sits in Bronze (1.00x): 400 points for a ₱400 payment.
    let res = client
        .post(format!("{}/points/{}/earn", base_url, user_id))
        .json(&json!({ "amount": 40000, "source_type": "payment" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let result: serde_json::Value = res.json().await.unwrap();
    assert_eq!(result["awarded"], 40000);
    assert_eq!(result["lifetime_earned"], 40000);
    assert!(result["promoted_to"].is_null());

    let res = client
        .get(format!("{}/points/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    let ledger: serde_json::Value = res.json().await.unwrap();
    assert_eq!(ledger["current_balance"], 40000);
    assert_eq!(ledger["lifetime_earned"], 40000);
}

#[tokio::test]
async fn crossing_a_threshold_promotes_and_next_earn_uses_the_new_multiplier() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    // 5000.00 points crosses the Silver threshold (500000).
    let res = client
        .post(format!("{}/points/{}/earn", base_url, user_id))
        .json(&json!({ "amount": 500000, "source_type": "payment" }))
        .send()
        .await
        .unwrap();
    let result: serde_json::Value = res.json().await.unwrap();
    assert_eq!(result["promoted_to"], "Silver");

    // Next earn is scaled by the Silver 1.05x multiplier.
    let res = client
        .post(format!("{}/points/{}/earn", base_url, user_id))
        .json(&json!({ "amount": 10000, "source_type": "payment" }))
        .send()
        .await
        .unwrap();
    let result: serde_json::Value = res.json().await.unwrap();
    assert_eq!(result["awarded"], 10500);
}

#[tokio::test]
async fn tier_progress_reports_percentage_toward_the_next_tier() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    client
        .post(format!("{}/points/{}/earn", base_url, user_id))
        .json(&json!({ "amount": 400000, "source_type": "payment" }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{}/points/{}/tier-progress", base_url, user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let progress: serde_json::Value = res.json().await.unwrap();
    assert_eq!(progress["current_tier"]["name"], "Bronze");
    assert_eq!(progress["next_tier"]["name"], "Silver");
    assert_eq!(progress["progress_percent"], 80);
}

#[tokio::test]
async fn redeem_fails_when_balance_is_short() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    client
        .post(format!("{}/points/{}/earn", base_url, user_id))
        .json(&json!({ "amount": 10000, "source_type": "payment" }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/points/{}/redeem", base_url, user_id))
        .json(&json!({ "amount": 20000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Balance untouched, and the redemption never hit the ledger.
    let res = client
        .get(format!("{}/points/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    let ledger: serde_json::Value = res.json().await.unwrap();
    assert_eq!(ledger["current_balance"], 10000);
}

#[tokio::test]
async fn redeem_reduces_balance_but_not_lifetime() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    client
        .post(format!("{}/points/{}/earn", base_url, user_id))
        .json(&json!({ "amount": 30000, "source_type": "payment" }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/points/{}/redeem", base_url, user_id))
        .json(&json!({ "amount": 10000, "notes": "Free haircut" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(format!("{}/points/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    let ledger: serde_json::Value = res.json().await.unwrap();
    assert_eq!(ledger["current_balance"], 20000);
    assert_eq!(ledger["lifetime_earned"], 30000);
}

#[tokio::test]
async fn concurrent_redeems_cannot_overdraw_the_balance() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    client
        .post(format!("{}/points/{}/earn", base_url, user_id))
        .json(&json!({ "amount": 10000, "source_type": "payment" }))
        .send()
        .await
        .unwrap();

    // Two full-balance redeems race; the per-user lock lets only one through.
    let (a, b) = tokio::join!(
        client
            .post(format!("{}/points/{}/redeem", base_url, user_id))
            .json(&json!({ "amount": 10000 }))
            .send(),
        client
            .post(format!("{}/points/{}/redeem", base_url, user_id))
            .json(&json!({ "amount": 10000 }))
            .send(),
    );

    let statuses = [a.unwrap().status(), b.unwrap().status()];
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::CREATED)
            .count(),
        1,
        "exactly one redeem should succeed, got {:?}",
        statuses
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::CONFLICT)
            .count(),
        1
    );

    let res = client
        .get(format!("{}/points/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    let ledger: serde_json::Value = res.json().await.unwrap();
    assert_eq!(ledger["current_balance"], 0);
}

async fn tier_id(pool: &sqlx::PgPool, name: &str) -> Uuid {
    let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM tiers WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
    id
}

async fn record_tier(pool: &sqlx::PgPool, user_id: Uuid, tier: Uuid) {
    let mut tx = pool.begin().await.unwrap();
    trimbook_core::db::queries::upsert_user_tier(&mut tx, user_id, tier)
        .await
        .unwrap();
    tx.commit().await.unwrap();
}

async fn recorded_tier(pool: &sqlx::PgPool, user_id: Uuid) -> String {
    let (name,): (String,) = sqlx::query_as(
        "SELECT t.name FROM tiers t JOIN user_tiers ut ON ut.tier_id = t.id WHERE ut.user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap();
    name
}

#[tokio::test]
async fn recorded_tier_never_moves_down() {
    let server = mockito::Server::new_async().await;
    let (_base_url, pool, _container) = setup_test_app(&server.url()).await;

    let user_id = Uuid::new_v4();
    let bronze = tier_id(&pool, "Bronze").await;
    let gold = tier_id(&pool, "Gold").await;
    let platinum = tier_id(&pool, "Platinum").await;

    record_tier(&pool, user_id, gold).await;
    assert_eq!(recorded_tier(&pool, user_id).await, "Gold");

    // A stale writer trying to record a lower tier is a no-op.
    record_tier(&pool, user_id, bronze).await;
    assert_eq!(recorded_tier(&pool, user_id).await, "Gold");

    record_tier(&pool, user_id, platinum).await;
    assert_eq!(recorded_tier(&pool, user_id).await, "Platinum");
}

#[tokio::test]
async fn unknown_earn_source_is_rejected() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/points/{}/earn", base_url, Uuid::new_v4()))
        .json(&json!({ "amount": 10000, "source_type": "lottery" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
