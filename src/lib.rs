pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod services;
pub mod validation;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::gateway::GatewayClient;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub gateway: GatewayClient,
    pub config: Config,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Wallet
        .route("/wallets/:user_id", get(handlers::wallet::get_wallet))
        .route("/wallets/:user_id", post(handlers::wallet::ensure_wallet))
        .route(
            "/wallets/:user_id/transactions",
            get(handlers::wallet::list_transactions),
        )
        .route("/wallets/:user_id/spend", post(handlers::wallet::spend))
        .route("/wallets/:user_id/refund", post(handlers::wallet::refund))
        // Top-ups
        .route("/wallets/:user_id/topups", post(handlers::topup::initiate))
        .route(
            "/wallets/:user_id/topups/pending",
            get(handlers::wallet::list_pending_topups),
        )
        .route("/topups/:source_id/check", post(handlers::topup::check))
        .route("/webhooks/gateway", post(handlers::webhook::gateway_webhook))
        // Loyalty points
        .route("/points/:user_id", get(handlers::points::ledger))
        .route("/points/:user_id/history", get(handlers::points::history))
        .route("/points/:user_id/earn", post(handlers::points::earn))
        .route("/points/:user_id/redeem", post(handlers::points::redeem))
        .route("/points/:user_id/adjust", post(handlers::points::adjust))
        .route(
            "/points/:user_id/tier-progress",
            get(handlers::points::tier_progress),
        )
        .route("/tiers", get(handlers::points::list_tiers))
        // Membership cards
        .route("/cards/:user_id", get(handlers::cards::get_card))
        .route("/cards/:user_id/purchase", post(handlers::cards::purchase))
        .route("/cards/:user_id/renew", post(handlers::cards::renew))
        .route("/cards/:user_id/xp", post(handlers::cards::award_xp))
        .route(
            "/cards/:user_id/birthday-freebie",
            post(handlers::cards::birthday_freebie),
        )
        // Vouchers
        .route("/vouchers", post(handlers::vouchers::create))
        .route("/vouchers/validate", post(handlers::vouchers::validate))
        .route("/vouchers/redeem", post(handlers::vouchers::redeem))
        .route(
            "/vouchers/user/:user_id",
            get(handlers::vouchers::list_for_user),
        )
        // Bookings
        .route("/bookings", post(handlers::bookings::create))
        .route(
            "/bookings/code/:booking_code",
            get(handlers::bookings::get_by_code),
        )
        .route(
            "/bookings/customer/:customer_id",
            get(handlers::bookings::list_for_customer),
        )
        .route("/bookings/:id/status", post(handlers::bookings::update_status))
        .route(
            "/bookings/:id/payment-status",
            post(handlers::bookings::update_payment_status),
        )
        .route("/bookings/:id/cancel", post(handlers::bookings::cancel))
        // Walk-in queue
        .route("/queues/:branch_id/join", post(handlers::queue::join))
        .route("/queues/:branch_id/call-next", post(handlers::queue::call_next))
        .route("/queue-entries/:queue_code", get(handlers::queue::position))
        .route(
            "/queue-entries/:queue_code/served",
            post(handlers::queue::mark_served),
        )
        .route(
            "/queue-entries/:queue_code/leave",
            post(handlers::queue::leave),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
