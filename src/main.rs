use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trimbook_core::config::Config;
use trimbook_core::gateway::GatewayClient;
use trimbook_core::services::{run_card_maintenance, run_reconciler};
use trimbook_core::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::create_pool(&config).await?;

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let gateway = GatewayClient::new(
        config.gateway_base_url.clone(),
        &config.gateway_secret_key,
    );
    tracing::info!("Payment gateway client initialized with URL: {}", config.gateway_base_url);

    tokio::spawn(run_reconciler(pool.clone(), gateway.clone()));
    tokio::spawn(run_card_maintenance(pool.clone()));

    let state = AppState {
        db: pool,
        gateway,
        config: config.clone(),
    };
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
