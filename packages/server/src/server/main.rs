// Main entry point for the marketplace API server

use std::sync::Arc;

use anyhow::{Context, Result};
use market_core::common::{MarketError, Role};
use market_core::domains::auth::JwtService;
use market_core::kernel::scheduled_tasks::start_scheduler;
use market_core::kernel::{
    BaseAuthorityScore, BaseStore, ChallengeStore, DisabledAuthorityScore,
    Market, MemoryStore, PostgresStore, RapidApiAuthorityClient, ServerDeps,
};
use market_core::{server::build_app, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,market_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting domain marketplace API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let store: Arc<dyn BaseStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");

            Arc::new(PostgresStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; state lives in memory and is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let authority: Arc<dyn BaseAuthorityScore> = match config.rapidapi_key.clone() {
        Some(api_key) => Arc::new(
            RapidApiAuthorityClient::new(api_key, config.rapidapi_host.clone())
                .context("Failed to build authority score client")?,
        ),
        None => {
            tracing::warn!("RAPIDAPI_KEY not set; listings are submitted without authority scores");
            Arc::new(DisabledAuthorityScore)
        }
    };

    let challenges = Arc::new(ChallengeStore::new(config.captcha_ttl()));
    let deps = ServerDeps::new(store, authority, challenges.clone(), config.market_settings());
    let market = Market::new(deps);

    if let Some(fee_account) = config.fee_account_id {
        match market.open_account(fee_account, Role::Admin).await {
            Ok(_) | Err(MarketError::Conflict(_)) => {
                tracing::info!(account_id = %fee_account, "Fee account ready")
            }
            Err(e) => return Err(e).context("Failed to open fee account"),
        }
    }

    let _scheduler = start_scheduler(market.clone(), challenges)
        .await
        .context("Failed to start scheduler")?;
    tracing::info!("Scheduled tasks started");

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let app = build_app(market, jwt_service, config.webhook_secret.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
