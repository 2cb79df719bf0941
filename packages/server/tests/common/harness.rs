//! Test harnesses for integration testing.
//!
//! `TestHarness` runs the market over the in-memory store with mocked
//! external services. `PostgresHarness` runs it over a shared Postgres
//! container; containers and migrations are initialized once on first use.

use anyhow::{Context, Result};
use market_core::common::{AccountId, Principal, Role};
use market_core::kernel::{
    MarketSettings, MemoryStore, MockAuthorityScore, PostgresStore, TestDependencies,
};
use market_core::Market;
use sqlx::PgPool;
use std::sync::Arc;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

fn init_tracing() {
    // Run tests with: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Market over the in-memory store.
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let seller = ctx.seller().await;
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    pub market: Market,
    pub store: Arc<MemoryStore>,
    pub authority: Arc<MockAuthorityScore>,
    pub admin: Principal,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::with_settings(MarketSettings::default())
            .await
            .expect("Failed to create test harness")
    }
}

impl TestHarness {
    pub async fn with_settings(settings: MarketSettings) -> Result<Self> {
        Self::with_deps(TestDependencies::new().settings(settings)).await
    }

    pub async fn with_deps(deps: TestDependencies) -> Result<Self> {
        init_tracing();

        let store = deps.store.clone();
        let authority = deps.authority.clone();
        let fee_account = deps.settings.fee_account;
        let market = Market::new(deps.into_server_deps());

        let admin = Principal::new(AccountId::new(), Role::Admin);
        market.open_account(admin.account_id, Role::Admin).await?;
        if let Some(fee_account) = fee_account {
            market.open_account(fee_account, Role::Admin).await?;
        }

        Ok(Self {
            market,
            store,
            authority,
            admin,
        })
    }
}

/// Shared Postgres container; started once and reused by every test.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        init_tracing();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Market over a real Postgres store.
///
/// Tests share one database, so every fixture uses fresh ids.
pub struct PostgresHarness {
    pub market: Market,
    pub db_pool: PgPool,
    pub admin: Principal,
}

impl AsyncTestContext for PostgresHarness {
    async fn setup() -> Self {
        Self::new()
            .await
            .expect("Failed to create Postgres test harness")
    }
}

impl PostgresHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let test_deps = TestDependencies::new();
        let mut deps = test_deps.into_server_deps();
        deps.store = Arc::new(PostgresStore::new(db_pool.clone()));
        let market = Market::new(deps);

        let admin = Principal::new(AccountId::new(), Role::Admin);
        market.open_account(admin.account_id, Role::Admin).await?;

        Ok(Self {
            market,
            db_pool,
            admin,
        })
    }
}
