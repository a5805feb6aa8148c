//! Connection pool and schema migrations

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::BillingResult;

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> BillingResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!("Database pool created");
    Ok(pool)
}

/// Apply the migrations embedded from `migrations/`
pub async fn run_migrations(pool: &PgPool) -> BillingResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Billing migrations applied");
    Ok(())
}
