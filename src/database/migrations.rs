//! # Schema Migrations
//!
//! Migrations live in `migrations/` as `YYYYMMDDHHMMSS_description.sql` and are
//! embedded at compile time. Tests use the same migrator through
//! `#[sqlx::test(migrator = "orders_core::database::MIGRATOR")]`.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply outstanding migrations. Safe to call on every startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;

    info!(
        migrations = MIGRATOR.iter().count(),
        "Database schema is up to date"
    );
    Ok(())
}
