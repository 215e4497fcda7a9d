//! Database migration command.
//!
//! Migrations are embedded from `crates/api/migrations/` at compile time and
//! tracked by sqlx in `_sqlx_migrations`, so running the command twice is a
//! no-op.

use thiserror::Error;
use tracing::info;

use coffee_catalog_api::config::{ApiConfig, ConfigError};
use coffee_catalog_api::db::{self, MIGRATOR};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run every pending catalog migration.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let config = ApiConfig::from_env()?;

    info!("Connecting to catalog database...");
    let pool = db::create_pool(&config.database_url, &config.database).await?;

    info!(
        migrations = MIGRATOR.iter().count(),
        "Running catalog migrations..."
    );
    MIGRATOR.run(&pool).await?;

    info!("Catalog migrations complete!");
    Ok(())
}
