//! Database migration command.
//!
//! Applies the migrations in `crates/storefront/migrations/` (shop schema and
//! the session table). Already-applied migrations are skipped.

use super::{CommandError, connect};

/// Run pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    enf_storefront::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
