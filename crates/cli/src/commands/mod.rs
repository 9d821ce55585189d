//! Command implementations.

pub mod carts;
pub mod migrate;
pub mod orders;
pub mod seed;
pub mod users;

use sqlx::PgPool;
use thiserror::Error;

use enf_storefront::config::{ConfigError, StorefrontConfig};
use enf_storefront::db::{self, RepositoryError};
use enf_storefront::services::{AccountError, PaymentError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Account creation failed.
    #[error("{0}")]
    Account(#[from] AccountError),

    /// Order update failed.
    #[error("{0}")]
    Payment(#[from] PaymentError),

    /// Input file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Input file is not valid YAML for the expected shape.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Input data is well-formed but unusable.
    #[error("Invalid seed data: {0}")]
    Seed(String),

    /// A command-line argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Connect using the storefront's database settings.
async fn connect() -> Result<PgPool, CommandError> {
    let config = StorefrontConfig::from_env()?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&config.database_url).await?)
}
