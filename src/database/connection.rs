use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::repository::PersistenceError;
use crate::config::models::DatabaseConfig;
use crate::constants::database::{CONNECTION_TIMEOUT_SECS, STATEMENT_TIMEOUT_MS};

pub type DatabasePool = Pool<Postgres>;

/// Builds Postgres connect options from the configured parts, with a
/// per-statement deadline on every session
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, PersistenceError> {
    let ssl_mode = PgSslMode::from_str(&config.sslmode).map_err(PersistenceError::Connection)?;

    Ok(PgConnectOptions::new()
        .host(&config.hostname)
        .port(config.port)
        .username(&config.username)
        .password(config.password.expose_secret())
        .database(&config.database)
        .ssl_mode(ssl_mode)
        .options([("statement_timeout", STATEMENT_TIMEOUT_MS)]))
}

/// Establishes a connection pool to the PostgreSQL database
pub async fn establish_connection(config: &DatabaseConfig) -> Result<DatabasePool, PersistenceError> {
    info!(
        "Connecting to PostgreSQL database {} at {}:{}",
        config.database, config.hostname, config.port
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
        .connect_with(connect_options(config)?)
        .await
        .map_err(PersistenceError::Connection)?;

    info!("Successfully connected to PostgreSQL database");

    Ok(pool)
}

/// Run pending migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), PersistenceError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await?;

    info!("Database migrations completed successfully");

    Ok(())
}
