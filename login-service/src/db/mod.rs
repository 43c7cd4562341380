//! Database module for PostgreSQL connection management and seeding.

use crate::config::{DatabaseConfig, SeedConfig};
use crate::models::CredentialRecord;
use crate::services::{CredentialStore, CredentialVerifier, ServiceError};
use crate::utils::Password;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(config.url.expose_secret())
        .await?;

    tracing::info!("Successfully connected to PostgreSQL");

    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

/// Insert the default admin account when a password is configured and the
/// store is empty. Returns whether a record was written.
pub async fn seed_default_admin(
    store: &dyn CredentialStore,
    verifier: &dyn CredentialVerifier,
    seed: &SeedConfig,
) -> Result<bool, ServiceError> {
    let Some(password) = seed.admin_password.as_ref() else {
        tracing::info!("SEED_ADMIN_PASSWORD not set; skipping admin seeding");
        return Ok(false);
    };

    if store.count().await? > 0 {
        tracing::debug!("Credential store already populated; skipping admin seeding");
        return Ok(false);
    }

    let hash = verifier.hash(&Password::new(password.expose_secret().clone()))?;
    let record = CredentialRecord::new(
        seed.admin_email.clone(),
        hash.into_string(),
        seed.admin_role.clone(),
    );
    store.insert(&record).await?;

    tracing::info!(
        email = %seed.admin_email,
        role = %seed.admin_role,
        "Seeded default admin account"
    );
    Ok(true)
}
