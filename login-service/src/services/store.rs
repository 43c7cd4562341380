//! Credential store: resolves a login identifier to its stored record.

use crate::models::CredentialRecord;
use crate::services::ServiceError;
use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::postgres::PgPool;
use std::sync::Arc;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact, case-preserving match on the identifier.
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, ServiceError>;

    async fn insert(&self, record: &CredentialRecord) -> Result<(), ServiceError>;

    async fn count(&self) -> Result<i64, ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError>;
}

/// Postgres-backed store over the `users` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, ServiceError> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            r#"
            SELECT user_id, email, password_hash, role, created_utc
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert(&self, record: &CredentialRecord) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash, role, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.user_id)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(&record.role)
        .bind(record.created_utc)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> Result<i64, ServiceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            ServiceError::Database(e)
        })?;
        Ok(())
    }
}

/// In-process store keyed by identifier. Used by tests and local runs
/// without a database.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    records: Arc<DashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.records.insert(record.email.clone(), record);
        }
        store
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, ServiceError> {
        Ok(self.records.get(identifier).map(|r| r.value().clone()))
    }

    async fn insert(&self, record: &CredentialRecord) -> Result<(), ServiceError> {
        if self.records.contains_key(&record.email) {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "Identifier already exists: {}",
                record.email
            )));
        }
        self.records.insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn count(&self) -> Result<i64, ServiceError> {
        Ok(self.records.len() as i64)
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}
