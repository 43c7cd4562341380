//! Stored credential record - one row per account.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Credential record as held by the credential store.
///
/// `email` is the login identifier and is unique across records. The
/// orchestrator only ever reads these.
#[derive(Debug, Clone, FromRow)]
pub struct CredentialRecord {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_utc: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(email: String, password_hash: String, role: String) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            password_hash,
            role,
            created_utc: Utc::now(),
        }
    }

    /// Token subject for this account.
    pub fn subject(&self) -> String {
        self.user_id.to_string()
    }
}
