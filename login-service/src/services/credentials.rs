use crate::models::CredentialRecord;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Checks a presented secret against a stored hash.
///
/// Implementations are CPU-bound and synchronous; async callers should run
/// them on the blocking pool.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, record: &CredentialRecord, presented: &Password) -> bool;

    fn hash(&self, secret: &Password) -> Result<PasswordHashString, anyhow::Error>;
}

/// Argon2id over PHC-format hash strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2CredentialVerifier;

impl Argon2CredentialVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialVerifier for Argon2CredentialVerifier {
    fn verify(&self, record: &CredentialRecord, presented: &Password) -> bool {
        let stored = PasswordHashString::new(record.password_hash.clone());
        match verify_password(presented, &stored) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(
                    user_id = %record.user_id,
                    error = %e,
                    "Stored credential hash could not be verified"
                );
                false
            }
        }
    }

    fn hash(&self, secret: &Password) -> Result<PasswordHashString, anyhow::Error> {
        hash_password(secret)
    }
}
