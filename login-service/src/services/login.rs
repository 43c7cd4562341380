//! Login orchestration: risk check, credential lookup, secret verification
//! and token issuance, each stage a strict gate for the next.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{CredentialRecord, IssuedToken, LoginRequest};
use crate::services::credentials::CredentialVerifier;
use crate::services::error::{LoginError, ServiceError};
use crate::services::risk::RiskVerifier;
use crate::services::store::CredentialStore;
use crate::services::token::TokenIssuer;
use crate::utils::Password;

pub type LoginOutcome = Result<IssuedToken, LoginError>;

#[derive(Clone)]
pub struct LoginService {
    risk: Arc<dyn RiskVerifier>,
    store: Arc<dyn CredentialStore>,
    verifier: Arc<dyn CredentialVerifier>,
    tokens: Arc<dyn TokenIssuer>,
    decoy: Arc<CredentialRecord>,
}

impl LoginService {
    pub fn new(
        risk: Arc<dyn RiskVerifier>,
        store: Arc<dyn CredentialStore>,
        verifier: Arc<dyn CredentialVerifier>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Result<Self, ServiceError> {
        // Verified against on the not-found path so both failure paths pay one hash.
        let decoy_hash = verifier.hash(&Password::new(Uuid::new_v4().to_string()))?;
        let decoy = CredentialRecord::new(
            String::new(),
            decoy_hash.into_string(),
            String::new(),
        );

        Ok(Self {
            risk,
            store,
            verifier,
            tokens,
            decoy: Arc::new(decoy),
        })
    }

    /// Run [`login`](Self::login) under a deadline. Once it passes the token
    /// is cancelled and the pipeline exits at its next cancellable stage.
    pub async fn login_within(&self, request: LoginRequest, deadline: Duration) -> LoginOutcome {
        let cancel = CancellationToken::new();
        let login = self.login(request, &cancel);
        tokio::pin!(login);

        tokio::select! {
            outcome = &mut login => outcome,
            _ = tokio::time::sleep(deadline) => {
                cancel.cancel();
                login.await
            }
        }
    }

    #[tracing::instrument(skip_all, fields(email = %request.email()))]
    pub async fn login(&self, request: LoginRequest, cancel: &CancellationToken) -> LoginOutcome {
        let verdict = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Login cancelled during risk verification");
                return Err(LoginError::cancelled());
            }
            verdict = self.risk.verify(request.risk_token(), request.action()) => verdict,
        };

        if !verdict.passed {
            tracing::warn!(reason = ?verdict.reason, "Login rejected by risk verifier");
            return Err(LoginError::risk_rejected());
        }

        let lookup = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Login cancelled during credential lookup");
                return Err(LoginError::cancelled());
            }
            lookup = self.store.find_by_identifier(request.email()) => lookup,
        };

        let record = match lookup {
            Ok(Some(record)) => record,
            Ok(None) => {
                let _ = self
                    .check_secret(self.decoy.clone(), request.password().clone())
                    .await;
                tracing::warn!("Login failed: unknown identifier");
                return Err(LoginError::identity_not_found());
            }
            Err(e) => {
                tracing::error!(error = %e, "Credential store lookup failed");
                return Err(LoginError::unavailable());
            }
        };

        let subject = record.subject();
        let email = record.email.clone();

        if !self
            .check_secret(Arc::new(record), request.password().clone())
            .await?
        {
            tracing::warn!(user_id = %subject, "Login failed: invalid credentials");
            return Err(LoginError::credentials_invalid());
        }

        let token = self.tokens.issue(&subject, &email).map_err(|e| {
            tracing::error!(error = %e, "Token issuance failed");
            LoginError::unavailable()
        })?;

        tracing::info!(user_id = %subject, "Login succeeded");
        Ok(token)
    }

    async fn check_secret(
        &self,
        record: Arc<CredentialRecord>,
        presented: Password,
    ) -> Result<bool, LoginError> {
        let verifier = self.verifier.clone();
        tokio::task::spawn_blocking(move || verifier.verify(&record, &presented))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Credential verification task failed");
                LoginError::unavailable()
            })
    }
}
