use service_core::error::AppError;
use thiserror::Error;

/// Failures inside the service layer's collaborators.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Startup-only: the service must not accept traffic.
    #[error("Fatal configuration error: {0}")]
    ConfigurationFatal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::ConfigurationFatal(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
        }
    }
}

/// Reason a login did not produce a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginErrorKind {
    RiskRejected,
    IdentityNotFound,
    CredentialsInvalid,
    Cancelled,
    Unavailable,
}

impl LoginErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginErrorKind::RiskRejected => "risk_rejected",
            LoginErrorKind::IdentityNotFound => "identity_not_found",
            LoginErrorKind::CredentialsInvalid => "credentials_invalid",
            LoginErrorKind::Cancelled => "cancelled",
            LoginErrorKind::Unavailable => "unavailable",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{description}")]
pub struct LoginError {
    pub kind: LoginErrorKind,
    pub description: String,
}

impl LoginError {
    fn new(kind: LoginErrorKind, description: &str) -> Self {
        Self {
            kind,
            description: description.to_string(),
        }
    }

    pub fn risk_rejected() -> Self {
        Self::new(LoginErrorKind::RiskRejected, "The risk validation failed.")
    }

    pub fn identity_not_found() -> Self {
        Self::new(LoginErrorKind::IdentityNotFound, "User not found.")
    }

    pub fn credentials_invalid() -> Self {
        Self::new(LoginErrorKind::CredentialsInvalid, "Invalid email or password.")
    }

    pub fn cancelled() -> Self {
        Self::new(LoginErrorKind::Cancelled, "The login request was cancelled.")
    }

    pub fn unavailable() -> Self {
        Self::new(
            LoginErrorKind::Unavailable,
            "The login service is temporarily unavailable.",
        )
    }
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        let cause = anyhow::anyhow!(err.description);
        match err.kind {
            LoginErrorKind::RiskRejected => AppError::BadRequest(cause),
            // Same status for both; only the title tells them apart.
            LoginErrorKind::IdentityNotFound | LoginErrorKind::CredentialsInvalid => {
                AppError::Unauthorized(cause)
            }
            LoginErrorKind::Cancelled => AppError::RequestTimeout(cause),
            LoginErrorKind::Unavailable => AppError::ServiceUnavailable(cause),
        }
    }
}
