//! Services layer for login-service.
//!
//! The login orchestrator and the collaborators it sequences: risk
//! verification, credential lookup and verification, and token issuance.

pub mod credentials;
pub mod error;
pub mod login;
pub mod metrics;
pub mod risk;
pub mod store;
pub mod token;

pub use credentials::{Argon2CredentialVerifier, CredentialVerifier};
pub use error::{LoginError, LoginErrorKind, ServiceError};
pub use login::{LoginOutcome, LoginService};
pub use risk::{evaluate, RecaptchaVerifier, RiskVerdict, RiskVerifier, SiteVerifyResponse};
pub use store::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
pub use token::{JwtTokenIssuer, TokenClaims, TokenIssuer};
