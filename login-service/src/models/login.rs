//! Per-request login input and its outcome.

use crate::utils::Password;

/// Action label the risk widget is bound to for password logins.
pub const LOGIN_ACTION: &str = "login";

/// A single login attempt. Built once per request and consumed by the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    email: String,
    password: Password,
    risk_token: String,
    action: String,
}

impl LoginRequest {
    pub fn new(
        email: impl Into<String>,
        password: Password,
        risk_token: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password,
            risk_token: risk_token.into(),
            action: action.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn risk_token(&self) -> &str {
        &self.risk_token
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

/// Signed bearer token handed back on a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken(String);

impl IssuedToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
