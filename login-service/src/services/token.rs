use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::IssuedToken;
use crate::services::ServiceError;

/// Lifetime used when the configured expiry is unset or non-positive.
pub const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Minimum HS256 key length in bytes.
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Claims carried by an issued token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Unique per token
    pub jti: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Mints signed assertions from verified identity facts.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, subject_id: &str, email: &str) -> Result<IssuedToken, ServiceError>;
}

/// HS256 token issuer and validator.
#[derive(Clone)]
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    lifetime_minutes: i64,
}

impl JwtTokenIssuer {
    pub fn new(config: &JwtConfig) -> Result<Self, ServiceError> {
        let secret = config.secret_key.expose_secret();
        if secret.len() < MIN_SIGNING_KEY_BYTES {
            return Err(ServiceError::ConfigurationFatal(format!(
                "JWT_SECRET_KEY must be at least {} bytes",
                MIN_SIGNING_KEY_BYTES
            )));
        }

        let lifetime_minutes = if config.token_expiry_minutes > 0 {
            config.token_expiry_minutes
        } else {
            DEFAULT_TOKEN_LIFETIME_MINUTES
        };

        tracing::info!(
            issuer = %config.issuer,
            audience = %config.audience,
            lifetime_minutes,
            "Token issuer initialized with HS256 key"
        );

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime_minutes,
        })
    }

    pub fn lifetime_minutes(&self) -> i64 {
        self.lifetime_minutes
    }

    /// Validate signature, issuer, audience and expiry, returning the claims.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid token: {}", e))?;

        Ok(token_data.claims)
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, subject_id: &str, email: &str) -> Result<IssuedToken, ServiceError> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.lifetime_minutes);

        let claims = TokenClaims {
            sub: subject_id.to_string(),
            email: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))?;

        Ok(IssuedToken::new(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

    fn config(key: &str, expiry: i64) -> JwtConfig {
        JwtConfig {
            secret_key: Secret::new(key.to_string()),
            issuer: "login-service".to_string(),
            audience: "login-clients".to_string(),
            token_expiry_minutes: expiry,
        }
    }

    #[test]
    fn test_short_key_is_fatal() {
        let result = JwtTokenIssuer::new(&config("too-short", 60));
        assert!(matches!(result, Err(ServiceError::ConfigurationFatal(_))));
    }

    #[test]
    fn test_non_positive_expiry_uses_default() {
        let issuer = JwtTokenIssuer::new(&config(TEST_KEY, 0)).unwrap();
        assert_eq!(issuer.lifetime_minutes(), DEFAULT_TOKEN_LIFETIME_MINUTES);

        let issuer = JwtTokenIssuer::new(&config(TEST_KEY, -5)).unwrap();
        assert_eq!(issuer.lifetime_minutes(), DEFAULT_TOKEN_LIFETIME_MINUTES);
    }

    #[test]
    fn test_issue_and_validate() -> Result<(), anyhow::Error> {
        let issuer = JwtTokenIssuer::new(&config(TEST_KEY, 15))?;
        let before = Utc::now().timestamp();

        let token = issuer.issue("user_123", "test@example.com")?;
        let claims = issuer.validate(token.as_str())?;

        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.iss, "login-service");
        assert_eq!(claims.aud, "login-clients");
        let expected_exp = before + 15 * 60;
        assert!((claims.exp - expected_exp).abs() <= 5);

        Ok(())
    }

    #[test]
    fn test_tokens_differ_only_by_jti() -> Result<(), anyhow::Error> {
        let issuer = JwtTokenIssuer::new(&config(TEST_KEY, 15))?;

        let first = issuer.validate(issuer.issue("user_123", "a@example.com")?.as_str())?;
        let second = issuer.validate(issuer.issue("user_123", "a@example.com")?.as_str())?;

        assert_ne!(first.jti, second.jti);
        assert_eq!(first.sub, second.sub);
        assert_eq!(first.email, second.email);
        assert_eq!(first.iss, second.iss);
        assert_eq!(first.aud, second.aud);

        Ok(())
    }

    #[test]
    fn test_validate_rejects_other_audience() -> Result<(), anyhow::Error> {
        let issuer = JwtTokenIssuer::new(&config(TEST_KEY, 15))?;
        let mut other_config = config(TEST_KEY, 15);
        other_config.audience = "someone-else".to_string();
        let other = JwtTokenIssuer::new(&other_config)?;

        let token = other.issue("user_123", "a@example.com")?;
        assert!(issuer.validate(token.as_str()).is_err());

        Ok(())
    }

    #[test]
    fn test_validate_rejects_tampered_token() -> Result<(), anyhow::Error> {
        let issuer = JwtTokenIssuer::new(&config(TEST_KEY, 15))?;
        let token = issuer.issue("user_123", "a@example.com")?.into_string();

        let tampered = format!("{}x", token);
        assert!(issuer.validate(&tampered).is_err());

        Ok(())
    }
}
