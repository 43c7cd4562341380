use crate::config::RecaptchaConfig;
use crate::services::ServiceError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

/// Reason returned for every failed risk check. Specific causes are logged only.
pub const RISK_FAILURE_REASON: &str = "risk validation failed";

/// Outcome of a single risk check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskVerdict {
    pub passed: bool,
    pub reason: Option<String>,
}

impl RiskVerdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn fail() -> Self {
        Self {
            passed: false,
            reason: Some(RISK_FAILURE_REASON.to_string()),
        }
    }
}

/// Scores a client-side risk assertion against the action it was minted for.
#[async_trait]
pub trait RiskVerifier: Send + Sync {
    async fn verify(&self, assertion: &str, expected_action: &str) -> RiskVerdict;
}

/// Body returned by the `siteverify` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Pass/fail policy applied to a decoded scoring response.
pub fn evaluate(response: &SiteVerifyResponse, expected_action: &str, threshold: f64) -> RiskVerdict {
    if !response.success {
        tracing::warn!(
            error_codes = ?response.error_codes,
            "Risk service reported an unsuccessful verification"
        );
        return RiskVerdict::fail();
    }

    if response.action.as_deref() != Some(expected_action) {
        tracing::warn!(
            expected = %expected_action,
            actual = ?response.action,
            "Risk assertion action mismatch"
        );
        return RiskVerdict::fail();
    }

    if response.score < threshold {
        tracing::warn!(
            score = response.score,
            threshold = threshold,
            "Risk score below threshold"
        );
        return RiskVerdict::fail();
    }

    RiskVerdict::pass()
}

/// reCAPTCHA v3 backed verifier. One attempt per call, bounded by the client timeout.
#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret_key: Secret<String>,
    verify_url: String,
    threshold: f64,
}

impl RecaptchaVerifier {
    pub fn new(config: &RecaptchaConfig) -> Result<Self, ServiceError> {
        if config.secret_key.expose_secret().trim().is_empty() {
            return Err(ServiceError::ConfigurationFatal(
                "RECAPTCHA_SECRET_KEY must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build risk service client: {}", e))?;

        tracing::info!(
            verify_url = %config.verify_url,
            threshold = config.threshold,
            "Risk verifier initialized"
        );

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            verify_url: config.verify_url.clone(),
            threshold: config.threshold,
        })
    }

    async fn site_verify(&self, assertion: &str) -> Result<SiteVerifyResponse, reqwest::Error> {
        let params = [
            ("secret", self.secret_key.expose_secret().as_str()),
            ("response", assertion),
        ];

        self.client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<SiteVerifyResponse>()
            .await
    }
}

#[async_trait]
impl RiskVerifier for RecaptchaVerifier {
    async fn verify(&self, assertion: &str, expected_action: &str) -> RiskVerdict {
        if assertion.trim().is_empty() {
            tracing::warn!("Risk assertion missing");
            return RiskVerdict::fail();
        }

        match self.site_verify(assertion).await {
            Ok(response) => evaluate(&response, expected_action, self.threshold),
            Err(e) => {
                tracing::error!(error = %e, "Risk service call failed");
                RiskVerdict::fail()
            }
        }
    }
}
