use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub login_timeout_seconds: u64,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub recaptcha: RecaptchaConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Token signing settings. `token_expiry_minutes <= 0` means "use the default
/// lifetime" and is resolved by the token issuer.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret_key: Secret<String>,
    pub issuer: String,
    pub audience: String,
    pub token_expiry_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecaptchaConfig {
    pub secret_key: Secret<String>,
    /// Public widget key; only handed to clients, never used server-side.
    pub site_key: String,
    pub threshold: f64,
    pub verify_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    /// Honor `x-forwarded-for` for client addresses; only behind a trusted proxy.
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SwaggerMode {
    Public,
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub login_queue_limit: usize,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    pub admin_email: String,
    pub admin_role: String,
    /// Seeding is skipped unless a password is configured.
    pub admin_password: Option<Secret<String>>,
}

impl LoginConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = LoginConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("login-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            login_timeout_seconds: get_parsed("LOGIN_TIMEOUT_SECONDS", "15", is_prod)?,
            database: DatabaseConfig {
                url: Secret::new(get_env("DATABASE_URL", None, is_prod)?),
                max_connections: get_parsed("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: get_parsed("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            jwt: JwtConfig {
                secret_key: Secret::new(get_env("JWT_SECRET_KEY", None, is_prod)?),
                issuer: get_env("JWT_ISSUER", Some("login-service"), is_prod)?,
                audience: get_env("JWT_AUDIENCE", Some("login-service-clients"), is_prod)?,
                token_expiry_minutes: get_parsed("JWT_TOKEN_EXPIRY_MINUTES", "60", is_prod)?,
            },
            recaptcha: RecaptchaConfig {
                secret_key: Secret::new(get_env("RECAPTCHA_SECRET_KEY", None, is_prod)?),
                site_key: get_env("RECAPTCHA_SITE_KEY", Some(""), is_prod)?,
                threshold: get_parsed("RECAPTCHA_THRESHOLD", "0.5", is_prod)?,
                verify_url: get_env(
                    "RECAPTCHA_VERIFY_URL",
                    Some(DEFAULT_RECAPTCHA_VERIFY_URL),
                    is_prod,
                )?,
                timeout_seconds: get_parsed("RECAPTCHA_TIMEOUT_SECONDS", "10", is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
                trust_forwarded_for: get_parsed("TRUST_FORWARDED_FOR", "false", is_prod)?,
            },
            swagger: SwaggerConfig {
                enabled: get_env("ENABLE_SWAGGER", Some("public"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_parsed("RATE_LIMIT_LOGIN_ATTEMPTS", "5", is_prod)?,
                login_window_seconds: get_parsed("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "60", is_prod)?,
                login_queue_limit: get_parsed("RATE_LIMIT_LOGIN_QUEUE", "2", is_prod)?,
                global_ip_limit: get_parsed("RATE_LIMIT_GLOBAL_IP_LIMIT", "100", is_prod)?,
                global_ip_window_seconds: get_parsed(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    "60",
                    is_prod,
                )?,
            },
            seed: SeedConfig {
                admin_email: env::var("SEED_ADMIN_EMAIL")
                    .unwrap_or_else(|_| "admin@example.com".to_string()),
                admin_role: env::var("SEED_ADMIN_ROLE").unwrap_or_else(|_| "Admin".to_string()),
                admin_password: env::var("SEED_ADMIN_PASSWORD")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(Secret::new),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if !(0.0..=1.0).contains(&self.recaptcha.threshold) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECAPTCHA_THRESHOLD must be between 0.0 and 1.0"
            )));
        }

        if self.recaptcha.secret_key.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECAPTCHA_SECRET_KEY must not be empty"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.swagger.enabled == SwaggerMode::Public {
                tracing::warn!("Swagger UI is publicly accessible in production");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_parsed<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, Some(default), is_prod)?;
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}
