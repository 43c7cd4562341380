//! Test helper module for login-service integration tests.
//!
//! Builds the full router over an in-memory credential store, with a
//! wiremock server standing in for the risk scoring endpoint.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use login_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, JwtConfig, LoginConfig, RateLimitConfig, RecaptchaConfig,
        SecurityConfig, SeedConfig, SwaggerConfig, SwaggerMode,
    },
    db,
    services::{
        metrics::init_metrics, Argon2CredentialVerifier, CredentialStore, InMemoryCredentialStore,
        JwtTokenIssuer, LoginService, RecaptchaVerifier,
    },
    AppState,
};
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::middleware::rate_limit::{create_ip_rate_limiter, QueuedIpRateLimiter};
use std::sync::Arc;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "Admin@123";
pub const TEST_SIGNING_KEY: &str = "test-signing-key-0123456789abcdef";
pub const SITEVERIFY_PATH: &str = "/siteverify";

pub struct TestApp {
    pub router: Router,
    pub risk_server: MockServer,
    pub tokens: Arc<JwtTokenIssuer>,
    pub store: InMemoryCredentialStore,
}

pub fn test_config(verify_url: String) -> LoginConfig {
    LoginConfig {
        common: Default::default(),
        environment: Environment::Dev,
        service_name: "login-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        login_timeout_seconds: 5,
        database: DatabaseConfig {
            url: Secret::new("postgres://unused".to_string()),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret_key: Secret::new(TEST_SIGNING_KEY.to_string()),
            issuer: "login-service".to_string(),
            audience: "login-service-clients".to_string(),
            token_expiry_minutes: 60,
        },
        recaptcha: RecaptchaConfig {
            secret_key: Secret::new("test-recaptcha-secret".to_string()),
            site_key: "test-site-key".to_string(),
            threshold: 0.5,
            verify_url,
            timeout_seconds: 2,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            trust_forwarded_for: true,
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Public,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            login_queue_limit: 0,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
        seed: SeedConfig {
            admin_email: ADMIN_EMAIL.to_string(),
            admin_role: "Admin".to_string(),
            admin_password: Some(Secret::new(ADMIN_PASSWORD.to_string())),
        },
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut LoginConfig)) -> TestApp {
    let risk_server = MockServer::start().await;
    let mut config = test_config(format!("{}{}", risk_server.uri(), SITEVERIFY_PATH));
    customize(&mut config);

    init_metrics().expect("Failed to init metrics");

    let tokens = Arc::new(JwtTokenIssuer::new(&config.jwt).expect("Failed to create issuer"));
    let risk = Arc::new(RecaptchaVerifier::new(&config.recaptcha).expect("Failed to create verifier"));
    let verifier = Arc::new(Argon2CredentialVerifier::new());
    let store = InMemoryCredentialStore::new();

    db::seed_default_admin(&store, verifier.as_ref(), &config.seed)
        .await
        .expect("Failed to seed admin");

    let shared_store: Arc<dyn CredentialStore> = Arc::new(store.clone());
    let login_service = LoginService::new(risk, shared_store.clone(), verifier, tokens.clone())
        .expect("Failed to create login service");

    let state = AppState {
        login_rate_limiter: QueuedIpRateLimiter::new(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
            config.rate_limit.login_queue_limit,
        ),
        ip_rate_limiter: create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        ),
        config: Arc::new(config),
        login_service,
        tokens: tokens.clone(),
        store: shared_store,
    };

    TestApp {
        router: build_router(state),
        risk_server,
        tokens,
        store,
    }
}

/// Answer every siteverify call with `body`.
pub async fn mock_risk_response(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path(SITEVERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mock_risk_pass(server: &MockServer) {
    mock_risk_response(
        server,
        json!({ "success": true, "score": 0.9, "action": "login" }),
    )
    .await;
}

pub fn login_request(body: Value, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/account/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn login_body(email: &str, password: &str, risk_token: &str) -> Value {
    json!({
        "email": email,
        "password": password,
        "recaptcha_token": risk_token,
    })
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
