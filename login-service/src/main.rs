use login_service::{
    build_router,
    config::LoginConfig,
    db,
    services::{
        metrics::init_metrics, Argon2CredentialVerifier, CredentialStore, CredentialVerifier,
        JwtTokenIssuer, LoginService, PgCredentialStore, RecaptchaVerifier,
    },
    AppState,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::{create_ip_rate_limiter, QueuedIpRateLimiter};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = LoginConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    init_metrics().map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting login service"
    );

    // Collaborators whose construction can be fatal come first, before any I/O
    let tokens = Arc::new(JwtTokenIssuer::new(&config.jwt)?);
    let risk = Arc::new(RecaptchaVerifier::new(&config.recaptcha)?);
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(Argon2CredentialVerifier::new());

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
    let store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool));

    db::seed_default_admin(store.as_ref(), verifier.as_ref(), &config.seed).await?;

    let login_service = LoginService::new(risk, store.clone(), verifier, tokens.clone())?;

    let login_rate_limiter = QueuedIpRateLimiter::new(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
        config.rate_limit.login_queue_limit,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login (queued) and Global IP");

    let addr = config.common.socket_addr();

    let state = AppState {
        config: Arc::new(config),
        login_service,
        tokens,
        store,
        login_rate_limiter,
        ip_rate_limiter,
    };
    let app = build_router(state);

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
