use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Registry and collectors, published together so readers never see a
/// collector that is missing from the exported registry.
pub struct LoginMetrics {
    pub registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub login_attempts_total: IntCounterVec,
}

static METRICS: OnceLock<LoginMetrics> = OnceLock::new();

/// Build and register all collectors. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if METRICS.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let http_requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;

    let http_request_duration_seconds = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )?;

    let login_attempts_total = IntCounterVec::new(
        Opts::new("login_attempts_total", "Login attempts by outcome"),
        &["outcome"],
    )?;

    registry.register(Box::new(http_requests_total.clone()))?;
    registry.register(Box::new(http_request_duration_seconds.clone()))?;
    registry.register(Box::new(login_attempts_total.clone()))?;

    // A concurrent caller may have won; its set is kept and ours dropped.
    let _ = METRICS.set(LoginMetrics {
        registry,
        http_requests_total,
        http_request_duration_seconds,
        login_attempts_total,
    });

    Ok(())
}

/// Collectors, once [`init_metrics`] has run.
pub fn login_metrics() -> Option<&'static LoginMetrics> {
    METRICS.get()
}

/// Count one login attempt. `outcome` is "success" or a login error kind.
pub fn record_login_attempt(outcome: &str) {
    if let Some(metrics) = METRICS.get() {
        metrics
            .login_attempts_total
            .with_label_values(&[outcome])
            .inc();
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match METRICS.get() {
        Some(m) => &m.registry,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}
