use crate::services::metrics::login_metrics;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    // Route template keeps label cardinality bounded.
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    if let Some(metrics) = login_metrics() {
        let labels = [method.as_str(), path.as_str(), status.as_str()];
        metrics.http_requests_total.with_label_values(&labels).inc();
        metrics
            .http_request_duration_seconds
            .with_label_values(&labels)
            .observe(duration);
    }

    response
}
