use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tokio::sync::Semaphore;

/// Rate limiter keyed by client IP address
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// Resolved client address, placed in request extensions by [`client_ip_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Per-IP limiter that parks a bounded number of over-limit requests per
/// address until a permit frees up instead of rejecting them outright.
#[derive(Clone)]
pub struct QueuedIpRateLimiter {
    limiter: IpRateLimiter,
    queues: Arc<DashMap<IpAddr, Arc<Semaphore>>>,
    queue_limit: usize,
    max_wait: Duration,
}

impl QueuedIpRateLimiter {
    pub fn new(attempts: u32, window_seconds: u64, queue_limit: usize) -> Self {
        Self::with_limiter(
            create_ip_rate_limiter(attempts, window_seconds),
            queue_limit,
            Duration::from_secs(window_seconds.max(1)),
        )
    }

    fn with_limiter(limiter: IpRateLimiter, queue_limit: usize, max_wait: Duration) -> Self {
        Self {
            limiter,
            queues: Arc::new(DashMap::new()),
            queue_limit,
            max_wait,
        }
    }

    async fn admit(&self, ip: IpAddr) -> Result<(), AppError> {
        let negative = match self.limiter.check_key(&ip) {
            Ok(_) => return Ok(()),
            Err(negative) => negative,
        };
        let wait_time = negative.wait_time_from(DefaultClock::default().now());

        let queue = self
            .queues
            .entry(ip)
            .or_insert_with(|| Arc::new(Semaphore::new(self.queue_limit)))
            .clone();

        // No queue slot left for this address: reject immediately.
        let Ok(slot) = queue.clone().try_acquire_owned() else {
            drop(queue);
            self.release_idle_queue(ip);
            return Err(too_many_requests(wait_time));
        };

        tracing::debug!(ip = %ip, wait_ms = wait_time.as_millis() as u64, "Queueing rate-limited request");
        let admitted = tokio::time::timeout(self.max_wait, self.limiter.until_key_ready(&ip))
            .await
            .map_err(|_| too_many_requests(wait_time));

        drop(slot);
        drop(queue);
        self.release_idle_queue(ip);

        admitted
    }

    /// Forget the queue of `ip` once nothing but the map refers to it.
    fn release_idle_queue(&self, ip: IpAddr) {
        self.queues.remove_if(&ip, |_, q| Arc::strong_count(q) == 1);
    }
}

/// Create a keyed rate limiter (by IP) allowing `attempts` per `window_seconds`
pub fn create_ip_rate_limiter(attempts: u32, window_seconds: u64) -> IpRateLimiter {
    let attempts = attempts.max(1);
    let period = Duration::from_millis((window_seconds.max(1) * 1000) / attempts as u64);
    let burst = NonZeroU32::new(attempts).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst);

    Arc::new(RateLimiter::dashmap(quota))
}

/// Resolve the client address. The first `x-forwarded-for` hop is honored
/// only when `trust_forwarded_for` is set, i.e. behind a known proxy;
/// otherwise the socket peer address is used.
pub fn client_ip(request: &Request, trust_forwarded_for: bool) -> Option<IpAddr> {
    let forwarded_ip = trust_forwarded_for
        .then(|| {
            request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .flatten();

    forwarded_ip.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

/// Resolve the client address once per request for the limiters below.
/// The state is whether `x-forwarded-for` is trusted.
pub async fn client_ip_middleware(
    State(trust_forwarded_for): State<bool>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(ip) = client_ip(&request, trust_forwarded_for) {
        request.extensions_mut().insert(ClientIp(ip));
    }
    next.run(request).await
}

fn resolved_ip(request: &Request) -> Option<IpAddr> {
    request.extensions().get::<ClientIp>().map(|ClientIp(ip)| *ip)
}

fn too_many_requests(wait_time: Duration) -> AppError {
    AppError::TooManyRequests(
        "Too many requests from this IP. Please try again later.".to_string(),
        Some(wait_time.as_secs().max(1)),
    )
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match resolved_ip(&request) {
        Some(ip) => match limiter.check_key(&ip) {
            Ok(_) => Ok(next.run(request).await),
            Err(negative) => Err(too_many_requests(
                negative.wait_time_from(DefaultClock::default().now()),
            )),
        },
        None => {
            tracing::warn!("Could not determine IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}

/// Middleware for IP-based rate limiting with a bounded per-IP wait queue
pub async fn queued_ip_rate_limit_middleware(
    State(limiter): State<QueuedIpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match resolved_ip(&request) {
        Some(ip) => {
            limiter.admit(ip).await?;
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!("Could not determine IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn per_100ms() -> IpRateLimiter {
        Arc::new(RateLimiter::dashmap(
            Quota::with_period(Duration::from_millis(100)).unwrap(),
        ))
    }

    #[test]
    fn test_ip_limiter_allows_burst_then_rejects() {
        let limiter = create_ip_rate_limiter(2, 60);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(limiter.check_key(&ip).is_ok());
        assert!(limiter.check_key(&ip).is_ok());
        assert!(limiter.check_key(&ip).is_err());
    }

    #[test]
    fn test_ip_limiter_keys_are_independent() {
        let limiter = create_ip_rate_limiter(1, 60);
        let first: IpAddr = "10.0.0.1".parse().unwrap();
        let second: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check_key(&first).is_ok());
        assert!(limiter.check_key(&first).is_err());
        assert!(limiter.check_key(&second).is_ok());
    }

    #[tokio::test]
    async fn test_queued_limiter_rejects_when_queue_is_empty() {
        let limiter = QueuedIpRateLimiter::new(1, 60, 0);
        let ip: IpAddr = "10.0.0.3".parse().unwrap();

        assert!(limiter.admit(ip).await.is_ok());
        assert!(matches!(
            limiter.admit(ip).await,
            Err(AppError::TooManyRequests(_, Some(_)))
        ));
    }

    #[tokio::test]
    async fn test_queued_limiter_waits_for_next_permit() {
        let limiter = QueuedIpRateLimiter::with_limiter(per_100ms(), 1, Duration::from_secs(2));
        let ip: IpAddr = "10.0.0.4".parse().unwrap();

        assert!(limiter.admit(ip).await.is_ok());
        assert!(limiter.admit(ip).await.is_ok());
        assert!(limiter.queues.is_empty());
    }

    #[tokio::test]
    async fn test_queued_limiter_queues_are_per_address() {
        let limiter = QueuedIpRateLimiter::with_limiter(per_100ms(), 1, Duration::from_secs(2));
        let first: IpAddr = "10.0.0.5".parse().unwrap();
        let second: IpAddr = "10.0.0.6".parse().unwrap();

        assert!(limiter.admit(first).await.is_ok());
        assert!(limiter.admit(second).await.is_ok());

        // Park one request for the first address, holding its only queue slot.
        let parked = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.admit(first).await })
        };
        tokio::task::yield_now().await;

        // The second address still has its own slot and waits instead of a 429.
        assert!(limiter.admit(second).await.is_ok());
        assert!(parked.await.unwrap().is_ok());
    }

    fn request_from(peer: &str, forwarded: &str) -> Request {
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", forwarded)
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        request
    }

    #[test]
    fn test_forwarded_for_ignored_unless_trusted() {
        let request = request_from("192.0.2.10:5000", "203.0.113.7");

        assert_eq!(
            client_ip(&request, false),
            Some("192.0.2.10".parse().unwrap())
        );
        assert_eq!(
            client_ip(&request, true),
            Some("203.0.113.7".parse().unwrap())
        );
    }
}
