//! Per-IP rate limiting using a keyed token bucket.
//!
//! Buckets are keyed on the peer address of the connection. `X-Forwarded-For`
//! is honoured only when that peer is a configured trusted proxy.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use tracing::{debug, warn};

use crate::errors::ErrorResponse;

type KeyedLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

pub struct RateLimit {
    limiter: KeyedLimiter,
    clock: DefaultClock,
    trusted_proxies: Vec<IpAddr>,
}

impl RateLimit {
    pub fn new(per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            trusted_proxies: Vec::new(),
        }
    }

    /// Peers whose `X-Forwarded-For` header names the real client.
    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = proxies;
        self
    }

    /// `Err` carries how long the client should wait.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&ip)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Forget buckets that have refilled completely.
    pub fn purge_stale(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!("Rate limiter tracking {} clients", self.limiter.len());
    }
}

/// Axum middleware rejecting requests over quota with `429 Too Many Requests`.
pub async fn enforce(State(limit): State<Arc<RateLimit>>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req, &limit.trusted_proxies);
    match limit.check(ip) {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            let retry_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            warn!(ip = %ip, retry_after_secs = retry_secs, "Rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse {
                    error: "Too many requests, please try again later".to_string(),
                    details: Vec::new(),
                }),
            )
                .into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_secs.max(1)),
            );
            response
        }
    }
}

/// Periodically drop idle buckets.
pub async fn cleanup_task(limit: Arc<RateLimit>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        limit.purge_stale();
    }
}

fn client_ip(req: &Request, trusted_proxies: &[IpAddr]) -> IpAddr {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if !trusted_proxies.contains(&peer) {
        return peer;
    }

    // Each proxy appends the address it received the request from, so the
    // rightmost untrusted entry is the client.
    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|forwarded| {
            forwarded
                .rsplit(',')
                .filter_map(|entry| entry.trim().parse::<IpAddr>().ok())
                .find(|ip| !trusted_proxies.contains(ip))
        })
        .unwrap_or(peer)
}
