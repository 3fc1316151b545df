//! Per-IP request throttling and client address extraction.
//!
//! The same address logic feeds two consumers: the throttle middleware, and
//! the report endpoint, which passes the address to the core as the opaque
//! report origin.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Token-bucket state for one client address.
#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(burst: f64) -> Self {
        Self {
            tokens: burst,
            last_refill: Instant::now(),
        }
    }

    fn try_take(&mut self, refill_per_sec: f64, burst: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;

        self.tokens = (self.tokens + elapsed * refill_per_sec).min(burst);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-IP token-bucket throttle shared across the whole API.
#[derive(Clone)]
pub struct IpThrottle {
    buckets: Arc<Mutex<HashMap<IpAddr, Bucket>>>,
    refill_per_sec: f64,
    burst: f64,
    trust_proxy: bool,
}

impl IpThrottle {
    pub fn new(refill_per_sec: f64, burst: f64, trust_proxy: bool) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            refill_per_sec,
            burst,
            trust_proxy,
        }
    }

    /// Whether a request from this address may proceed.
    pub async fn allow(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| Bucket::new(self.burst));
        bucket.try_take(self.refill_per_sec, self.burst)
    }

    /// Drop buckets that have been idle for longer than `max_idle_secs`.
    pub async fn purge_idle(&self, max_idle_secs: f64) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill).as_secs_f64() < max_idle_secs
        });
    }

    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy
    }
}

impl Default for IpThrottle {
    fn default() -> Self {
        // 10 req/s sustained, burst of 30, honor proxy headers.
        Self::new(10.0, 30.0, true)
    }
}

/// Middleware applying the throttle to every request.
pub async fn throttle_middleware(
    axum::extract::State(throttle): axum::extract::State<IpThrottle>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip());
    let ip = client_ip(req.headers(), peer, throttle.trust_proxy());

    if let Some(ip) = ip {
        if !throttle.allow(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(req).await)
}

/// Resolve the client address a request originated from.
///
/// With `trust_proxy` set, `X-Forwarded-For` (first hop) and `X-Real-IP`
/// take precedence over the socket peer; otherwise only the peer counts.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        if let Some(forwarded) = headers.get("x-forwarded-for") {
            if let Ok(value) = forwarded.to_str() {
                if let Some(first) = value.split(',').next() {
                    if let Ok(ip) = first.trim().parse::<IpAddr>() {
                        return Some(ip);
                    }
                }
            }
        }

        if let Some(real_ip) = headers.get("x-real-ip") {
            if let Ok(value) = real_ip.to_str() {
                if let Ok(ip) = value.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    peer
}
