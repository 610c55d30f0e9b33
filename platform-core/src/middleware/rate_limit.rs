use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

/// One limiter tier: at most `max_requests` per non-overlapping `window`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug)]
struct WindowBucket {
    window_start: Instant,
    count: u32,
    last_seen: Instant,
}

/// Outcome of a single [`FixedWindowLimiter::check`] call.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub retry_after: Option<Duration>,
}

/// Fixed-window request counter keyed by caller identity.
///
/// The first request for a key (or the first after the window elapsed)
/// starts a fresh window; within a window every request increments the
/// counter and is denied once the counter exceeds the limit.
pub struct FixedWindowLimiter {
    policy: RateLimitPolicy,
    buckets: DashMap<String, WindowBucket>,
}

pub type SharedLimiter = Arc<FixedWindowLimiter>;

/// Create a shared fixed-window limiter from plain config values.
pub fn create_fixed_window_limiter(max_requests: u32, window_seconds: u64) -> SharedLimiter {
    Arc::new(FixedWindowLimiter::new(RateLimitPolicy {
        max_requests: max_requests.max(1),
        window: Duration::from_secs(window_seconds.max(1)),
    }))
}

impl FixedWindowLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            buckets: DashMap::new(),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Count one request against `key`.
    ///
    /// The map entry guard serializes concurrent callers on the same key,
    /// making the increment-and-compare atomic per key.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| WindowBucket {
                window_start: now,
                count: 0,
                last_seen: now,
            });

        if now.duration_since(bucket.window_start) >= self.policy.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        bucket.count += 1;
        bucket.last_seen = now;

        if bucket.count <= self.policy.max_requests {
            RateDecision {
                allowed: true,
                limit: self.policy.max_requests,
                remaining: self.policy.max_requests - bucket.count,
                retry_after: None,
            }
        } else {
            let elapsed = now.duration_since(bucket.window_start);
            RateDecision {
                allowed: false,
                limit: self.policy.max_requests,
                remaining: 0,
                retry_after: Some(self.policy.window.saturating_sub(elapsed)),
            }
        }
    }

    /// Drop buckets idle for at least `max_idle`. Returns the eviction count.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_seen) < max_idle);
        before - self.buckets.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate-limit key: authenticated callers by bearer-token prefix, anonymous
/// callers by forwarded or socket IP.
pub fn client_key(request: &Request) -> String {
    if let Some(token) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let prefix: String = token.chars().take(20).collect();
        return format!("principal:{}", prefix);
    }

    let forwarded_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if let Some(ip) = forwarded_ip {
        return format!("ip:{}", ip);
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "ip:unknown".to_string())
}

/// Middleware for fixed-window rate limiting.
///
/// Denials are terminal: the handler is never invoked and the response
/// carries Retry-After plus the X-RateLimit-* pair. Allowed responses get
/// the X-RateLimit-* pair as well.
pub async fn rate_limit_middleware(
    State(limiter): State<SharedLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);
    let decision = limiter.check(&key);

    if !decision.allowed {
        tracing::warn!(key = %key, limit = decision.limit, "Rate limit exceeded");
        let retry_secs = decision.retry_after.map(|d| d.as_secs().max(1));
        let mut res = AppError::TooManyRequests(
            "Too many requests. Please try again later.".to_string(),
            retry_secs,
        )
        .into_response();
        set_rate_limit_headers(res.headers_mut(), &decision);
        return Ok(res);
    }

    let mut response = next.run(request).await;
    set_rate_limit_headers(response.headers_mut(), &decision);
    Ok(response)
}

fn set_rate_limit_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
}
