//! Request throttling middleware.
//!
//! Fixed-window counters per user (when signed in) or per client IP. This is
//! transport protection only; the daily free-vote cap lives in the voting
//! service.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use talentvote_db::entities::user;
use tokio::sync::RwLock;

use crate::extractors::client_ip;

/// Rate limit configuration for an endpoint tier.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Time window duration in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Create a new rate limit config.
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

/// Default rate limits per tier.
pub mod limits {
    use super::RateLimitConfig;

    /// Reads and management endpoints.
    pub const STANDARD: RateLimitConfig = RateLimitConfig::new(300, 60);

    /// Voting, checkout and purchase lookup.
    pub const WRITE: RateLimitConfig = RateLimitConfig::new(30, 60);
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

impl WindowState {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }
}

/// API rate limiter.
#[derive(Clone)]
pub struct ApiRateLimiter {
    /// State per key (user ID or IP address).
    states: Arc<RwLock<HashMap<String, WindowState>>>,
}

impl Default for ApiRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiRateLimiter {
    /// Create a new rate limiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if a request is allowed and record it.
    pub async fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        let mut states = self.states.write().await;
        let now = Instant::now();
        let window = Duration::from_secs(config.window_secs);

        let state = states.entry(key.to_string()).or_insert_with(WindowState::new);

        if now.duration_since(state.window_start) >= window {
            state.count = 0;
            state.window_start = now;
        }

        let reset = window
            .saturating_sub(now.duration_since(state.window_start))
            .as_secs()
            .max(1);

        if state.count >= config.max_requests {
            return RateLimitResult::Limited {
                retry_after: reset,
                limit: config.max_requests,
            };
        }

        state.count += 1;
        RateLimitResult::Allowed {
            remaining: config.max_requests.saturating_sub(state.count),
            limit: config.max_requests,
            reset,
        }
    }

    /// Drop windows that ended long ago.
    pub async fn cleanup(&self, max_window_secs: u64) {
        let mut states = self.states.write().await;
        let now = Instant::now();
        let max_window = Duration::from_secs(max_window_secs * 2);

        states.retain(|_, state| now.duration_since(state.window_start) < max_window);
    }

    /// Get the number of tracked keys.
    pub async fn key_count(&self) -> usize {
        self.states.read().await.len()
    }
}

/// Rate limit check result.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    Allowed {
        remaining: u32,
        limit: u32,
        /// Seconds until window reset.
        reset: u64,
    },
    Limited {
        retry_after: u64,
        limit: u32,
    },
}

/// Limiters shared by the throttling middleware.
#[derive(Clone, Default)]
pub struct RateLimiterState {
    /// Standard tier.
    pub standard: ApiRateLimiter,
    /// Write tier.
    pub write: ApiRateLimiter,
}

impl RateLimiterState {
    /// Create a new rate limiter state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop stale windows in both tiers.
    pub async fn cleanup(&self) {
        self.standard.cleanup(limits::STANDARD.window_secs).await;
        self.write.cleanup(limits::WRITE.window_secs).await;
    }
}

/// Rate limit error response.
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": "TOO_MANY_REQUESTS",
                "message": "Too many requests, slow down",
            }
        });

        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, self.retry_after.to_string())],
            axum::Json(body),
        )
            .into_response()
    }
}

fn limiter_key(req: &Request<Body>) -> String {
    if let Some(user) = req.extensions().get::<user::Model>() {
        format!("user:{}", user.id)
    } else if let Some(ip) = client_ip(req.headers(), req.extensions()) {
        format!("ip:{ip}")
    } else {
        "unknown".to_string()
    }
}

/// Standard tier middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    rate_limit_with_config(&limiter.standard, req, next, &limits::STANDARD).await
}

/// Write tier middleware.
pub async fn rate_limit_write_middleware(
    State(limiter): State<RateLimiterState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    rate_limit_with_config(&limiter.write, req, next, &limits::WRITE).await
}

async fn rate_limit_with_config(
    limiter: &ApiRateLimiter,
    req: Request<Body>,
    next: Next,
    config: &RateLimitConfig,
) -> Result<Response, RateLimitError> {
    let key = limiter_key(&req);

    match limiter.check(&key, config).await {
        RateLimitResult::Allowed {
            remaining,
            limit,
            reset,
        } => {
            let mut response = next.run(req).await;

            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
            headers.insert("X-RateLimit-Reset", HeaderValue::from(reset));

            Ok(response)
        }
        RateLimitResult::Limited { retry_after, limit } => {
            tracing::debug!(key = %key, limit, retry_after, "Request throttled");
            Err(RateLimitError { retry_after })
        }
    }
}
