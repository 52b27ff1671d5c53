//! HTTP API layer for talentvote.
//!
//! - **Endpoints**: competitions, voting, guest checkout, packages, invitations
//! - **Extractors**: authenticated user, client IP
//! - **Middleware**: Firebase session resolution, request throttling
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;

pub use endpoints::router;
pub use extractors::TrustedProxies;
pub use rate_limit::{ApiRateLimiter, RateLimitConfig, RateLimiterState};
