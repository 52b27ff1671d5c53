//! API endpoints.

mod competitions;
mod contestants;
mod guest;
mod invitations;
mod packages;
mod session;

use axum::Router;

use crate::middleware::AppState;
use crate::rate_limit::RateLimiterState;

/// Create the API router.
///
/// Vote, checkout and lookup routes carry the write throttling tier.
pub fn router(limiter: RateLimiterState) -> Router<AppState> {
    Router::new()
        .merge(session::router())
        .nest("/competitions", competitions::router(limiter.clone()))
        .nest("/contestants", contestants::router())
        .nest("/guest", guest::router(limiter))
        .nest("/packages", packages::router())
        .nest("/invitations", invitations::router())
}
