//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use talentvote_core::{
    CompetitionService, ContestantService, InvitationService, LedgerService, PurchaseService,
    SessionService, VotePackageService, VotingService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
    pub competition_service: CompetitionService,
    pub contestant_service: ContestantService,
    pub voting_service: VotingService,
    pub purchase_service: PurchaseService,
    pub ledger_service: LedgerService,
    pub package_service: VotePackageService,
    pub invitation_service: InvitationService,
}

/// Authentication middleware.
///
/// A valid bearer token puts the signed-in `user::Model` into the request
/// extensions. Invalid tokens are ignored here; endpoints that need a user
/// reject the request themselves.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.session_service.resolve(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring bearer token"),
        }
    }

    next.run(req).await
}
