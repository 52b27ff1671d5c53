//! Invitation endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Serialize;
use talentvote_common::AppResult;
use talentvote_core::CreateInvitationInput;
use talentvote_db::entities::{
    invitation::{self, InvitationStatus},
    user::UserRole,
};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Invitation response. The token is only shown to the inviter.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub invitee_email: String,
    pub target_level: UserRole,
    pub status: InvitationStatus,
    pub expires_at: String,
    pub accepted_at: Option<String>,
    pub created_at: String,
}

impl InvitationResponse {
    fn new(i: invitation::Model, show_token: bool) -> Self {
        Self {
            id: i.id,
            token: show_token.then_some(i.token),
            invitee_email: i.invitee_email,
            target_level: i.target_level,
            status: i.status,
            expires_at: i.expires_at.to_rfc3339(),
            accepted_at: i.accepted_at.map(|d| d.to_rfc3339()),
            created_at: i.created_at.to_rfc3339(),
        }
    }
}

/// Accepted invitation response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub invitation: InvitationResponse,
    pub role: UserRole,
}

/// Send an invitation.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateInvitationInput>,
) -> AppResult<ApiResponse<InvitationResponse>> {
    let invitation = state.invitation_service.create(&user, input).await?;
    Ok(ApiResponse::created(InvitationResponse::new(invitation, true)))
}

/// Invitations I have sent.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<InvitationResponse>>> {
    let invitations = state.invitation_service.list(&user).await?;
    Ok(ApiResponse::ok(
        invitations
            .into_iter()
            .map(|i| InvitationResponse::new(i, true))
            .collect(),
    ))
}

/// Show an invitation by token.
async fn show(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<ApiResponse<InvitationResponse>> {
    let invitation = state.invitation_service.get(&token).await?;
    Ok(ApiResponse::ok(InvitationResponse::new(invitation, false)))
}

/// Accept an invitation as the signed-in user.
async fn accept(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<ApiResponse<AcceptResponse>> {
    let (invitation, user) = state.invitation_service.accept(user, &token).await?;
    Ok(ApiResponse::ok(AcceptResponse {
        invitation: InvitationResponse::new(invitation, false),
        role: user.role,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{token}", get(show))
        .route("/{token}/accept", post(accept))
}
