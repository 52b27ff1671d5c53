//! Contestant endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use talentvote_common::AppResult;
use talentvote_db::entities::contestant::{self, ApplicationStatus};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

// ==================== Request/Response Types ====================

/// Contestant response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestantResponse {
    pub id: String,
    pub competition_id: String,
    pub talent_profile_id: String,
    pub display_name: String,
    pub application_status: ApplicationStatus,
    pub vote_count: i64,
    pub online_vote_count: i64,
    pub in_person_vote_count: i64,
    pub created_at: String,
}

impl From<contestant::Model> for ContestantResponse {
    fn from(c: contestant::Model) -> Self {
        Self {
            id: c.id,
            competition_id: c.competition_id,
            talent_profile_id: c.talent_profile_id,
            display_name: c.display_name,
            application_status: c.application_status,
            vote_count: c.vote_count,
            online_vote_count: c.online_vote_count,
            in_person_vote_count: c.in_person_vote_count,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// Review request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub decision: ApplicationStatus,
}

// ==================== Handlers ====================

/// Show a contestant.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ContestantResponse>> {
    let contestant = state.contestant_service.get(&id).await?;
    Ok(ApiResponse::ok(contestant.into()))
}

/// Approve or reject an application.
async fn review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> AppResult<ApiResponse<ContestantResponse>> {
    let contestant = state
        .contestant_service
        .review(&user, &id, req.decision)
        .await?;
    Ok(ApiResponse::ok(contestant.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(show))
        .route("/{id}/review", post(review))
}
