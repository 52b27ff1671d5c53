//! Vote package endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::{Deserialize, Serialize};
use talentvote_common::AppResult;
use talentvote_core::CreatePackageInput;
use talentvote_db::entities::vote_package;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Vote package response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageResponse {
    pub id: String,
    pub competition_id: Option<String>,
    pub name: String,
    pub vote_count: i32,
    pub bonus_votes: i32,
    pub total_votes: i64,
    pub price_cents: i64,
    pub is_active: bool,
}

impl From<vote_package::Model> for PackageResponse {
    fn from(p: vote_package::Model) -> Self {
        Self {
            total_votes: p.total_votes(),
            id: p.id,
            competition_id: p.competition_id,
            name: p.name,
            vote_count: p.vote_count,
            bonus_votes: p.bonus_votes,
            price_cents: p.price_cents,
            is_active: p.is_active,
        }
    }
}

/// Activation toggle request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Create a package.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePackageInput>,
) -> AppResult<ApiResponse<PackageResponse>> {
    let package = state.package_service.create(&user, input).await?;
    Ok(ApiResponse::created(package.into()))
}

/// Withdraw or re-offer a package.
async fn set_active(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> AppResult<ApiResponse<PackageResponse>> {
    let package = state
        .package_service
        .set_active(&user, &id, req.is_active)
        .await?;
    Ok(ApiResponse::ok(package.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{id}/active", post(set_active))
}
