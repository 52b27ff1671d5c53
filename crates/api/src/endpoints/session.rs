//! Session endpoint.

use axum::{Router, routing::get};
use serde::Serialize;
use talentvote_common::AppResult;
use talentvote_db::entities::user::{self, UserRole};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// The signed-in user.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub created_at: String,
}

impl From<user::Model> for MeResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            email_verified: u.email_verified,
            display_name: u.display_name,
            role: u.role,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Who am I.
async fn me(AuthUser(user): AuthUser) -> AppResult<ApiResponse<MeResponse>> {
    Ok(ApiResponse::ok(user.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/i", get(me))
}
