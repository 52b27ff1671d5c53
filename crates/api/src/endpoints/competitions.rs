//! Competition endpoints, including free voting.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use talentvote_common::AppResult;
use talentvote_core::{
    ApplyInput, CastVoteInput, CompetitionAnalytics, CreateCompetitionInput,
    UpdateCompetitionInput,
};
use talentvote_db::entities::{
    competition::{self, CompetitionStatus},
    contestant::ApplicationStatus,
    vote::VoteSource,
};
use validator::Validate;

use super::contestants::ContestantResponse;
use super::packages::PackageResponse;
use crate::{
    extractors::{AuthUser, MaybeAuthUser, RequestVoter},
    middleware::AppState,
    rate_limit::{RateLimiterState, rate_limit_write_middleware},
    response::ApiResponse,
};

// ==================== Request/Response Types ====================

/// Competition response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionResponse {
    pub id: String,
    pub host_id: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub status: CompetitionStatus,
    pub vote_cost_cents: i64,
    pub max_votes_per_day: i32,
    pub online_vote_weight: i32,
    pub in_person_only: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<competition::Model> for CompetitionResponse {
    fn from(c: competition::Model) -> Self {
        Self {
            id: c.id,
            host_id: c.host_id,
            title: c.title,
            category: c.category,
            description: c.description,
            status: c.status,
            vote_cost_cents: c.vote_cost_cents,
            max_votes_per_day: c.max_votes_per_day,
            online_vote_weight: c.online_vote_weight,
            in_person_only: c.in_person_only,
            start_date: c.start_date.map(|d| d.to_rfc3339()),
            end_date: c.end_date.map(|d| d.to_rfc3339()),
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

/// List competitions query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<CompetitionStatus>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: CompetitionStatus,
}

/// Leaderboard query.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: u64,
}

/// Leaderboard row.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: usize,
    pub contestant_id: String,
    pub display_name: String,
    pub vote_count: i64,
    pub online_vote_count: i64,
    pub in_person_vote_count: i64,
    pub weighted_score: f64,
}

/// Contestant list query.
#[derive(Debug, Deserialize)]
pub struct ContestantsQuery {
    pub status: Option<ApplicationStatus>,
}

/// Apply request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub display_name: String,
}

/// Free vote request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub contestant_id: String,
    #[serde(default = "default_source")]
    pub source: VoteSource,
    #[validate(length(max = 64))]
    pub ref_code: Option<String>,
}

/// Free vote response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub vote_id: String,
    pub contestant_id: String,
    pub source: VoteSource,
    pub remaining_today: i64,
}

const fn default_limit() -> u64 {
    20
}

const fn default_leaderboard_limit() -> u64 {
    100
}

const fn default_source() -> VoteSource {
    VoteSource::Online
}

// ==================== Handlers ====================

/// List published competitions.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<CompetitionResponse>>> {
    let statuses: Vec<CompetitionStatus> = query.status.into_iter().collect();
    let competitions = state
        .competition_service
        .list(&statuses, query.limit, query.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        competitions.into_iter().map(Into::into).collect(),
    ))
}

/// Competitions hosted by the signed-in user.
async fn mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<CompetitionResponse>>> {
    let competitions = state.competition_service.list_hosted(&user).await?;
    Ok(ApiResponse::ok(
        competitions.into_iter().map(Into::into).collect(),
    ))
}

/// Create a competition.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCompetitionInput>,
) -> AppResult<ApiResponse<CompetitionResponse>> {
    let competition = state.competition_service.create(&user, input).await?;
    Ok(ApiResponse::created(competition.into()))
}

/// Show a competition.
async fn show(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CompetitionResponse>> {
    let competition = state.competition_service.get(user.as_ref(), &id).await?;
    Ok(ApiResponse::ok(competition.into()))
}

/// Update competition settings.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCompetitionInput>,
) -> AppResult<ApiResponse<CompetitionResponse>> {
    let competition = state.competition_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(competition.into()))
}

/// Change competition status.
async fn set_status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> AppResult<ApiResponse<CompetitionResponse>> {
    let competition = state
        .competition_service
        .transition(&user, &id, req.status)
        .await?;
    Ok(ApiResponse::ok(competition.into()))
}

/// Weighted leaderboard.
async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<ApiResponse<Vec<LeaderboardRow>>> {
    let entries = state.competition_service.leaderboard(&id, query.limit).await?;

    Ok(ApiResponse::ok(
        entries
            .into_iter()
            .map(|e| LeaderboardRow {
                rank: e.rank,
                weighted_score: e.weighted_score,
                contestant_id: e.contestant.id,
                display_name: e.contestant.display_name,
                vote_count: e.contestant.vote_count,
                online_vote_count: e.contestant.online_vote_count,
                in_person_vote_count: e.contestant.in_person_vote_count,
            })
            .collect(),
    ))
}

/// Purchase and vote analytics for the host.
async fn analytics(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CompetitionAnalytics>> {
    let analytics = state.ledger_service.analytics(&user, &id).await?;
    Ok(ApiResponse::ok(analytics))
}

/// List contestants.
async fn contestants(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ContestantsQuery>,
) -> AppResult<ApiResponse<Vec<ContestantResponse>>> {
    let contestants = state
        .contestant_service
        .list(user.as_ref(), &id, query.status)
        .await?;
    Ok(ApiResponse::ok(
        contestants.into_iter().map(Into::into).collect(),
    ))
}

/// Apply to perform.
async fn apply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ApplyRequest>,
) -> AppResult<ApiResponse<ContestantResponse>> {
    let contestant = state
        .contestant_service
        .apply(
            &user,
            ApplyInput {
                competition_id: id,
                display_name: req.display_name,
            },
        )
        .await?;
    Ok(ApiResponse::created(contestant.into()))
}

/// Vote packages buyable in this competition.
async fn packages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<PackageResponse>>> {
    let packages = state.package_service.list_offered(&id).await?;
    Ok(ApiResponse::ok(packages.into_iter().map(Into::into).collect()))
}

/// Cast a free vote.
async fn vote(
    RequestVoter(voter): RequestVoter,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<VoteResponse>> {
    req.validate()?;

    let result = state
        .voting_service
        .cast_vote(CastVoteInput {
            competition_id: id,
            contestant_id: req.contestant_id,
            voter,
            source: req.source,
            ref_code: req.ref_code,
        })
        .await?;

    Ok(ApiResponse::created(VoteResponse {
        vote_id: result.vote.id,
        contestant_id: result.vote.contestant_id,
        source: result.vote.source,
        remaining_today: result.remaining_today,
    }))
}

pub fn router(limiter: RateLimiterState) -> Router<AppState> {
    let voting = Router::new()
        .route("/{id}/vote", post(vote))
        .route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_write_middleware,
        ));

    Router::new()
        .route("/", get(list).post(create))
        .route("/mine", get(mine))
        .route("/{id}", get(show).patch(update))
        .route("/{id}/status", post(set_status))
        .route("/{id}/leaderboard", get(leaderboard))
        .route("/{id}/analytics", get(analytics))
        .route("/{id}/contestants", get(contestants).post(apply))
        .route("/{id}/packages", get(packages))
        .merge(voting)
}
