//! API integration tests.
//!
//! These tests drive the router end to end against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    middleware,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use talentvote_api::{
    RateLimiterState,
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use talentvote_common::{AppError, AppResult};
use talentvote_core::{
    ChargeOutcome, ChargeRequest, CompetitionService, ContestantService, EligibilityService,
    IdentityClaims, IdentityVerifier, InvitationService, LedgerService, NoOpMailer,
    PaymentGateway, PurchaseService, PurchaseSettings, SessionService, VotePackageService,
    VoteRecorder, VotingService,
};
use talentvote_db::{
    entities::competition,
    repositories::{
        CompetitionRepository, ContestantRepository, InvitationRepository,
        PaymentAuditRepository, UserRepository, VotePackageRepository, VotePurchaseRepository,
        VoteRepository,
    },
};
use tower::ServiceExt;

/// Rejects every token.
struct RejectingVerifier;

#[async_trait]
impl IdentityVerifier for RejectingVerifier {
    async fn verify(&self, _token: &str) -> AppResult<IdentityClaims> {
        Err(AppError::Unauthorized)
    }
}

/// Declines every charge.
struct DecliningGateway;

#[async_trait]
impl PaymentGateway for DecliningGateway {
    async fn charge(&self, _request: &ChargeRequest) -> AppResult<ChargeOutcome> {
        Err(AppError::Payment("The payment was declined.".to_string()))
    }
}

fn create_test_state(db: DatabaseConnection) -> AppState {
    let db = Arc::new(db);
    let tz = chrono_tz::America::New_York;

    let user_repo = UserRepository::new(Arc::clone(&db));
    let competition_repo = CompetitionRepository::new(Arc::clone(&db));
    let contestant_repo = ContestantRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));
    let package_repo = VotePackageRepository::new(Arc::clone(&db));
    let purchase_repo = VotePurchaseRepository::new(Arc::clone(&db));
    let audit_repo = PaymentAuditRepository::new(Arc::clone(&db));
    let invitation_repo = InvitationRepository::new(Arc::clone(&db));

    let recorder = VoteRecorder::new(vote_repo.clone(), tz);
    let eligibility = EligibilityService::new(
        competition_repo.clone(),
        contestant_repo.clone(),
        vote_repo.clone(),
        tz,
    );

    AppState {
        session_service: SessionService::new(Arc::new(RejectingVerifier), user_repo),
        competition_service: CompetitionService::new(
            competition_repo.clone(),
            contestant_repo.clone(),
            1,
        ),
        contestant_service: ContestantService::new(
            competition_repo.clone(),
            contestant_repo.clone(),
        ),
        voting_service: VotingService::new(eligibility, recorder.clone()),
        purchase_service: PurchaseService::new(
            competition_repo.clone(),
            contestant_repo.clone(),
            package_repo.clone(),
            purchase_repo.clone(),
            audit_repo,
            recorder,
            Arc::new(DecliningGateway),
            Arc::new(NoOpMailer),
            PurchaseSettings {
                currency: "USD".to_string(),
                sales_tax_bps: 0,
                max_individual_votes: 10_000,
            },
        ),
        ledger_service: LedgerService::new(
            competition_repo.clone(),
            contestant_repo.clone(),
            purchase_repo,
            vote_repo,
        ),
        package_service: VotePackageService::new(competition_repo, package_repo),
        invitation_service: InvitationService::new(invitation_repo),
    }
}

fn create_app(db: DatabaseConnection) -> Router {
    let state = create_test_state(db);
    Router::new()
        .nest("/api", api_router(RateLimiterState::new()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(ConnectInfo(SocketAddr::from(([203, 0, 113, 9], 41000))))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_requires_auth() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/i")
                .header(header::AUTHORIZATION, "Bearer forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_list_competitions() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<competition::Model>::new()])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/competitions?limit=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_vote_without_client_address() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/competitions/c1/vote")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::from(json!({ "contestantId": "k1" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_rejects_bad_email() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(post_json(
            "/api/guest/checkout",
            &json!({
                "name": "Pat Fan",
                "email": "not-an-email",
                "competitionId": "c1",
                "contestantId": "k1",
                "packageId": "p1",
                "dataDescriptor": "COMMON.ACCEPT.INAPP.PAYMENT",
                "dataValue": "token",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_lookup_requires_name() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(post_json(
            "/api/guest/lookup",
            &json!({ "name": "", "email": "fan@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lookup_is_throttled() {
    let app = create_app(empty_db());
    let bad = json!({ "name": "", "email": "fan@example.com" });

    for _ in 0..30 {
        let response = app
            .clone()
            .oneshot(post_json("/api/guest/lookup", &bad))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .oneshot(post_json("/api/guest/lookup", &bad))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}
